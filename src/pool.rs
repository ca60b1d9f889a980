//! Reusable scratch containers for the per-row hot path.
//!
//! A [`BufferPool`] hands out [`Pooled`] guards. The guard derefs to the pooled value and
//! gives it back to the pool when dropped, so a container is returned on every exit path,
//! including early returns through `?`.
//!
//! The pool is meant for a single consumer loop: it is `!Sync`, so it cannot be shared
//! across threads without wrapping it in external synchronization.
//!
//! ```
//! use parquet2csv::pool::BufferPool;
//!
//! let pool: BufferPool<Vec<String>> = BufferPool::new(Vec::new);
//! {
//!     let mut record = pool.acquire();
//!     record.push("a".to_string());
//! } // returned here
//! let again = pool.acquire();
//! assert!(again.is_empty());
//! assert_eq!(pool.stats().hits, 1);
//! ```

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::hash::Hash;
use std::ops::{Deref, DerefMut};

/// A container that can be reset for reuse without giving back its allocation.
pub trait Recycle {
    /// Prepare the value for the next borrower.
    fn recycle(&mut self);
}

impl<T> Recycle for Vec<T> {
    fn recycle(&mut self) {
        self.clear();
    }
}

/// Keys are kept so their allocations are reused when the next row has the same
/// columns; only the values are cleared.
impl<K: Eq + Hash> Recycle for HashMap<K, String> {
    fn recycle(&mut self) {
        for v in self.values_mut() {
            v.clear();
        }
    }
}

/// Point-in-time pool counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions served from a returned container.
    pub hits: u64,
    /// Acquisitions that had to build a new container.
    pub misses: u64,
    /// Containers given back.
    pub returns: u64,
}

/// Single-consumer pool of reusable containers.
pub struct BufferPool<T: Recycle> {
    free: RefCell<Vec<T>>,
    make: Box<dyn Fn() -> T>,
    hits: Cell<u64>,
    misses: Cell<u64>,
    returns: Cell<u64>,
}

impl<T: Recycle> BufferPool<T> {
    /// Create an empty pool that builds new containers with `make`.
    pub fn new(make: impl Fn() -> T + 'static) -> Self {
        Self {
            free: RefCell::new(Vec::new()),
            make: Box::new(make),
            hits: Cell::new(0),
            misses: Cell::new(0),
            returns: Cell::new(0),
        }
    }

    /// Borrow a container. It is returned when the guard drops.
    pub fn acquire(&self) -> Pooled<'_, T> {
        let value = if let Some(v) = self.free.borrow_mut().pop() {
            self.hits.set(self.hits.get() + 1);
            v
        } else {
            self.misses.set(self.misses.get() + 1);
            (self.make)()
        };
        Pooled {
            pool: self,
            value: Some(value),
        }
    }

    fn release(&self, mut value: T) {
        value.recycle();
        self.returns.set(self.returns.get() + 1);
        self.free.borrow_mut().push(value);
    }

    /// Number of idle containers.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.borrow().len()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            hits: self.hits.get(),
            misses: self.misses.get(),
            returns: self.returns.get(),
        }
    }
}

/// Scoped borrow of a pooled container.
pub struct Pooled<'p, T: Recycle> {
    pool: &'p BufferPool<T>,
    value: Option<T>,
}

impl<T: Recycle> Deref for Pooled<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // Only `drop` takes the value out.
        self.value.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Recycle> DerefMut for Pooled<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: Recycle> Drop for Pooled<'_, T> {
    fn drop(&mut self) {
        if let Some(v) = self.value.take() {
            self.pool.release(v);
        }
    }
}
