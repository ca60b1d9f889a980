mod logging;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use parquet2csv::config::{ConvertConfig, DEFAULT_BATCH_ROWS, DEFAULT_FLUSH_ROWS, ParquetCodec};
use parquet2csv::convert::{self, Direction};
use parquet2csv::io::compression::CodecRegistry;
use parquet2csv::paths;

#[derive(Parser)]
#[command(
    name = "parquet2csv",
    version,
    about = "Streaming converter between delimited text and Parquet"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a delimited text file to Parquet
    Parquet {
        /// Input `.csv` file (may be compressed, e.g. `.csv.gz`)
        input: PathBuf,
        /// Output file (default: input name with `.parquet`)
        output: Option<PathBuf>,
        #[command(flatten)]
        opts: ConvertArgs,
    },
    /// Convert a Parquet file to delimited text
    Csv {
        /// Input `.parquet` file
        input: PathBuf,
        /// Output file (default: input name with `.csv`)
        output: Option<PathBuf>,
        #[command(flatten)]
        opts: ConvertArgs,
    },
}

#[derive(Args)]
struct ConvertArgs {
    /// Parquet compression codec id (0 none, 1 snappy, 2 gzip, 4 brotli, 5 lz4, 6 zstd, 7 lz4_raw)
    #[arg(short, long, default_value_t = 0)]
    compression: i32,
    /// Rows between flushes
    #[arg(short, long, default_value_t = DEFAULT_FLUSH_ROWS)]
    flush: usize,
    /// Field delimiter (only the first character is used)
    #[arg(short, long, default_value = ",")]
    delimiter: String,
    /// Rows per batch handed from the text reader to the encoder
    #[arg(long, default_value_t = DEFAULT_BATCH_ROWS)]
    batch_rows: usize,
    /// Print runtime statistics at the end
    #[arg(short, long)]
    verbose: bool,
    /// Also save runtime statistics as JSON to this file
    #[cfg(feature = "metrics")]
    #[arg(long)]
    stats_json: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    logging::init(&cli.log_level);

    let (direction, input, output, opts) = match cli.command {
        Commands::Parquet {
            input,
            output,
            opts,
        } => (Direction::TextToParquet, input, output, opts),
        Commands::Csv {
            input,
            output,
            opts,
        } => (Direction::ParquetToText, input, output, opts),
    };

    let codecs = CodecRegistry::default();
    let output = paths::derive_output(&input, output.as_deref(), direction.target_ext(), &codecs);
    let config = ConvertConfig::new(input, output)
        .with_compression(ParquetCodec::from_id(opts.compression)?)
        .with_flush_rows(opts.flush)
        .with_batch_rows(opts.batch_rows)
        .with_delimiter_str(&opts.delimiter)
        .verbose(opts.verbose);

    let report = convert::run(direction, &config, &codecs)
        .with_context(|| format!("{} {}", direction.command(), config.input.display()))?;

    #[cfg(feature = "metrics")]
    {
        if config.verbose {
            report.statistics.print();
        }
        if let Some(path) = &opts.stats_json {
            report.statistics.save_to_file(path)?;
        }
    }
    #[cfg(not(feature = "metrics"))]
    if config.verbose {
        println!(
            "{}: {} Processed {} rows",
            config.input.display(),
            direction.command(),
            report.rows_written
        );
    }
    Ok(())
}
