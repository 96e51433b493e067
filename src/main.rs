use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Parser;

use dumphist::{histogram_from_dump, Config, Scheduler};

#[derive(Debug, Parser)]
#[command(name = "dumphist")]
#[command(about = "Turn a filesystem metadata SQL dump into per-inode-type size histograms")]
#[command(version)]
struct Command {
    /// Path to the SQL dump of the entries table
    sqldump: PathBuf,
    /// Partition target size for dump ingest (e.g. 64MiB)
    #[arg(short, long, default_value = "128MiB")]
    blocksize: String,
    /// Save the full list of (size, type) entries to this CSV file
    #[arg(long)]
    save_csv: Option<PathBuf>,
    /// Scheduler to use: single-threaded, threads, or processes
    #[arg(long, default_value = "threads")]
    scheduler: String,
    /// Number of workers (0 means one per core)
    #[arg(short, long, default_value = "0")]
    workers: usize,
    /// Path to the histogram output file
    #[arg(short, long, default_value = "histogram.csv")]
    output: PathBuf,
    /// Output format: csv or json
    #[arg(short, long, default_value = "csv")]
    format: String,
    #[arg(short, long)]
    verbose: bool,
}

/// Parse a human byte size like `512KiB` or `128MiB`. A bare number is
/// bytes.
fn parse_blocksize(s: &str) -> Result<usize> {
    let s = s.trim();
    let split = s
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(s.len());
    let (digits, suffix) = s.split_at(split);
    if digits.is_empty() {
        bail!("Invalid block size '{s}'");
    }
    let value: usize = digits
        .parse()
        .with_context(|| format!("Invalid block size '{s}'"))?;
    let multiplier: usize = match suffix.trim() {
        "" | "B" => 1,
        "KiB" => 1 << 10,
        "MiB" => 1 << 20,
        "GiB" => 1 << 30,
        other => bail!("Invalid block size suffix '{other}'. Must be one of: B, KiB, MiB, GiB"),
    };
    let bytes = value
        .checked_mul(multiplier)
        .with_context(|| format!("Block size '{s}' overflows"))?;
    if bytes == 0 {
        bail!("Block size must be greater than zero");
    }
    Ok(bytes)
}

fn main() -> Result<()> {
    let opts = Command::parse();

    let default_level = if opts.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config {
        blocksize: parse_blocksize(&opts.blocksize)?,
        scheduler: Scheduler::from_str(&opts.scheduler)?,
        workers: opts.workers,
        save_csv: opts.save_csv.clone(),
    };

    let (table, stats) = histogram_from_dump(&opts.sqldump, &config)?;

    match opts.format.as_str() {
        "csv" => {
            let mut file = File::create(&opts.output).with_context(|| {
                format!("Failed to create output file {}", opts.output.display())
            })?;
            table.write_csv(&mut file)?;
        }
        "json" => {
            let mut file = File::create(&opts.output).with_context(|| {
                format!("Failed to create output file {}", opts.output.display())
            })?;
            let json = serde_json::to_string_pretty(&table)?;
            file.write_all(json.as_bytes())?;
            file.write_all(b"\n")?;
        }
        other => bail!("Invalid output format: {other}. Must be one of: csv, json"),
    }

    if let Some(path) = &opts.save_csv {
        println!(
            "Saved full inode size and type list to {}",
            path.display()
        );
    }
    println!("Saved the following histograms to {}:", opts.output.display());
    table.print();
    println!(
        "{} records binned, {} skipped",
        stats.records,
        stats.skipped()
    );

    Ok(())
}
