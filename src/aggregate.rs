//! Partition-parallel aggregation of a dump into a histogram.
//!
//! The dump text is sliced into contiguous byte ranges near a target
//! blocksize, realigned so no range splits a line; statements are one per
//! line, so realignment is what keeps a partition from starting mid-parse.
//! Each partition is mapped independently (tokenize, group, project, bin,
//! count) with no shared state, then the per-partition counts are merged.
//! The merge is plain addition keyed by `(type, bin)`, commutative and
//! associative, so partitions can run in any order on any number of
//! workers and the result is identical.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::fs::File;
use std::io::Write;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use workerpool::thunk::{Thunk, ThunkWorker};
use workerpool::Pool;

use crate::binning::bin_for_size;
use crate::error::ParseError;
use crate::histogram::{csv_field, HistogramTable};
use crate::rows::group_rows;
use crate::schema::{coerce_row, Projection, TableSchema};
use crate::tokenize::tokenize_line;

/// How partitions are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheduler {
    SingleThreaded,
    Threads,
    Processes,
}

impl Scheduler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SingleThreaded => "single-threaded",
            Self::Threads => "threads",
            Self::Processes => "processes",
        }
    }
}

impl FromStr for Scheduler {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "single-threaded" => Ok(Self::SingleThreaded),
            "threads" => Ok(Self::Threads),
            // Accepted for compatibility; native threads already run
            // partitions in parallel, so a separate process pool buys
            // nothing here.
            "processes" => Ok(Self::Processes),
            _ => bail!(
                "Invalid scheduler: {s}. Must be one of: single-threaded, threads, processes"
            ),
        }
    }
}

/// Aggregation configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Target partition size in bytes; actual partitions run a little
    /// long because they end on a line boundary.
    pub blocksize: usize,
    pub scheduler: Scheduler,
    /// Worker count; 0 means one per available core.
    pub workers: usize,
    /// Optional path for the raw `(size, type)` CSV export.
    pub save_csv: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            blocksize: 128 << 20,
            scheduler: Scheduler::Threads,
            workers: 0,
            save_csv: None,
        }
    }
}

/// Counts of what the parse kept and what it dropped.
///
/// Merging is addition field by field, so per-partition stats combine in
/// any order just like the histogram counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    /// Valid records that reached the histogram.
    pub records: u64,
    /// Lines that were not data-bearing INSERT statements.
    pub lines_ignored: u64,
    /// Lines dropped for malformed quoting.
    pub tokenize_errors: u64,
    /// Row groups dropped for wrong arity or a garbled statement tail.
    pub malformed_rows: u64,
    /// Records dropped because a value would not coerce to its column type.
    pub coercion_errors: u64,
    /// Records dropped for a negative size.
    pub invalid_sizes: u64,
}

impl ParseStats {
    pub fn merge(&mut self, other: &ParseStats) {
        self.records += other.records;
        self.lines_ignored += other.lines_ignored;
        self.tokenize_errors += other.tokenize_errors;
        self.malformed_rows += other.malformed_rows;
        self.coercion_errors += other.coercion_errors;
        self.invalid_sizes += other.invalid_sizes;
    }

    /// Total records and lines dropped for parse reasons.
    pub fn skipped(&self) -> u64 {
        self.tokenize_errors + self.malformed_rows + self.coercion_errors + self.invalid_sizes
    }
}

/// Everything one partition produces. Purely local until the reduce step.
#[derive(Debug, Default)]
struct PartitionOutput {
    counts: HashMap<(String, u32), u64>,
    stats: ParseStats,
    raw: Option<String>,
}

/// Slice `text` into byte ranges of roughly `blocksize`, each extended
/// forward to the next line boundary so no line is split across two
/// partitions.
pub fn partition_ranges(text: &str, blocksize: usize) -> Vec<Range<usize>> {
    let blocksize = blocksize.max(1);
    let bytes = text.as_bytes();
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = start.saturating_add(blocksize).min(bytes.len());
        while end < bytes.len() && bytes[end - 1] != b'\n' {
            end += 1;
        }
        ranges.push(start..end);
        start = end;
    }
    ranges
}

/// Run the full parse pipeline over one partition.
///
/// `want_raw` buffers every valid `(size, type)` pair as CSV for the
/// auxiliary export; the buffer stays partition-local and is concatenated
/// in partition order by the reducer.
fn map_partition(
    text: &str,
    range: Range<usize>,
    schema: &TableSchema,
    projection: Projection,
    want_raw: bool,
) -> Result<PartitionOutput, ParseError> {
    if range.start != 0 && text.as_bytes()[range.start - 1] != b'\n' {
        // The single-line-statement precondition does not hold for this
        // range; merging it could splice partial tokens across the cut.
        return Err(ParseError::PartitionMisaligned {
            offset: range.start,
        });
    }
    let slice = &text[range];
    let mut out = PartitionOutput {
        raw: want_raw.then(String::new),
        ..Default::default()
    };

    for line in slice.lines() {
        let tokens = match tokenize_line(line) {
            Ok(tokens) => tokens,
            Err(err) => {
                tracing::debug!(%err, "dropping line");
                out.stats.tokenize_errors += 1;
                continue;
            }
        };
        if tokens.is_empty() {
            out.stats.lines_ignored += 1;
            continue;
        }
        let (groups, row_errors) = group_rows(tokens, schema.arity());
        for err in &row_errors {
            tracing::debug!(%err, "dropping row");
        }
        out.stats.malformed_rows += row_errors.len() as u64;
        for group in groups {
            let record = match coerce_row(schema, group) {
                Ok(record) => record,
                Err(err) => {
                    tracing::debug!(%err, "dropping record");
                    out.stats.coercion_errors += 1;
                    continue;
                }
            };
            let pair = projection.project(&record);
            let bin = match bin_for_size(pair.size) {
                Ok(bin) => bin,
                Err(err) => {
                    tracing::debug!(%err, "dropping record");
                    out.stats.invalid_sizes += 1;
                    continue;
                }
            };
            if let Some(buf) = out.raw.as_mut() {
                let _ = writeln!(buf, "{},{}", pair.size, csv_field(&pair.inode_type));
            }
            *out.counts.entry((pair.inode_type, bin)).or_insert(0) += 1;
            out.stats.records += 1;
        }
    }
    Ok(out)
}

fn effective_workers(config: &Config, partitions: usize) -> usize {
    let workers = match config.scheduler {
        Scheduler::SingleThreaded => 1,
        Scheduler::Threads | Scheduler::Processes => {
            if config.workers == 0 {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            } else {
                config.workers
            }
        }
    };
    workers.min(partitions).max(1)
}

/// Aggregate raw dump text into the final histogram.
///
/// Takes ownership of the text: partitions only ever borrow byte ranges of
/// this one allocation, parsed records never accumulate beyond a single
/// row group at a time.
pub fn aggregate_text(text: String, config: &Config) -> Result<(HistogramTable, ParseStats)> {
    let schema = TableSchema::entries();
    aggregate_text_with_schema(text, schema, config)
}

/// Same as [`aggregate_text`] with a caller-supplied schema, for dumps
/// whose `entries` table has a different column layout.
pub fn aggregate_text_with_schema(
    text: String,
    schema: TableSchema,
    config: &Config,
) -> Result<(HistogramTable, ParseStats)> {
    let projection = Projection::for_schema(&schema)?;
    let want_raw = config.save_csv.is_some();
    let ranges = partition_ranges(&text, config.blocksize);
    let workers = effective_workers(config, ranges.len());
    tracing::info!(
        partitions = ranges.len(),
        workers,
        scheduler = config.scheduler.as_str(),
        "partitioned dump"
    );

    let mut outputs: Vec<(usize, Result<PartitionOutput, ParseError>)> =
        if workers <= 1 {
            ranges
                .into_iter()
                .enumerate()
                .map(|(idx, range)| {
                    (idx, map_partition(&text, range, &schema, projection, want_raw))
                })
                .collect()
        } else {
            let text = Arc::new(text);
            let schema = Arc::new(schema);
            let results = Arc::new(Mutex::new(Vec::new()));
            let pool = Pool::<ThunkWorker<()>>::new(workers);
            for (idx, range) in ranges.into_iter().enumerate() {
                let text = text.clone();
                let schema = schema.clone();
                let results = results.clone();
                pool.execute(Thunk::of(move || {
                    let out = map_partition(&text, range, &schema, projection, want_raw);
                    results.lock().unwrap().push((idx, out));
                }));
            }
            pool.join();
            let collected = std::mem::take(&mut *results.lock().unwrap());
            collected
        };
    // Partition order, for the deterministic raw export.
    outputs.sort_by_key(|(idx, _)| *idx);

    let mut merged: HashMap<(String, u32), u64> = HashMap::new();
    let mut stats = ParseStats::default();
    let mut raw_parts: Vec<String> = Vec::new();
    for (idx, result) in outputs {
        match result {
            Ok(out) => {
                for (key, n) in out.counts {
                    *merged.entry(key).or_insert(0) += n;
                }
                stats.merge(&out.stats);
                if let Some(raw) = out.raw {
                    raw_parts.push(raw);
                }
            }
            Err(err) => {
                tracing::warn!(partition = idx, %err, "discarding partition");
            }
        }
    }

    if let Some(path) = &config.save_csv {
        write_raw_export(path, &raw_parts)
            .with_context(|| format!("Failed to write raw export to {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved raw (size, type) export");
    }

    if stats.skipped() > 0 {
        tracing::warn!(
            skipped = stats.skipped(),
            tokenize_errors = stats.tokenize_errors,
            malformed_rows = stats.malformed_rows,
            coercion_errors = stats.coercion_errors,
            invalid_sizes = stats.invalid_sizes,
            "dropped corrupt dump content"
        );
    }

    Ok((HistogramTable::from_counts(&merged), stats))
}

/// Build the histogram for a dump file on disk.
pub fn histogram_from_dump(path: &Path, config: &Config) -> Result<(HistogramTable, ParseStats)> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dump file {}", path.display()))?;
    aggregate_text(text, config)
}

fn write_raw_export(path: &Path, parts: &[String]) -> Result<()> {
    let mut file = File::create(path)?;
    file.write_all(b"size,type\n")?;
    for part in parts {
        file.write_all(part.as_bytes())?;
    }
    Ok(())
}
