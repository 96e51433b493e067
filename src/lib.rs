//! dumphist library - turn a filesystem metadata SQL dump into
//! per-inode-type size histograms.
//!
//! The pipeline runs in two phases: an embarrassingly parallel map over
//! line-aligned byte-range partitions of the dump (tokenize each INSERT
//! line, reconstruct rows, project to `(type, size)`, bin the size), and a
//! single reduce that merges the per-partition counts and reshapes them
//! into a dense [`HistogramTable`].
//!
//! # Modules
//!
//! - [`tokenize`] - split one statement line into field values
//! - [`rows`] - recover row boundaries from the flat token stream
//! - [`schema`] - positional schema mapping and the `(type, size)` projection
//! - [`binning`] - logarithmic size bin mapping and its inverse
//! - [`histogram`] - the dense output table and its serializers
//! - [`aggregate`] - partitioning, scheduling, merge, and parse statistics
//!
//! # Example
//!
//! ```no_run
//! use dumphist::{histogram_from_dump, Config};
//! use std::path::Path;
//!
//! let config = Config::default();
//! let (table, stats) = histogram_from_dump(Path::new("entries.sql"), &config)?;
//! println!("{} records binned, {} skipped", stats.records, stats.skipped());
//! table.print();
//! # anyhow::Ok(())
//! ```

pub mod aggregate;
pub mod binning;
pub mod error;
pub mod histogram;
pub mod rows;
pub mod schema;
pub mod tokenize;

pub use aggregate::{
    aggregate_text, aggregate_text_with_schema, histogram_from_dump, Config, ParseStats,
    Scheduler,
};
pub use error::ParseError;
pub use histogram::HistogramTable;
pub use schema::TableSchema;
