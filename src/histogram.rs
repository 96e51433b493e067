//! The final histogram table: rows are size boundaries, columns are inode
//! types, cells are counts.

use std::collections::{BTreeSet, HashMap};
use std::io::{self, Write};

use serde::Serialize;

use crate::binning::boundary_for_bin;

/// Dense per-type size histogram.
///
/// Rows cover every bin index from 0 through the maximum observed one,
/// labeled by the bin's upper size boundary; gaps a type never hit hold a
/// zero. Built once when aggregation finishes and immutable after that.
#[derive(Debug, Default, Serialize)]
pub struct HistogramTable {
    /// Size boundary label for each row, ascending from 0.
    pub boundaries: Vec<u64>,
    /// Inode type column names, sorted.
    pub types: Vec<String>,
    /// `counts[row][col]` pairs with `boundaries[row]` and `types[col]`.
    pub counts: Vec<Vec<u64>>,
}

impl HistogramTable {
    /// Build the dense table from sparse merged `(type, bin)` counts.
    pub fn from_counts(counts: &HashMap<(String, u32), u64>) -> Self {
        if counts.is_empty() {
            return HistogramTable::default();
        }
        let max_bin = counts.keys().map(|(_, bin)| *bin).max().unwrap_or(0);
        let types: Vec<String> = counts
            .keys()
            .map(|(ty, _)| ty.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let boundaries: Vec<u64> = (0..=max_bin).map(boundary_for_bin).collect();
        let col_index: HashMap<&str, usize> = types
            .iter()
            .enumerate()
            .map(|(col, ty)| (ty.as_str(), col))
            .collect();
        let mut rows = vec![vec![0u64; types.len()]; max_bin as usize + 1];
        for ((ty, bin), n) in counts {
            rows[*bin as usize][col_index[ty.as_str()]] += n;
        }
        HistogramTable {
            boundaries,
            types,
            counts: rows,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Total count for one type across all bins.
    pub fn total_for(&self, inode_type: &str) -> u64 {
        match self.types.iter().position(|t| t == inode_type) {
            Some(col) => self.counts.iter().map(|row| row[col]).sum(),
            None => 0,
        }
    }

    /// Count at a given boundary label for a given type.
    pub fn count_at(&self, boundary: u64, inode_type: &str) -> u64 {
        let row = match self.boundaries.iter().position(|b| *b == boundary) {
            Some(row) => row,
            None => return 0,
        };
        match self.types.iter().position(|t| t == inode_type) {
            Some(col) => self.counts[row][col],
            None => 0,
        }
    }

    /// Write the table as CSV with a `size` index column.
    pub fn write_csv<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let mut header = vec!["size".to_string()];
        header.extend(self.types.iter().map(|t| csv_field(t)));
        writeln!(w, "{}", header.join(","))?;
        for (row, boundary) in self.boundaries.iter().enumerate() {
            let mut fields = vec![boundary.to_string()];
            fields.extend(self.counts[row].iter().map(|c| c.to_string()));
            writeln!(w, "{}", fields.join(","))?;
        }
        Ok(())
    }

    /// Print the table to stdout as an aligned text table.
    pub fn print(&self) {
        if self.is_empty() {
            println!("(no entries)");
            return;
        }
        let headers: Vec<String> = std::iter::once("size".to_string())
            .chain(self.types.iter().cloned())
            .collect();
        let mut widths: Vec<usize> = headers.iter().map(String::len).collect();
        let rows: Vec<Vec<String>> = self
            .boundaries
            .iter()
            .enumerate()
            .map(|(row, boundary)| {
                std::iter::once(boundary.to_string())
                    .chain(self.counts[row].iter().map(|c| c.to_string()))
                    .collect()
            })
            .collect();
        for row in &rows {
            for (col, value) in row.iter().enumerate() {
                widths[col] = widths[col].max(value.len());
            }
        }

        let header_line: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(col, h)| format!("{:>width$}", h, width = widths[col]))
            .collect();
        println!("{}", header_line.join(" | "));
        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        println!("{}", sep.join("-+-"));
        for row in &rows {
            let row_line: Vec<String> = row
                .iter()
                .enumerate()
                .map(|(col, v)| format!("{:>width$}", v, width = widths[col]))
                .collect();
            println!("{}", row_line.join(" | "));
        }
    }
}

/// Quote a CSV field only when it needs it. Inode type names are normally
/// bare words, but they come from the dump uninspected.
pub(crate) fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
