//! Recoverable parse error kinds.
//!
//! Every variant here is local to one line, row, or record of the dump and
//! never aborts a run; the aggregator counts them and moves on. Structural
//! failures (unreadable input, unwritable output) go through `anyhow` at the
//! application boundary instead.

use std::fmt;

/// A per-line or per-record parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A quoted literal was still open at the end of the line. The whole
    /// line is dropped; emitting the tokens seen so far would silently
    /// shift column alignment for every row after the bad one.
    UnterminatedQuote { pos: usize },
    /// The line ended in the middle of a backslash escape.
    DanglingEscape,
    /// A reconstructed row group did not have the schema's arity.
    RowShape { expected: usize, got: usize },
    /// A value could not be coerced to its column's type.
    FieldCoercion { column: String, value: String },
    /// A negative size reached the binning step.
    InvalidSize { size: i64 },
    /// A partition byte range does not begin at a line boundary, so its
    /// first statement may already be truncated. The fragment is not
    /// merged.
    PartitionMisaligned { offset: usize },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnterminatedQuote { pos } => {
                write!(f, "unterminated quoted literal starting at byte {pos}")
            }
            ParseError::DanglingEscape => {
                write!(f, "line ends in the middle of an escape sequence")
            }
            ParseError::RowShape { expected, got } => {
                write!(f, "row has {got} values, expected {expected}")
            }
            ParseError::FieldCoercion { column, value } => {
                write!(f, "column '{column}': cannot coerce '{value}' to an integer")
            }
            ParseError::InvalidSize { size } => {
                write!(f, "negative inode size {size}")
            }
            ParseError::PartitionMisaligned { offset } => {
                write!(f, "partition at byte {offset} does not start on a line boundary")
            }
        }
    }
}

impl std::error::Error for ParseError {}
