//! Logarithmic size binning.
//!
//! Bin 0 holds exactly size 0; a positive size `s` lands in bin
//! `1 + ceil(log2(s))`, so the inverse label `boundary_for_bin(b)` is the
//! smallest power of two that is >= every size in the bin. Computed with
//! integer arithmetic only; a float log2 would misplace sizes near the
//! 2^53 precision edge.

use crate::error::ParseError;

/// Map an inode size to its histogram bin index.
///
/// Sizes are byte counts and therefore non-negative; a negative value is
/// rejected rather than binned, it means an upstream coercion bug or a
/// corrupt record.
pub fn bin_for_size(size: i64) -> Result<u32, ParseError> {
    if size < 0 {
        return Err(ParseError::InvalidSize { size });
    }
    if size == 0 {
        return Ok(0);
    }
    // ceil(log2(s)) is the bit width of s - 1 (0 for s == 1).
    let s = size as u64;
    Ok(1 + (64 - (s - 1).leading_zeros()))
}

/// Inverse mapping: the upper size boundary a bin index represents.
pub fn boundary_for_bin(index: u32) -> u64 {
    if index == 0 {
        0
    } else {
        1u64 << (index - 1)
    }
}
