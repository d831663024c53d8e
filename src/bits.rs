//! Bit-run helpers shared by the filter and the estimator.
//!
//! All functions are pure and operate on fixed-width unsigned integers.

/// Number of set bits in `v`.
#[inline]
pub fn count_ones(v: u64) -> u32 {
    v.count_ones()
}

/// Number of set bits across all bytes of `buf`.
#[inline]
pub fn count_ones_in_bytes(buf: &[u8]) -> u32 {
    buf.iter().map(|b| b.count_ones()).sum()
}

/// Number of set bits across a slice of words.
#[inline]
pub fn count_ones_in_words(words: &[u64]) -> u32 {
    words.iter().map(|&w| count_ones(w)).sum()
}

/// Isolates the lowest clear bit of `x` (zero when `x` is all ones).
#[inline]
pub fn lowest_clear_bit(x: u64) -> u64 {
    !x & x.wrapping_add(1)
}

/// Length of the run of set bits starting at bit 0.
///
/// `23` (`0b10111`) yields 3, `897` (`0b1110000001`) yields 1.
#[inline]
pub fn count_trailing_ones(x: u64) -> u8 {
    // The lowest clear bit minus one is a mask of exactly the trailing run.
    count_ones(lowest_clear_bit(x).wrapping_sub(1)) as u8
}
