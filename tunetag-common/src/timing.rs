//! Millisecond/sample timing math for fingerprint scans
//!
//! The scan engine measures every position as integer milliseconds relative
//! to the start of the sample buffer. Sample-index conversions go through the
//! clip's fingerprint frame rate using 64-bit truncating arithmetic; window
//! slicing relies on the truncation semantics, so these helpers are the only
//! place the conversion formula lives.
//!
//! | Quantity       | Unit                | Type  |
//! |----------------|---------------------|-------|
//! | positions      | milliseconds        | i64   |
//! | buffer indices | samples             | usize |
//! | rates          | Hz                  | u32   |

/// 64-bit `a * b / c` with truncating division.
pub fn muldiv(a: i64, b: i64, c: i64) -> i64 {
    a * b / c
}

/// Convert a millisecond position to a sample index at `rate` Hz.
///
/// Negative positions clamp to index 0.
pub fn ms_to_samples(ms: i64, rate: u32) -> usize {
    muldiv(ms, rate as i64, 1000).max(0) as usize
}
