//! Error types for the scan engine

use thiserror::Error;

/// Scan errors
///
/// Extraction and comparison failures inside the sweep are localized to the
/// offending offset by the driver; the other variants abort the scan with no
/// partial result.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Input validation failed (duration gate, size mismatches)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The external fingerprint tool failed for a probe
    #[error("Fingerprint extraction failed: {0}")]
    Extraction(String),

    /// The fingerprint comparer failed for a probe
    #[error("Fingerprint comparison failed: {0}")]
    Comparison(String),

    /// The scratch directory could not be created or written
    #[error("Scratch directory error: {0}")]
    ScratchIo(#[from] std::io::Error),

    /// The scan was cancelled
    #[error("Scan cancelled")]
    Cancelled,
}
