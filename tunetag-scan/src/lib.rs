//! # tunetag scan engine
//!
//! Locates occurrences of a known trigger sound inside a PCM clip by
//! sliding-window fingerprint comparison, five-neighbor sign voting, tag
//! pruning and post-trigger payload fingerprinting. The fingerprint
//! algorithm itself lives in an external binary reached through the
//! capability traits in [`services`].

pub mod config;
pub mod error;
pub mod scan;
pub mod services;
pub mod types;

pub use config::ScanConfig;
pub use error::ScanError;
pub use scan::{ScanRequest, TriggerScanner, STRIDE_MS};
pub use types::{
    AudioClip, FingerprintComparison, FingerprintDescriptor, FrameMetrics, ReferenceFingerprint,
    ScanOutcome, TriggerTag,
};
