//! Five-probe window collection around one scan offset
//!
//! For a base offset `elapse` the collector probes five one-second windows
//! trailing it, spaced `delta` apart, and compares each window's fingerprint
//! against the reference. The voter only ever sees complete groups; a window
//! that would run past the end of the clip stops collection early and leaves
//! the group incomplete.

use std::sync::Arc;
use tunetag_common::timing::ms_to_samples;

use crate::error::ScanError;
use crate::services::comparer::FingerprintComparer;
use crate::services::extractor::FingerprintExtractor;
use crate::types::{AudioClip, FingerprintComparison, FingerprintDescriptor};

/// Probes per scan offset; the voter needs exactly this many.
pub const PROBE_COUNT: usize = 5;

/// Default spacing between consecutive probe windows, in ms.
pub const PROBE_DELTA_MS: i64 = 100;

/// Length of each probed window, in ms.
pub const WINDOW_MS: i64 = 1000;

/// The ordered (descriptor, comparison) pairs probed around one offset.
#[derive(Debug)]
pub struct WindowGroup {
    pub pairs: Vec<(FingerprintDescriptor, FingerprintComparison)>,
}

impl WindowGroup {
    /// True when all five probes produced a pair.
    pub fn is_complete(&self) -> bool {
        self.pairs.len() == PROBE_COUNT
    }
}

/// Collects the probe windows for one base offset.
pub struct WindowCollector {
    extractor: Arc<dyn FingerprintExtractor>,
    comparer: Arc<dyn FingerprintComparer>,
    delta_ms: i64,
}

impl WindowCollector {
    pub fn new(
        extractor: Arc<dyn FingerprintExtractor>,
        comparer: Arc<dyn FingerprintComparer>,
        delta_ms: i64,
    ) -> Self {
        Self {
            extractor,
            comparer,
            delta_ms,
        }
    }

    /// Probe the five windows starting at `elapse + 1000 + k * delta` ms.
    ///
    /// Extraction or comparison failures propagate to the caller, which
    /// localizes them to this offset.
    pub fn collect(
        &self,
        clip: &AudioClip,
        reference: &FingerprintDescriptor,
        elapse_ms: i64,
    ) -> Result<WindowGroup, ScanError> {
        let mut pairs = Vec::with_capacity(PROBE_COUNT);

        for k in 0..PROBE_COUNT as i64 {
            let start_ms = elapse_ms + WINDOW_MS + k * self.delta_ms;
            let i_start = ms_to_samples(start_ms, clip.fingerprint_rate);
            let i_end = ms_to_samples(start_ms + WINDOW_MS, clip.fingerprint_rate);
            if i_end > clip.samples.len() {
                break;
            }

            let fr = self.extractor.extract(&clip.samples[i_start..i_end])?;
            let fcr = self.comparer.compare(&fr, reference)?;
            pairs.push((fr, fcr));
        }

        Ok(WindowGroup { pairs })
    }
}
