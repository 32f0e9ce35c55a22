//! Post-trigger payload fingerprinting
//!
//! Each surviving tag is annotated with a fingerprint of the five-second
//! region that starts one second after the trigger position. A tag whose
//! payload region does not fit inside the clip is dropped rather than
//! emitted without a payload.

use base64::{engine::general_purpose, Engine as _};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tunetag_common::timing::ms_to_samples;

use crate::error::ScanError;
use crate::services::extractor::FingerprintExtractor;
use crate::types::{AudioClip, TriggerTag};

/// Gap between a tag position and the start of its payload region, ms.
pub const PAYLOAD_LEAD_MS: i64 = 1000;

/// Length of the payload region, ms.
pub const PAYLOAD_SPAN_MS: i64 = 5000;

/// Attaches payload fingerprints to pruned tags.
pub struct PayloadExtractor {
    extractor: Arc<dyn FingerprintExtractor>,
}

impl PayloadExtractor {
    pub fn new(extractor: Arc<dyn FingerprintExtractor>) -> Self {
        Self { extractor }
    }

    /// Attach payload descriptions, dropping tags whose payload region runs
    /// past the clip. A per-tag extraction failure drops that tag only;
    /// cancellation aborts the remaining tags.
    pub fn attach_payloads(
        &self,
        clip: &AudioClip,
        data_offset: i64,
        tags: Vec<TriggerTag>,
        cancel: &CancellationToken,
    ) -> Result<Vec<TriggerTag>, ScanError> {
        let max_duration = clip.max_duration_ms();
        let mut kept = Vec::with_capacity(tags.len());

        for mut tag in tags {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }

            let tag_offset = tag.data_position + PAYLOAD_LEAD_MS - data_offset;
            let end_offset = tag_offset + PAYLOAD_SPAN_MS;
            if end_offset >= max_duration {
                tracing::debug!(
                    data_position = tag.data_position,
                    end_offset,
                    "payload region past clip end, dropping tag"
                );
                continue;
            }

            let i_start = ms_to_samples(tag_offset, clip.fingerprint_rate);
            let i_end = ms_to_samples(end_offset, clip.fingerprint_rate);
            if i_end > clip.samples.len() || i_end - i_start >= clip.samples.len() {
                tracing::debug!(
                    data_position = tag.data_position,
                    i_start,
                    i_end,
                    "payload slice outside sample buffer, dropping tag"
                );
                continue;
            }

            match self.extractor.extract(&clip.samples[i_start..i_end]) {
                Ok(descriptor) => {
                    tag.description = Some(general_purpose::STANDARD.encode(&descriptor.data));
                    kept.push(tag);
                }
                Err(fatal @ (ScanError::Cancelled | ScanError::ScratchIo(_))) => return Err(fatal),
                Err(e) => {
                    tracing::debug!(
                        data_position = tag.data_position,
                        error = %e,
                        "payload fingerprint failed, dropping tag"
                    );
                }
            }
        }

        Ok(kept)
    }
}
