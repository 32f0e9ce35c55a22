//! Scan driver
//!
//! Sweeps the clip at a fixed stride, collects a five-probe window group at
//! each offset, votes, prunes the candidates and attaches payload
//! fingerprints. The sweep stops as soon as a candidate lands past the
//! duration limit, which keeps every emitted tag's payload region inside
//! the clip.

use rayon::prelude::*;
use std::fs::File;
use std::io::Write;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tunetag_common::time::now_millis;
use tunetag_common::timing::muldiv;

use crate::config::ScanConfig;
use crate::error::ScanError;
use crate::services::comparer::{FingerprintComparer, ToolFingerprintComparer};
use crate::services::extractor::{FingerprintExtractor, ToolFingerprintExtractor};
use crate::services::pattern_voter::{PatternVoter, Vote};
use crate::services::payload_extractor::PayloadExtractor;
use crate::services::scratch::ScratchWorkspace;
use crate::services::tag_pruner::TagPruner;
use crate::services::window_collector::{WindowCollector, WindowGroup};
use crate::types::{
    AudioClip, FingerprintDescriptor, ReferenceFingerprint, ScanOutcome, TriggerTag,
};

/// Sweep stride between scan offsets, in ms.
pub const STRIDE_MS: i64 = 100;

/// Gap between a voted offset and the tag position it produces, in ms.
const TAG_LEAD_MS: i64 = 1000;

/// One scan invocation's inputs.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Absolute stream offset of sample index 0, in ms
    pub data_offset: i64,
    pub clip: AudioClip,
    pub reference: ReferenceFingerprint,
}

/// Drives the sweep over a clip and produces the final tag list.
#[derive(Clone)]
pub struct TriggerScanner {
    config: ScanConfig,
    collaborators: Option<(Arc<dyn FingerprintExtractor>, Arc<dyn FingerprintComparer>)>,
}

impl TriggerScanner {
    /// Scanner backed by the external fingerprint tool named in `config`.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            collaborators: None,
        }
    }

    /// Scanner with injected extractor and comparer.
    pub fn with_collaborators(
        config: ScanConfig,
        extractor: Arc<dyn FingerprintExtractor>,
        comparer: Arc<dyn FingerprintComparer>,
    ) -> Self {
        Self {
            config,
            collaborators: Some((extractor, comparer)),
        }
    }

    /// Run the scan on a blocking worker thread.
    pub async fn scan(
        &self,
        request: ScanRequest,
        cancel: CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.scan_blocking(&request, &cancel))
            .await
            .expect("scan task panicked")
    }

    /// Run the scan on the calling thread.
    pub fn scan_blocking(
        &self,
        request: &ScanRequest,
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        validate(request)?;
        let clip = &request.clip;

        let scratch = Arc::new(ScratchWorkspace::create(
            &self.config.root_dir,
            now_millis(),
            self.config.debug,
        )?);
        let debug_file = match scratch.debug_dir() {
            Some(dir) => Some(Arc::new(Mutex::new(File::create(dir.join("probes.jsonl"))?))),
            None => None,
        };

        let (extractor, comparer) = match &self.collaborators {
            Some((e, c)) => (e.clone(), c.clone()),
            None => (
                Arc::new(ToolFingerprintExtractor::new(
                    self.config.tool_path.clone(),
                    scratch.clone(),
                    cancel.clone(),
                )) as Arc<dyn FingerprintExtractor>,
                Arc::new(ToolFingerprintComparer::new(
                    self.config.tool_path.clone(),
                    scratch.clone(),
                    cancel.clone(),
                )) as Arc<dyn FingerprintComparer>,
            ),
        };

        let reference = FingerprintDescriptor::from_bytes(request.reference.data.clone());
        let collector =
            WindowCollector::new(extractor.clone(), comparer, self.config.probe_delta_ms);

        let counts = muldiv(1000, clip.duration as i64, STRIDE_MS);
        let max_duration = clip.max_duration_ms();
        let duration_limit = request.data_offset + 1000 * (clip.duration as i64 - 5);

        tracing::info!(
            offsets = counts,
            duration = clip.duration,
            workers = self.config.workers,
            "starting trigger sweep"
        );

        // Per-offset collection results, in ascending elapse order. The
        // sequential path stays lazy so the duration-limit stop below also
        // stops probing.
        let offsets = (0..counts)
            .map(|k| k * STRIDE_MS)
            .take_while(|&elapse| elapse < max_duration);
        let collect_one = |elapse: i64| -> Result<(i64, Option<WindowGroup>), ScanError> {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled);
            }
            match collector.collect(clip, &reference, elapse) {
                Ok(group) => {
                    record_probe(&debug_file, elapse, Some(&group), None);
                    Ok((elapse, Some(group)))
                }
                Err(fatal @ (ScanError::Cancelled | ScanError::ScratchIo(_))) => Err(fatal),
                Err(e) => {
                    tracing::debug!(elapse, error = %e, "probe failed, skipping offset");
                    record_probe(&debug_file, elapse, None, Some(&e));
                    Ok((elapse, None))
                }
            }
        };

        let collected: Box<dyn Iterator<Item = Result<(i64, Option<WindowGroup>), ScanError>> + '_> =
            if self.config.workers > 1 {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(self.config.workers)
                    .build()
                    .map_err(|e| ScanError::InvalidInput(format!("worker pool: {}", e)))?;
                let offsets: Vec<i64> = offsets.collect();
                let mut groups: Vec<Result<(i64, Option<WindowGroup>), ScanError>> =
                    pool.install(|| offsets.par_iter().map(|&elapse| collect_one(elapse)).collect());
                groups.sort_by_key(|item| match item {
                    Ok((elapse, _)) => *elapse,
                    Err(_) => i64::MIN,
                });
                Box::new(groups.into_iter())
            } else {
                Box::new(offsets.map(collect_one))
            };

        let mut candidates: Vec<TriggerTag> = Vec::new();
        for item in collected {
            let (elapse, group) = item?;
            let Some(group) = group else { continue };
            if !group.is_complete() {
                continue;
            }
            if let Vote::Hit(pattern) = PatternVoter::vote(&group) {
                let (_, fcr) = &group.pairs[pattern.hit_index()];
                let data_position = request.data_offset + elapse + TAG_LEAD_MS;
                if data_position > duration_limit {
                    tracing::debug!(
                        elapse,
                        data_position,
                        duration_limit,
                        "candidate past duration limit, stopping sweep"
                    );
                    break;
                }
                tracing::debug!(elapse, data_position, ?pattern, "trigger candidate");
                candidates.push(TriggerTag {
                    data_position,
                    most_similar_frame_position: fcr.most_similar_frame_position,
                    score: fcr.score,
                    similarity: fcr.similarity,
                    description: None,
                });
            }
        }

        let pruned = TagPruner::prune(candidates);
        let live_tags = PayloadExtractor::new(extractor).attach_payloads(
            clip,
            request.data_offset,
            pruned,
            cancel,
        )?;

        let accepted = live_tags.len() as u64;
        tracing::info!(tags = accepted, "trigger sweep complete");

        Ok(ScanOutcome {
            tune_url_counts: accepted,
            tag_counts: accepted,
            live_tags,
        })
    }
}

fn validate(request: &ScanRequest) -> Result<(), ScanError> {
    let clip = &request.clip;
    if !(6..=17).contains(&clip.duration) {
        return Err(ScanError::InvalidInput(format!(
            "duration {} outside 6..=17 seconds",
            clip.duration
        )));
    }
    if clip.samples.len() != clip.size as usize {
        return Err(ScanError::InvalidInput(format!(
            "sample buffer length {} does not match declared size {}",
            clip.samples.len(),
            clip.size
        )));
    }
    if request.reference.data.len() != request.reference.size as usize {
        return Err(ScanError::InvalidInput(format!(
            "reference fingerprint length {} does not match declared size {}",
            request.reference.data.len(),
            request.reference.size
        )));
    }
    if clip.sample_rate == 0 || clip.fingerprint_rate == 0 {
        return Err(ScanError::InvalidInput(
            "sample rate and fingerprint rate must be nonzero".to_string(),
        ));
    }
    if request.data_offset < 0 {
        return Err(ScanError::InvalidInput(format!(
            "data offset {} is negative",
            request.data_offset
        )));
    }
    Ok(())
}

fn record_probe(
    debug_file: &Option<Arc<Mutex<File>>>,
    elapse: i64,
    group: Option<&WindowGroup>,
    error: Option<&ScanError>,
) {
    let Some(file) = debug_file else { return };
    let line = match (group, error) {
        (Some(group), _) => serde_json::json!({
            "elapse": elapse,
            "frameStartTimes": group
                .pairs
                .iter()
                .map(|(_, fcr)| fcr.frame_start_time)
                .collect::<Vec<_>>(),
            "similarities": group
                .pairs
                .iter()
                .map(|(_, fcr)| fcr.similarity)
                .collect::<Vec<_>>(),
        }),
        (None, Some(error)) => serde_json::json!({
            "elapse": elapse,
            "error": error.to_string(),
        }),
        (None, None) => return,
    };
    if let Ok(mut file) = file.lock() {
        let _ = writeln!(file, "{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn clip(duration: u32, rate: u32) -> AudioClip {
        let samples = vec![0i16; (duration * rate) as usize];
        AudioClip {
            size: samples.len() as u32,
            samples,
            sample_rate: rate,
            duration,
            fingerprint_rate: rate,
        }
    }

    fn request(clip: AudioClip) -> ScanRequest {
        ScanRequest {
            data_offset: 0,
            clip,
            reference: ReferenceFingerprint {
                data: vec![1, 2, 3],
                size: 3,
            },
        }
    }

    fn scanner(root: &std::path::Path) -> TriggerScanner {
        TriggerScanner::new(ScanConfig::new(
            root.to_path_buf(),
            std::path::PathBuf::from("/nonexistent/fpx"),
        ))
    }

    #[test]
    fn duration_below_range_is_rejected() {
        let root = TempDir::new().unwrap();
        let result = scanner(root.path()).scan_blocking(
            &request(clip(5, 1000)),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn duration_above_range_is_rejected() {
        let root = TempDir::new().unwrap();
        let result = scanner(root.path()).scan_blocking(
            &request(clip(18, 1000)),
            &CancellationToken::new(),
        );
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn sample_size_mismatch_is_rejected() {
        let root = TempDir::new().unwrap();
        let mut bad = clip(10, 1000);
        bad.size += 1;
        let result =
            scanner(root.path()).scan_blocking(&request(bad), &CancellationToken::new());
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn reference_size_mismatch_is_rejected() {
        let root = TempDir::new().unwrap();
        let mut req = request(clip(10, 1000));
        req.reference.size = 99;
        let result = scanner(root.path()).scan_blocking(&req, &CancellationToken::new());
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn negative_data_offset_is_rejected() {
        let root = TempDir::new().unwrap();
        let mut req = request(clip(10, 1000));
        req.data_offset = -1;
        let result = scanner(root.path()).scan_blocking(&req, &CancellationToken::new());
        assert!(matches!(result, Err(ScanError::InvalidInput(_))));
    }

    #[test]
    fn cancelled_token_stops_before_probing() {
        let root = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = scanner(root.path()).scan_blocking(&request(clip(10, 1000)), &cancel);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }
}
