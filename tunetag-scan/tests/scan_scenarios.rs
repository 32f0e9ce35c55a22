//! End-to-end scan scenarios over deterministic mock collaborators
//!
//! The mock extractor encodes each window's start position into the
//! descriptor it returns, and the mock comparer assigns frame-start-time
//! signs per window position. That makes every sweep fully deterministic
//! without the external fingerprint tool.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use tunetag_scan::services::{FingerprintComparer, FingerprintExtractor};
use tunetag_scan::{
    AudioClip, FingerprintComparison, FingerprintDescriptor, ReferenceFingerprint, ScanConfig,
    ScanError, ScanOutcome, ScanRequest, TriggerScanner,
};

const RATE: u32 = 11025;

/// Samples encode their own index (i / 64), so a window's first sample
/// recovers the window's start position to within a few milliseconds.
fn encoded_clip(duration: u32, rate: u32) -> AudioClip {
    let len = (duration * rate) as usize;
    let samples: Vec<i16> = (0..len).map(|i| (i / 64) as i16).collect();
    AudioClip {
        size: len as u32,
        samples,
        sample_rate: rate,
        duration,
        fingerprint_rate: rate,
    }
}

fn reference() -> ReferenceFingerprint {
    ReferenceFingerprint {
        data: vec![9; 32],
        size: 32,
    }
}

/// Extractor that stores the window's start position (ms, snapped to the
/// 100 ms probe grid) as the descriptor bytes.
struct EncodingExtractor {
    rate: u32,
    fail_at_ms: Option<i64>,
}

impl EncodingExtractor {
    fn new(rate: u32) -> Self {
        Self {
            rate,
            fail_at_ms: None,
        }
    }

    fn failing_at(rate: u32, fail_at_ms: i64) -> Self {
        Self {
            rate,
            fail_at_ms: Some(fail_at_ms),
        }
    }

    fn window_start_ms(&self, samples: &[i16]) -> i64 {
        let first = samples.first().copied().unwrap_or(0) as i64;
        let raw_ms = first * 64 * 1000 / self.rate as i64;
        (raw_ms + 50) / 100 * 100
    }
}

impl FingerprintExtractor for EncodingExtractor {
    fn extract(&self, samples: &[i16]) -> Result<FingerprintDescriptor, ScanError> {
        let start_ms = self.window_start_ms(samples);
        if self.fail_at_ms == Some(start_ms) {
            return Err(ScanError::Extraction("descriptor tool failed".to_string()));
        }
        Ok(FingerprintDescriptor::from_bytes(
            start_ms.to_le_bytes().to_vec(),
        ))
    }
}

/// Comparer that assigns signs by window position: every position carries
/// the default sign except the listed flips.
struct SignComparer {
    default_positive: bool,
    flips: HashSet<i64>,
    similarity_at: HashMap<i64, f64>,
}

impl SignComparer {
    fn negative_except(positive_at: &[i64]) -> Self {
        Self {
            default_positive: false,
            flips: positive_at.iter().copied().collect(),
            similarity_at: HashMap::new(),
        }
    }

    fn all_positive() -> Self {
        Self {
            default_positive: true,
            flips: HashSet::new(),
            similarity_at: HashMap::new(),
        }
    }

    fn with_similarity(mut self, start_ms: i64, similarity: f64) -> Self {
        self.similarity_at.insert(start_ms, similarity);
        self
    }

    fn start_ms(descriptor: &FingerprintDescriptor) -> i64 {
        let bytes: [u8; 8] = descriptor.data[..8].try_into().unwrap();
        i64::from_le_bytes(bytes)
    }
}

impl FingerprintComparer for SignComparer {
    fn compare(
        &self,
        a: &FingerprintDescriptor,
        _reference: &FingerprintDescriptor,
    ) -> Result<FingerprintComparison, ScanError> {
        let start_ms = Self::start_ms(a);
        let positive = self.default_positive ^ self.flips.contains(&start_ms);
        Ok(FingerprintComparison {
            score: 10.0,
            similarity: self.similarity_at.get(&start_ms).copied().unwrap_or(0.9),
            frame_start_time: if positive { 1.5 } else { -2.0 },
            most_similar_frame_position: (start_ms / 100) as i32,
        })
    }
}

fn run_scan(
    extractor: EncodingExtractor,
    comparer: SignComparer,
    duration: u32,
    data_offset: i64,
    workers: usize,
) -> Result<ScanOutcome, ScanError> {
    let root = TempDir::new().unwrap();
    let config = ScanConfig::new(root.path().to_path_buf(), PathBuf::from("/unused/fpx"))
        .with_workers(workers);
    let scanner =
        TriggerScanner::with_collaborators(config, Arc::new(extractor), Arc::new(comparer));
    scanner.scan_blocking(
        &ScanRequest {
            data_offset,
            clip: encoded_clip(duration, RATE),
            reference: reference(),
        },
        &CancellationToken::new(),
    )
}

fn assert_invariants(outcome: &ScanOutcome, data_offset: i64, duration: u32) {
    assert_eq!(outcome.tune_url_counts, outcome.live_tags.len() as u64);
    assert_eq!(outcome.tag_counts, outcome.live_tags.len() as u64);
    for pair in outcome.live_tags.windows(2) {
        assert!(pair[0].data_position < pair[1].data_position);
    }
    for tag in &outcome.live_tags {
        assert!(tag.data_position <= data_offset + 1000 * (duration as i64 - 5));
        assert!(tag.data_position + 1000 + 5000 - data_offset <= 1000 * duration as i64);
        assert!(tag.description.is_some());
    }
}

// S1: a single trigger answered by the N P N N N pattern around 2.9 s
#[test]
fn single_trigger_produces_one_tag() {
    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2900]),
        10,
        0,
        1,
    )
    .unwrap();

    assert_eq!(outcome.tune_url_counts, 1);
    assert_eq!(outcome.live_tags[0].data_position, 2800);
    assert_eq!(outcome.live_tags[0].most_similar_frame_position, 29);
    assert_invariants(&outcome, 0, 10);
}

// S1 continued: the payload fingerprints the region one second after the tag
#[test]
fn payload_covers_region_after_trigger() {
    use base64::{engine::general_purpose, Engine as _};

    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2900]),
        10,
        0,
        1,
    )
    .unwrap();

    let description = outcome.live_tags[0].description.as_deref().unwrap();
    let payload = general_purpose::STANDARD.decode(description).unwrap();
    let payload_start = i64::from_le_bytes(payload[..8].try_into().unwrap());
    assert_eq!(payload_start, outcome.live_tags[0].data_position + 1000);
}

// S2: all-positive signs never form a recognized pattern
#[test]
fn no_trigger_yields_empty_result() {
    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::all_positive(),
        10,
        0,
        1,
    )
    .unwrap();

    assert_eq!(outcome.tune_url_counts, 0);
    assert_eq!(outcome.tag_counts, 0);
    assert!(outcome.live_tags.is_empty());
}

// S3: a hit past the duration limit stops the sweep without emitting
#[test]
fn hit_past_duration_limit_stops_the_sweep() {
    // base offset 4100 voted alone would tag 5100, past the 5000 ms limit
    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[5200]),
        10,
        0,
        1,
    )
    .unwrap();

    assert!(outcome.live_tags.is_empty());
    assert_eq!(outcome.tune_url_counts, 0);
}

// S4: two adjacent qualifying offsets collapse to one representative
#[test]
fn clustered_hits_collapse_to_strongest() {
    // positions 2900..3200 positive: base 1800 votes N P P P P and base
    // 1900 votes P P P P N, producing candidates 100 ms apart
    let comparer =
        SignComparer::negative_except(&[2900, 3000, 3100, 3200]).with_similarity(3300, 0.99);
    let outcome = run_scan(EncodingExtractor::new(RATE), comparer, 10, 0, 1).unwrap();

    assert_eq!(outcome.tune_url_counts, 1);
    assert_eq!(outcome.live_tags[0].data_position, 2900);
    assert_eq!(outcome.live_tags[0].similarity, 0.99);
    assert_invariants(&outcome, 0, 10);
}

// S5: an extraction failure skips its offsets but keeps the rest of the scan
#[test]
fn extractor_failure_mid_scan_is_localized() {
    let outcome = run_scan(
        EncodingExtractor::failing_at(RATE, 7000),
        SignComparer::negative_except(&[2900]),
        10,
        0,
        1,
    )
    .unwrap();

    assert_eq!(outcome.tune_url_counts, 1);
    assert_eq!(outcome.live_tags[0].data_position, 2800);
}

// S6: duration gate boundaries
#[test]
fn duration_boundaries_gate_the_scan() {
    for (duration, accepted) in [(5u32, false), (6, true), (17, true), (18, false)] {
        let result = run_scan(
            EncodingExtractor::new(RATE),
            SignComparer::negative_except(&[]),
            duration,
            0,
            1,
        );
        match (accepted, result) {
            (true, Ok(outcome)) => assert!(outcome.live_tags.is_empty()),
            (false, Err(ScanError::InvalidInput(_))) => {}
            (expected, other) => panic!(
                "duration {}: expected accepted={}, got {:?}",
                duration, expected, other
            ),
        }
    }
}

#[test]
fn two_distant_triggers_both_survive() {
    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2000, 2900]),
        10,
        0,
        1,
    )
    .unwrap();

    assert_eq!(outcome.tune_url_counts, 2);
    assert_eq!(outcome.live_tags[0].data_position, 1900);
    assert_eq!(outcome.live_tags[1].data_position, 2800);
    assert_invariants(&outcome, 0, 10);
}

#[test]
fn data_offset_shifts_tag_positions() {
    let outcome = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2900]),
        10,
        60_000,
        1,
    )
    .unwrap();

    assert_eq!(outcome.live_tags[0].data_position, 62_800);
    assert_invariants(&outcome, 60_000, 10);
}

#[test]
fn parallel_sweep_matches_sequential_sweep() {
    let positions = |outcome: &ScanOutcome| -> Vec<i64> {
        outcome.live_tags.iter().map(|t| t.data_position).collect()
    };

    let sequential = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2000, 2900]),
        10,
        0,
        1,
    )
    .unwrap();
    let parallel = run_scan(
        EncodingExtractor::new(RATE),
        SignComparer::negative_except(&[2000, 2900]),
        10,
        0,
        4,
    )
    .unwrap();

    assert_eq!(positions(&sequential), positions(&parallel));
    assert_eq!(sequential.tune_url_counts, parallel.tune_url_counts);
}

#[tokio::test]
async fn async_entry_runs_the_same_scan() {
    let root = TempDir::new().unwrap();
    let config = ScanConfig::new(root.path().to_path_buf(), PathBuf::from("/unused/fpx"));
    let scanner = TriggerScanner::with_collaborators(
        config,
        Arc::new(EncodingExtractor::new(RATE)),
        Arc::new(SignComparer::negative_except(&[2900])),
    );

    let outcome = scanner
        .scan(
            ScanRequest {
                data_offset: 0,
                clip: encoded_clip(10, RATE),
                reference: reference(),
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.tune_url_counts, 1);
    assert_eq!(outcome.live_tags[0].data_position, 2800);
}

#[tokio::test]
async fn cancelled_scan_returns_cancelled() {
    let root = TempDir::new().unwrap();
    let config = ScanConfig::new(root.path().to_path_buf(), PathBuf::from("/unused/fpx"));
    let scanner = TriggerScanner::with_collaborators(
        config,
        Arc::new(EncodingExtractor::new(RATE)),
        Arc::new(SignComparer::negative_except(&[2900])),
    );

    let cancel = CancellationToken::new();
    cancel.cancel();
    let result = scanner
        .scan(
            ScanRequest {
                data_offset: 0,
                clip: encoded_clip(10, RATE),
                reference: reference(),
            },
            cancel,
        )
        .await;

    assert!(matches!(result, Err(ScanError::Cancelled)));
}
