//! Core value types for the trigger scan pipeline

use serde::{Deserialize, Serialize};

/// A fully materialized mono PCM clip plus the rates the scan needs.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Signed 16-bit PCM samples
    pub samples: Vec<i16>,
    /// Declared sample count; must equal `samples.len()`
    pub size: u32,
    /// Capture rate in Hz
    pub sample_rate: u32,
    /// Clip length in whole seconds (accepted range 6..=17)
    pub duration: u32,
    /// Rate at which fingerprint frame offsets are measured, in Hz
    pub fingerprint_rate: u32,
}

impl AudioClip {
    /// Clip length in milliseconds
    pub fn max_duration_ms(&self) -> i64 {
        1000 * self.duration as i64
    }
}

/// Reference descriptor of the trigger sound.
#[derive(Debug, Clone)]
pub struct ReferenceFingerprint {
    /// Opaque descriptor bytes
    pub data: Vec<u8>,
    /// Declared byte length; must equal `data.len()`
    pub size: u32,
}

/// Frame-level metrics reported by the fingerprint tool alongside a
/// descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameMetrics {
    #[serde(default)]
    pub frame_count: u32,
    #[serde(default)]
    pub frame_rate: f64,
}

/// Opaque fingerprint descriptor of one audio window.
#[derive(Debug, Clone)]
pub struct FingerprintDescriptor {
    pub data: Vec<u8>,
    pub size: u32,
    pub metrics: FrameMetrics,
}

impl FingerprintDescriptor {
    /// Wrap raw descriptor bytes, deriving the size field.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        let size = data.len() as u32;
        Self {
            data,
            size,
            metrics: FrameMetrics::default(),
        }
    }
}

/// Result of comparing one window fingerprint against the reference.
///
/// The sign of `frame_start_time` is the only signal the pattern voter
/// consumes: negative reads as N, zero and positive read as P.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FingerprintComparison {
    pub score: f64,
    pub similarity: f64,
    pub frame_start_time: f64,
    pub most_similar_frame_position: i32,
}

/// A located trigger occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerTag {
    /// Absolute stream position of the trigger, in milliseconds
    pub data_position: i64,
    pub most_similar_frame_position: i32,
    pub score: f64,
    pub similarity: f64,
    /// Printable payload fingerprint of the 5-second region after the
    /// trigger
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Final scan output.
///
/// Field names serialize to the legacy wire names (`tuneUrlCounts`,
/// `tagCounts`, `liveTags`); both counts equal `live_tags.len()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanOutcome {
    pub tune_url_counts: u64,
    pub tag_counts: u64,
    pub live_tags: Vec<TriggerTag>,
}
