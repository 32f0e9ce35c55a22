//! Timestamp utilities

use chrono::Utc;

/// Wall-clock milliseconds since the Unix epoch.
///
/// Scan workspaces seed their scratch-name RNG with this value.
pub fn now_millis() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}
