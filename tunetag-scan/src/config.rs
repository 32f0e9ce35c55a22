//! Scan configuration

use crate::services::window_collector::PROBE_DELTA_MS;
use std::path::PathBuf;

/// Configuration threaded through a trigger scan.
///
/// Everything a scan needs travels with this struct; there is no
/// process-wide state.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Writable scratch root; each scan creates its own subdirectory here
    pub root_dir: PathBuf,
    /// External fingerprint tool binary
    pub tool_path: PathBuf,
    /// Keep per-offset comparison records under `<scratch>/debug/`
    pub debug: bool,
    /// Window-collection workers; values up to 1 select the sequential sweep
    pub workers: usize,
    /// Spacing between the five probe windows of one offset, in ms
    pub probe_delta_ms: i64,
}

impl ScanConfig {
    /// Create a config with defaults: sequential sweep, no debug records.
    pub fn new(root_dir: PathBuf, tool_path: PathBuf) -> Self {
        Self {
            root_dir,
            tool_path,
            debug: false,
            workers: 1,
            probe_delta_ms: PROBE_DELTA_MS,
        }
    }

    /// Enable per-offset debug records
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the window-collection worker count
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }
}
