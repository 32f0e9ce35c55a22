//! Per-scan scratch directory management
//!
//! Every scan owns one subdirectory under the configured root. File names
//! carry a sequence number plus a random suffix drawn from an RNG seeded
//! with the wall clock at scan start, so parallel probe workers never
//! collide on names. The whole subdirectory is removed when the scan ends,
//! including error and cancellation paths.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::ScanError;

/// Scratch file workspace owned by a single scan.
pub struct ScratchWorkspace {
    dir: PathBuf,
    debug_dir: Option<PathBuf>,
    rng: Mutex<StdRng>,
    seq: AtomicU64,
}

impl ScratchWorkspace {
    /// Create `<root>/scan_<suffix>/`, plus `debug/` under it when
    /// requested. Failure to create either directory fails the scan.
    pub fn create(root: &Path, seed: u64, debug: bool) -> Result<Self, ScanError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let suffix: u32 = rng.gen();
        let dir = root.join(format!("scan_{:08x}", suffix));
        std::fs::create_dir_all(&dir)?;

        let debug_dir = if debug {
            let d = dir.join("debug");
            std::fs::create_dir_all(&d)?;
            Some(d)
        } else {
            None
        };

        Ok(Self {
            dir,
            debug_dir,
            rng: Mutex::new(rng),
            seq: AtomicU64::new(0),
        })
    }

    /// Reserve a unique scratch file path.
    pub fn next_file(&self, prefix: &str, ext: &str) -> PathBuf {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let suffix: u32 = self.rng.lock().unwrap().gen();
        self.dir
            .join(format!("{}_{:04}_{:08x}.{}", prefix, seq, suffix, ext))
    }

    /// The scan's scratch directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The `debug/` subdirectory, when debug records are enabled
    pub fn debug_dir(&self) -> Option<&Path> {
        self.debug_dir.as_deref()
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.dir) {
            tracing::debug!(
                dir = %self.dir.display(),
                error = %e,
                "scratch cleanup failed"
            );
        }
    }
}
