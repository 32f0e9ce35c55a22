//! Fingerprint comparison via the external descriptor tool
//!
//! `<tool> compare <a_path> <b_path>` reads two descriptor files and prints a
//! JSON comparison record on stdout. The record's `frameStartTime` sign is
//! the signal the pattern voter runs on.

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;
use crate::services::extractor::{run_tool, ToolFailure};
use crate::services::scratch::ScratchWorkspace;
use crate::types::{FingerprintComparison, FingerprintDescriptor};

/// Capability: compare two fingerprint descriptors.
pub trait FingerprintComparer: Send + Sync {
    fn compare(
        &self,
        a: &FingerprintDescriptor,
        b: &FingerprintDescriptor,
    ) -> Result<FingerprintComparison, ScanError>;
}

/// Comparer backed by the external fingerprint binary.
pub struct ToolFingerprintComparer {
    tool_path: PathBuf,
    scratch: Arc<ScratchWorkspace>,
    cancel: CancellationToken,
}

impl ToolFingerprintComparer {
    pub fn new(
        tool_path: PathBuf,
        scratch: Arc<ScratchWorkspace>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            tool_path,
            scratch,
            cancel,
        }
    }
}

impl FingerprintComparer for ToolFingerprintComparer {
    fn compare(
        &self,
        a: &FingerprintDescriptor,
        b: &FingerprintDescriptor,
    ) -> Result<FingerprintComparison, ScanError> {
        let a_path = self.scratch.next_file("cmp_a", "fp");
        let b_path = self.scratch.next_file("cmp_b", "fp");
        std::fs::write(&a_path, &a.data)?;
        std::fs::write(&b_path, &b.data)?;

        let result = run_tool(
            Command::new(&self.tool_path)
                .arg("compare")
                .arg(&a_path)
                .arg(&b_path),
            &self.cancel,
        );
        let _ = std::fs::remove_file(&a_path);
        let _ = std::fs::remove_file(&b_path);

        let output = match result {
            Ok(output) => output,
            Err(ToolFailure::Cancelled) => return Err(ScanError::Cancelled),
            Err(ToolFailure::Io(e)) => {
                return Err(ScanError::Comparison(format!(
                    "{}: {}",
                    self.tool_path.display(),
                    e
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::Comparison(format!(
                "exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ScanError::Comparison(format!("comparison parse: {}", e)))
    }
}
