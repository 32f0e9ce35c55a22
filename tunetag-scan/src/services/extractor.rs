//! Fingerprint extraction via the external descriptor tool
//!
//! The fingerprint algorithm itself lives in an external binary. The
//! extractor writes a probe window as raw little-endian signed 16-bit PCM
//! into the scan's scratch directory, runs
//! `<tool> fingerprint <raw_path> <sample_count>`, and parses the JSON
//! descriptor the tool prints on stdout. Any nonzero exit is an extraction
//! error; the driver decides whether that is fatal for the scan or only for
//! the offset.

use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;
use crate::services::scratch::ScratchWorkspace;
use crate::types::{FingerprintDescriptor, FrameMetrics};

/// Capability: turn a window of samples into a fingerprint descriptor.
pub trait FingerprintExtractor: Send + Sync {
    fn extract(&self, samples: &[i16]) -> Result<FingerprintDescriptor, ScanError>;
}

/// JSON printed by `<tool> fingerprint <raw_path> <sample_count>`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolDescriptor {
    /// Base64 descriptor bytes
    data: String,
    size: u32,
    #[serde(default)]
    frame_count: u32,
    #[serde(default)]
    frame_rate: f64,
}

/// Extractor backed by the external fingerprint binary.
pub struct ToolFingerprintExtractor {
    tool_path: PathBuf,
    scratch: Arc<ScratchWorkspace>,
    cancel: CancellationToken,
}

impl ToolFingerprintExtractor {
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

    fn write_samples(path: &Path, samples: &[i16]) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(samples.len() * 2);
        for s in samples {
            buf.extend_from_slice(&s.to_le_bytes());
        }
        std::fs::write(path, buf)
    }
}

impl FingerprintExtractor for ToolFingerprintExtractor {
    fn extract(&self, samples: &[i16]) -> Result<FingerprintDescriptor, ScanError> {
        let raw_path = self.scratch.next_file("probe", "raw");
        Self::write_samples(&raw_path, samples)?;

        let result = run_tool(
            Command::new(&self.tool_path)
                .arg("fingerprint")
                .arg(&raw_path)
                .arg(samples.len().to_string()),
            &self.cancel,
        );
        let _ = std::fs::remove_file(&raw_path);

        let output = match result {
            Ok(output) => output,
            Err(ToolFailure::Cancelled) => return Err(ScanError::Cancelled),
            Err(ToolFailure::Io(e)) => {
                return Err(ScanError::Extraction(format!(
                    "{}: {}",
                    self.tool_path.display(),
                    e
                )))
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ScanError::Extraction(format!(
                "exit code {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }

        let parsed: ToolDescriptor = serde_json::from_slice(&output.stdout)
            .map_err(|e| ScanError::Extraction(format!("descriptor parse: {}", e)))?;
        let data = general_purpose::STANDARD
            .decode(&parsed.data)
            .map_err(|e| ScanError::Extraction(format!("descriptor decode: {}", e)))?;
        if data.len() as u32 != parsed.size {
            return Err(ScanError::Extraction(format!(
                "descriptor length {} does not match declared size {}",
                data.len(),
                parsed.size
            )));
        }

        tracing::trace!(
            samples = samples.len(),
            descriptor_bytes = data.len(),
            "extracted fingerprint"
        );

        Ok(FingerprintDescriptor {
            size: parsed.size,
            data,
            metrics: FrameMetrics {
                frame_count: parsed.frame_count,
                frame_rate: parsed.frame_rate,
            },
        })
    }
}

/// Why a tool invocation produced no usable output
pub(crate) enum ToolFailure {
    Cancelled,
    Io(std::io::Error),
}

/// Spawn the tool and wait for it, killing the child if the scan's
/// cancellation token fires while it runs.
///
/// Both pipes are drained on reader threads while the child runs; a tool
/// that writes more than the OS pipe buffer before exiting would otherwise
/// block forever with the poll loop still seeing a live child.
pub(crate) fn run_tool(
    cmd: &mut Command,
    cancel: &CancellationToken,
) -> Result<Output, ToolFailure> {
    let mut child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(ToolFailure::Io)?;

    let stdout_reader = drain_pipe(child.stdout.take());
    let stderr_reader = drain_pipe(child.stderr.take());

    let status = loop {
        if cancel.is_cancelled() {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_reader.join();
            let _ = stderr_reader.join();
            return Err(ToolFailure::Cancelled);
        }
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => std::thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                let _ = stdout_reader.join();
                let _ = stderr_reader.join();
                return Err(ToolFailure::Io(e));
            }
        }
    };

    Ok(Output {
        status,
        stdout: join_pipe(stdout_reader)?,
        stderr: join_pipe(stderr_reader)?,
    })
}

fn drain_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_pipe(reader: JoinHandle<std::io::Result<Vec<u8>>>) -> Result<Vec<u8>, ToolFailure> {
    match reader.join() {
        Ok(Ok(buf)) => Ok(buf),
        Ok(Err(e)) => Err(ToolFailure::Io(e)),
        Err(_) => Err(ToolFailure::Io(std::io::Error::new(
            std::io::ErrorKind::Other,
            "pipe reader thread panicked",
        ))),
    }
}
