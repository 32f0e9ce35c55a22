//! tunetag-scan - locate trigger sounds in a PCM clip
//!
//! Reads a 16-bit mono WAV clip and a reference fingerprint of the trigger
//! sound, runs the scan engine, and prints the tag list as JSON with the
//! legacy wire field names.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tunetag_scan::{AudioClip, ReferenceFingerprint, ScanConfig, ScanRequest, TriggerScanner};

#[derive(Parser, Debug)]
#[command(name = "tunetag-scan", version, about = "Locate trigger sounds in a PCM clip")]
struct Cli {
    /// 16-bit mono WAV clip to scan
    input: PathBuf,

    /// Raw reference fingerprint of the trigger sound
    reference: PathBuf,

    /// Absolute stream offset of the clip start, in milliseconds
    #[arg(long, default_value_t = 0)]
    data_offset: i64,

    /// Fingerprint frame rate in Hz (defaults to the WAV sample rate)
    #[arg(long)]
    fingerprint_rate: Option<u32>,

    /// External fingerprint tool binary
    #[arg(long, env = "TUNETAG_TOOL_PATH")]
    tool_path: Option<PathBuf>,

    /// Writable scratch root
    #[arg(long, env = "TUNETAG_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Window-collection workers (1 = sequential sweep)
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// Keep per-offset comparison records under the scratch directory
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if cli
        .input
        .file_stem()
        .map_or(true, |stem| stem.is_empty())
    {
        bail!("input file name is empty");
    }

    let file_config = tunetag_common::config::load_file_config();
    let root_dir = tunetag_common::config::resolve_root_dir(cli.root_dir.as_deref(), &file_config);
    let tool_path = tunetag_common::config::resolve_tool_path(cli.tool_path.as_deref(), &file_config)?;
    std::fs::create_dir_all(&root_dir)
        .with_context(|| format!("creating scratch root {}", root_dir.display()))?;

    let reader = hound::WavReader::open(&cli.input)
        .with_context(|| format!("opening {}", cli.input.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 || spec.bits_per_sample != 16 {
        bail!(
            "expected 16-bit mono WAV, got {} channel(s) at {} bit",
            spec.channels,
            spec.bits_per_sample
        );
    }
    let samples: Vec<i16> = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<_, _>>()
        .with_context(|| format!("decoding {}", cli.input.display()))?;

    let duration = samples.len() as u32 / spec.sample_rate;
    let fingerprint_rate = cli.fingerprint_rate.unwrap_or(spec.sample_rate);
    let clip = AudioClip {
        size: samples.len() as u32,
        samples,
        sample_rate: spec.sample_rate,
        duration,
        fingerprint_rate,
    };

    let reference_data = std::fs::read(&cli.reference)
        .with_context(|| format!("reading {}", cli.reference.display()))?;
    let reference = ReferenceFingerprint {
        size: reference_data.len() as u32,
        data: reference_data,
    };

    let workers = if cli.workers > 1 {
        cli.workers
    } else {
        file_config.workers.unwrap_or(1)
    };
    let config = ScanConfig::new(root_dir, tool_path)
        .with_debug(cli.debug)
        .with_workers(workers);

    info!(
        input = %cli.input.display(),
        duration,
        fingerprint_rate,
        "starting trigger scan"
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received, cancelling scan");
                cancel.cancel();
            }
        });
    }

    let scanner = TriggerScanner::new(config);
    let outcome = scanner
        .scan(
            ScanRequest {
                data_offset: cli.data_offset,
                clip,
                reference,
            },
            cancel,
        )
        .await?;

    info!(tags = outcome.tag_counts, "scan complete");
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
