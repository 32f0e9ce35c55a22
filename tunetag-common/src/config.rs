//! Configuration loading and path resolution
//!
//! Paths resolve with CLI argument > environment variable > TOML config file
//! > OS-dependent default priority. The environment tier is handled by clap's
//! `env` attribute at the binary boundary, so the helpers here only see the
//! merged CLI/env value.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Contents of `~/.config/tunetag/config.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileConfig {
    /// Writable scratch root for scan workspaces
    pub root_dir: Option<PathBuf>,
    /// External fingerprint tool binary
    pub tool_path: Option<PathBuf>,
    /// Default window-collection worker count
    pub workers: Option<usize>,
}

/// Load the TOML config file if present.
///
/// A missing file yields defaults; an unparseable file is ignored with a
/// warning rather than failing startup.
pub fn load_file_config() -> FileConfig {
    let Some(path) = config_file_path() else {
        return FileConfig::default();
    };
    if !path.exists() {
        return FileConfig::default();
    }
    match read_file_config(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Ignoring config file {}: {}", path.display(), e);
            FileConfig::default()
        }
    }
}

/// Read and parse a TOML config file at an explicit path.
pub fn read_file_config(path: &Path) -> Result<FileConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("parse {}: {}", path.display(), e)))
}

/// Platform config file location (`<config dir>/tunetag/config.toml`)
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunetag").join("config.toml"))
}

/// Resolve the scratch root: CLI/env argument, then config file, then the
/// OS-dependent default.
pub fn resolve_root_dir(cli_arg: Option<&Path>, file: &FileConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }
    if let Some(path) = &file.root_dir {
        return path.clone();
    }
    default_root_dir()
}

/// Resolve the fingerprint tool binary: CLI/env argument, then config file.
///
/// There is no compiled default; the tool is an external collaborator the
/// operator must install.
pub fn resolve_tool_path(cli_arg: Option<&Path>, file: &FileConfig) -> Result<PathBuf> {
    if let Some(path) = cli_arg {
        return Ok(path.to_path_buf());
    }
    if let Some(path) = &file.tool_path {
        return Ok(path.clone());
    }
    Err(Error::Config(
        "fingerprint tool not configured. Set one of:\n\
         1. --tool-path <path>\n\
         2. TUNETAG_TOOL_PATH=<path>\n\
         3. tool_path in ~/.config/tunetag/config.toml"
            .to_string(),
    ))
}

/// OS-dependent default scratch root
fn default_root_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tunetag"))
        .unwrap_or_else(|| PathBuf::from("./tunetag_data"))
}
