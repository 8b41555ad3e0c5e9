//! Multiplexer binary resolution.
//!
//! The WezTerm binary is looked up once per process with a fixed precedence:
//! explicit env override > cached install location > PATH > well-known
//! install paths (Windows program directories reached through WSL mounts).
//! The resolved path is held by the backend value for the life of the
//! process; there is no lazily-populated global.

use std::path::{Path, PathBuf};

use muxgrid_mux_core::MuxError;
use tracing::debug;

use crate::env::env_string;
use crate::winpath::is_wsl;

const ENV_FILE_KEY: &str = "MUXGRID_WEZTERM_BIN=";

/// Candidate `env` files written by the installer, first match wins.
fn install_env_files() -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(xdg) = env_string("XDG_CONFIG_HOME") {
        candidates.push(PathBuf::from(xdg).join("muxgrid").join("env"));
    }
    if cfg!(windows) {
        if let Some(localappdata) = env_string("LOCALAPPDATA") {
            candidates.push(PathBuf::from(localappdata).join("muxgrid").join("env"));
        }
        if let Some(appdata) = env_string("APPDATA") {
            candidates.push(PathBuf::from(appdata).join("muxgrid").join("env"));
        }
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".config").join("muxgrid").join("env"));
    }
    candidates
}

fn cached_install_bin() -> Option<PathBuf> {
    for file in install_env_files() {
        let Ok(content) = std::fs::read_to_string(&file) else {
            continue;
        };
        for line in content.lines() {
            if let Some(path) = line.strip_prefix(ENV_FILE_KEY) {
                let path = path.trim();
                if !path.is_empty() && Path::new(path).exists() {
                    debug!(file = %file.display(), "using cached wezterm location");
                    return Some(PathBuf::from(path));
                }
            }
        }
    }
    None
}

/// Windows install locations reachable from inside WSL.
fn wsl_mount_candidates() -> impl Iterator<Item = PathBuf> {
    ('c'..='z').flat_map(|drive| {
        [
            PathBuf::from(format!("/mnt/{drive}/Program Files/WezTerm/wezterm.exe")),
            PathBuf::from(format!(
                "/mnt/{drive}/Program Files (x86)/WezTerm/wezterm.exe"
            )),
        ]
    })
}

/// Resolve the WezTerm executable. Fatal to any WezTerm operation when it
/// fails; the error is reported once and not retried.
pub fn wezterm_bin() -> Result<PathBuf, MuxError> {
    for var in ["MUXGRID_WEZTERM_BIN", "WEZTERM_BIN"] {
        if let Some(override_path) = env_string(var) {
            let p = PathBuf::from(&override_path);
            if p.exists() {
                return Ok(p);
            }
            debug!(%var, path = %override_path, "override set but missing on disk");
        }
    }

    if let Some(cached) = cached_install_bin() {
        return Ok(cached);
    }

    if let Ok(found) = which::which("wezterm") {
        return Ok(found);
    }
    if let Ok(found) = which::which("wezterm.exe") {
        return Ok(found);
    }

    if is_wsl() {
        if let Some(mounted) = wsl_mount_candidates().find(|p| p.exists()) {
            return Ok(mounted);
        }
    }

    Err(MuxError::BinaryNotFound("wezterm"))
}

/// Whether the resolved binary is hosted on the Windows side of the boundary
/// (an `.exe`, or reached through a `/mnt/<drive>` mount).
pub fn is_windows_hosted(bin: &Path) -> bool {
    let raw = bin.to_string_lossy().to_lowercase();
    raw.ends_with(".exe") || raw.contains("/mnt/")
}

/// Resolve the tmux executable from PATH.
pub fn tmux_bin() -> Result<PathBuf, MuxError> {
    which::which("tmux").map_err(|_| MuxError::BinaryNotFound("tmux"))
}
