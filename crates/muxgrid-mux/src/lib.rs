//! Terminal multiplexer drivers
//!
//! Concrete implementations of the [`Multiplexer`] trait for WezTerm and
//! tmux, plus the support layers they share: binary location, environment
//! detection, cross-boundary path translation, the timeout-bounded process
//! runner, and the text/key delivery protocol.

pub mod delivery;
pub mod detect;
pub mod env;
pub mod locate;
pub mod proc;
#[cfg(feature = "tmux")]
pub mod tmux;
#[cfg(feature = "wezterm")]
pub mod wezterm;
pub mod winpath;

use muxgrid_mux_core::{MuxError, Multiplexer};

/// Resolve the backend for the multiplexer the current process runs inside.
///
/// The returned driver is constructed once and meant to be threaded through
/// the rest of the program; selection is not repeated per call.
pub fn default_backend() -> Result<Box<dyn Multiplexer + Send + Sync>, MuxError> {
    match detect::detect() {
        #[cfg(feature = "tmux")]
        Some(detect::TerminalKind::Tmux) => Ok(Box::new(tmux::TmuxBackend::new()?)),
        #[cfg(feature = "wezterm")]
        Some(detect::TerminalKind::Wezterm) => Ok(Box::new(wezterm::WeztermBackend::new()?)),
        #[allow(unreachable_patterns)]
        Some(kind) => Err(MuxError::Other(format!(
            "detected {} but its driver is not compiled in",
            kind.name()
        ))),
        None => Err(MuxError::Other(
            "no multiplexer session detected; run inside WezTerm or tmux, or pass --backend"
                .to_string(),
        )),
    }
}

/// Resolve a backend by explicit name.
pub fn backend_by_name(name: &str) -> Result<Box<dyn Multiplexer + Send + Sync>, MuxError> {
    match name {
        #[cfg(feature = "wezterm")]
        "wezterm" => Ok(Box::new(wezterm::WeztermBackend::new()?)),
        #[cfg(feature = "tmux")]
        "tmux" => Ok(Box::new(tmux::TmuxBackend::new()?)),
        _ => Err(MuxError::Other(format!("unsupported multiplexer: {name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_by_name_rejects_unknown() {
        let err = match backend_by_name("screen") {
            Ok(_) => panic!("expected error for unknown backend"),
            Err(e) => e,
        };
        assert!(err.to_string().contains("unsupported multiplexer"));
    }
}
