//! Session/environment detection: which multiplexer is this process already
//! running inside?
//!
//! tmux is checked first since it is the inner environment when running tmux
//! inside a WezTerm window.

use std::time::Duration;

use tracing::debug;

use crate::env::env_string;
use crate::proc;

const VERIFY_TIMEOUT: Duration = Duration::from_millis(500);

/// Multiplexer family detected from the current environment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalKind {
    Tmux,
    Wezterm,
}

impl TerminalKind {
    pub fn name(&self) -> &'static str {
        match self {
            TerminalKind::Tmux => "tmux",
            TerminalKind::Wezterm => "wezterm",
        }
    }
}

fn inside_tmux() -> bool {
    if env_string("TMUX").is_none() && env_string("TMUX_PANE").is_none() {
        return false;
    }
    if which::which("tmux").is_err() {
        return false;
    }

    // Env vars can leak into nested or detached shells; confirm the pane is
    // actually addressable through the server before trusting them.
    if let Some(pane) = env_string("TMUX_PANE") {
        let argv = proc::argv(["tmux", "display-message", "-p", "-t", &pane, "#{pane_id}"]);
        match proc::run(&argv, None, VERIFY_TIMEOUT, None) {
            Ok(out) if out.success && out.stdout_trimmed().starts_with('%') => return true,
            Ok(_) | Err(_) => {
                debug!(%pane, "TMUX_PANE set but not addressable");
                return false;
            }
        }
    }

    // TMUX set without TMUX_PANE still counts when the server answers at all.
    let argv = proc::argv(["tmux", "display-message", "-p", "#{pane_id}"]);
    matches!(proc::run(&argv, None, VERIFY_TIMEOUT, None), Ok(out) if out.success)
}

fn inside_wezterm() -> bool {
    env_string("WEZTERM_PANE").is_some()
}

/// Detect the multiplexer hosting the current process, if any.
pub fn detect() -> Option<TerminalKind> {
    if inside_tmux() {
        return Some(TerminalKind::Tmux);
    }
    if inside_wezterm() {
        return Some(TerminalKind::Wezterm);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_kind_names() {
        assert_eq!(TerminalKind::Tmux.name(), "tmux");
        assert_eq!(TerminalKind::Wezterm.name(), "wezterm");
    }

    #[test]
    fn test_inside_wezterm_env() {
        std::env::set_var("WEZTERM_PANE", "7");
        assert!(inside_wezterm());
        std::env::set_var("WEZTERM_PANE", "  ");
        assert!(!inside_wezterm());
        std::env::remove_var("WEZTERM_PANE");
        assert!(!inside_wezterm());
    }
}
