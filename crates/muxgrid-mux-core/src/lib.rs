//! Low-level, backend-agnostic multiplexer trait and shared types
//!
//! This crate defines the common interface that every terminal multiplexer
//! driver must provide, without any orchestration logic. Pane handles are
//! opaque strings assigned by the multiplexer itself; this layer only stores
//! and forwards them.

use std::path::Path;

/// Opaque pane identifier assigned by the multiplexer at creation time.
pub type PaneId = String;

/// Axis along which an existing pane is split in two.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitDirection {
    Right,
    Bottom,
}

impl SplitDirection {
    /// Flag spelling used by the WezTerm CLI (`--right` / `--bottom`).
    pub fn as_flag(&self) -> &'static str {
        match self {
            SplitDirection::Right => "--right",
            SplitDirection::Bottom => "--bottom",
        }
    }
}

/// Parameters for creating one pane by splitting an existing one.
#[derive(Clone, Debug)]
pub struct PaneOptions<'a> {
    /// Command to run in the new pane; empty means the default shell.
    pub command: &'a str,
    /// Working directory for the new pane, in the caller's notation.
    pub cwd: &'a Path,
    pub direction: SplitDirection,
    /// Size of the new pane, clamped by drivers to [1, 99].
    pub percent: u8,
    /// Pane to split; the multiplexer's current pane when absent.
    pub parent: Option<&'a str>,
}

/// One row of the multiplexer's pane listing.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct PaneRecord {
    pub pane_id: PaneId,
    pub title: String,
    pub window_id: Option<String>,
    pub cwd: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum MuxError {
    #[error("multiplexer binary not found: {0}")]
    BinaryNotFound(&'static str),
    #[error("command failed: {argv:?}: {stderr}")]
    CommandFailed { argv: Vec<String>, stderr: String },
    #[error("command timed out after {elapsed_ms}ms: {argv:?}")]
    Timeout { argv: Vec<String>, elapsed_ms: u64 },
    #[error("no mapping available; run layout construction first")]
    MappingUnavailable,
    #[error("invalid layout input: {0}")]
    LayoutInputInvalid(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

impl MuxError {
    /// Build a `CommandFailed` from an argv slice and captured stderr.
    pub fn command_failed(argv: &[String], stderr: &str) -> Self {
        MuxError::CommandFailed {
            argv: argv.to_vec(),
            stderr: stderr.trim().to_string(),
        }
    }
}

/// Core capability trait implemented by each multiplexer driver.
///
/// All operations are synchronous; every underlying CLI invocation carries an
/// explicit timeout, so none of these calls can hang indefinitely.
pub trait Multiplexer {
    /// Driver identifier ("wezterm", "tmux").
    fn id(&self) -> &'static str;

    /// Whether the multiplexer's control channel is usable on this system.
    fn is_available(&self) -> bool;

    /// Split an existing pane and return the new pane's id.
    fn create_pane(&self, opts: &PaneOptions) -> Result<PaneId, MuxError>;

    /// Open a new top-level tab and return its pane id.
    fn spawn_tab(&self, cwd: &Path) -> Result<PaneId, MuxError>;

    /// Deliver `text` to the pane as if typed, followed by a submit action.
    /// Empty or whitespace-only payloads are a no-op.
    fn send_text(&self, pane: &str, text: &str) -> Result<(), MuxError>;

    /// Inject a named key event. Best effort: returns false rather than
    /// failing hard, since key-injection support varies by multiplexer and
    /// by the target application's terminal mode.
    fn send_key(&self, pane: &str, key: &str) -> bool;

    /// Whether the pane still exists. Never errors; an unreachable control
    /// channel reads as false.
    fn is_alive(&self, pane: &str) -> bool;

    /// Fire-and-forget: the pane may already have exited.
    fn kill_pane(&self, pane: &str);

    /// Fire-and-forget focus change.
    fn activate(&self, pane: &str);

    /// Rendered text content of the pane, if the driver supports capture.
    fn get_text(&self, pane: &str) -> Option<String>;

    /// Set the pane/tab title (also used for marker-based recovery lookups).
    fn set_title(&self, pane: &str, title: &str) -> Result<(), MuxError>;

    /// Current pane listing across the multiplexer session.
    fn list_panes(&self) -> Result<Vec<PaneRecord>, MuxError>;

    /// Secondary lookup for when a pane id was lost: first pane whose title
    /// starts with `prefix`.
    fn find_pane_by_title(&self, prefix: &str) -> Option<PaneId> {
        if prefix.is_empty() {
            return None;
        }
        self.list_panes()
            .ok()?
            .into_iter()
            .find(|p| p.title.starts_with(prefix))
            .map(|p| p.pane_id)
    }

    /// Pane hosting the calling process, when it can be determined.
    fn current_pane(&self) -> Option<PaneId>;

    /// Create a detached container session rooted at `cwd` and return its
    /// first pane. Only meaningful for multiplexers with detached sessions.
    fn create_container(&self, name: &str, cwd: &Path) -> Result<PaneId, MuxError> {
        let _ = (name, cwd);
        Err(MuxError::Other(format!(
            "{} cannot create a detached container session",
            self.id()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_direction_flags() {
        assert_eq!(SplitDirection::Right.as_flag(), "--right");
        assert_eq!(SplitDirection::Bottom.as_flag(), "--bottom");
    }

    #[test]
    fn test_mux_error_display() {
        let err = MuxError::BinaryNotFound("wezterm");
        assert_eq!(err.to_string(), "multiplexer binary not found: wezterm");

        let err = MuxError::MappingUnavailable;
        assert_eq!(
            err.to_string(),
            "no mapping available; run layout construction first"
        );

        let err = MuxError::command_failed(
            &["tmux".to_string(), "kill-pane".to_string()],
            "no such pane\n",
        );
        let msg = err.to_string();
        assert!(msg.contains("kill-pane"));
        assert!(msg.contains("no such pane"));
    }

    #[test]
    fn test_command_failed_trims_stderr() {
        let err = MuxError::command_failed(&["x".to_string()], "  boom \n");
        match err {
            MuxError::CommandFailed { stderr, .. } => assert_eq!(stderr, "boom"),
            _ => panic!("wrong variant"),
        }
    }
}
