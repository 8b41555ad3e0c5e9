//! tmux multiplexer driver
//!
//! Implements the Multiplexer trait over the tmux command-line interface.
//! Panes are addressed by their server-unique `%N` ids; detached container
//! sessions back layouts that are built from outside any terminal.

use std::path::Path;
use std::thread;
use std::time::Duration;

use muxgrid_mux_core::{MuxError, Multiplexer, PaneId, PaneOptions, PaneRecord, SplitDirection};
use tracing::{debug, warn};

use crate::delivery::{self, Payload};
use crate::env::env_string;
use crate::locate;
use crate::proc;

const PROBE_TIMEOUT: Duration = Duration::from_millis(800);
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
const DELIVER_TIMEOUT: Duration = Duration::from_secs(5);
const CREATE_TIMEOUT: Duration = Duration::from_secs(10);

const ENTER_RETRIES: usize = 3;
const ENTER_RETRY_DELAY: Duration = Duration::from_millis(50);

/// tmux driver. Holds the resolved binary path for the life of the process.
pub struct TmuxBackend {
    bin: String,
    paste_delay: Duration,
}

impl TmuxBackend {
    pub fn new() -> Result<Self, MuxError> {
        let bin = locate::tmux_bin()?;
        Ok(Self {
            bin: bin.to_string_lossy().into_owned(),
            paste_delay: delivery::paste_delay(),
        })
    }

    /// Run a tmux command and return its trimmed stdout.
    fn run_tmux(&self, args: &[&str], timeout: Duration) -> Result<String, MuxError> {
        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push(self.bin.clone());
        argv.extend(args.iter().map(|s| s.to_string()));
        let out = proc::run_checked(&argv, None, timeout, None)?;
        Ok(out.stdout_trimmed())
    }

    /// Fire-and-forget variant: failures are logged, not propagated.
    fn run_tmux_logged(&self, args: &[&str]) {
        if let Err(err) = self.run_tmux(args, QUERY_TIMEOUT) {
            debug!(%err, "tmux command failed");
        }
    }

    fn has_session(&self, name: &str) -> bool {
        self.run_tmux(&["has-session", "-t", name], QUERY_TIMEOUT).is_ok()
    }

    fn first_pane_of(&self, target: &str) -> Result<PaneId, MuxError> {
        let out = self.run_tmux(
            &["list-panes", "-t", target, "-F", "#{pane_id}"],
            QUERY_TIMEOUT,
        )?;
        out.lines()
            .next()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .ok_or_else(|| MuxError::Other(format!("no panes in tmux target {target}")))
    }

    /// Multi-line delivery: load the text into a buffer and paste it in
    /// bracketed mode, which receiving applications treat as one atomic
    /// insertion.
    fn paste_block(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        let argv = proc::argv([self.bin.as_str(), "load-buffer", "-"]);
        proc::run_checked(&argv, Some(text.as_bytes()), DELIVER_TIMEOUT, None)?;
        self.run_tmux(&["paste-buffer", "-p", "-d", "-t", pane], DELIVER_TIMEOUT)?;
        Ok(())
    }

    fn submit_enter(&self, pane: &str) {
        let ok = delivery::submit_with_retries(ENTER_RETRIES, ENTER_RETRY_DELAY, || {
            self.run_tmux(&["send-keys", "-t", pane, "Enter"], DELIVER_TIMEOUT)
                .is_ok()
        });
        if !ok {
            warn!(%pane, "enter submission failed after {ENTER_RETRIES} attempts");
        }
    }
}

impl Multiplexer for TmuxBackend {
    fn id(&self) -> &'static str {
        "tmux"
    }

    fn is_available(&self) -> bool {
        let argv = proc::argv([self.bin.as_str(), "-V"]);
        matches!(proc::run(&argv, None, PROBE_TIMEOUT, None), Ok(out) if out.success)
    }

    fn create_pane(&self, opts: &PaneOptions) -> Result<PaneId, MuxError> {
        let percent = opts.percent.clamp(1, 99).to_string();
        let cwd = opts.cwd.to_string_lossy();

        let mut args = vec!["split-window", "-P", "-F", "#{pane_id}"];
        match opts.direction {
            SplitDirection::Right => args.push("-h"),
            SplitDirection::Bottom => args.push("-v"),
        }
        args.extend(["-p", percent.as_str(), "-c", cwd.as_ref()]);
        if let Some(parent) = opts.parent {
            args.extend(["-t", parent]);
        }
        if !opts.command.is_empty() {
            args.push(opts.command);
        }

        let pane_id = self.run_tmux(&args, CREATE_TIMEOUT)?;
        if pane_id.is_empty() {
            return Err(MuxError::Other("tmux split-window returned no pane id".to_string()));
        }
        Ok(pane_id)
    }

    fn spawn_tab(&self, cwd: &Path) -> Result<PaneId, MuxError> {
        let cwd = cwd.to_string_lossy();
        let pane_id = self.run_tmux(
            &["new-window", "-P", "-F", "#{pane_id}", "-c", cwd.as_ref()],
            CREATE_TIMEOUT,
        )?;
        if pane_id.is_empty() {
            return Err(MuxError::Other("tmux new-window returned no pane id".to_string()));
        }
        Ok(pane_id)
    }

    fn send_text(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        match delivery::classify(text) {
            Payload::Skip => Ok(()),
            // tmux takes arbitrarily long literals on the command line, so
            // the short/long single-line split collapses into one path.
            Payload::Argv(line) | Payload::Stdin(line) => {
                self.run_tmux(&["send-keys", "-t", pane, "-l", line.as_str()], DELIVER_TIMEOUT)?;
                self.submit_enter(pane);
                Ok(())
            }
            Payload::Paste(block) => {
                self.paste_block(pane, &block)?;
                if !self.paste_delay.is_zero() {
                    thread::sleep(self.paste_delay);
                }
                self.submit_enter(pane);
                Ok(())
            }
        }
    }

    fn send_key(&self, pane: &str, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }
        // tmux's send-keys vocabulary is stable; the name passes through.
        self.run_tmux(&["send-keys", "-t", pane, key], QUERY_TIMEOUT).is_ok()
    }

    fn is_alive(&self, pane: &str) -> bool {
        if pane.starts_with('%') {
            return self
                .list_panes()
                .map(|panes| panes.iter().any(|p| p.pane_id == pane))
                .unwrap_or(false);
        }
        // Container handles are session names, not pane ids.
        self.has_session(pane)
    }

    fn kill_pane(&self, pane: &str) {
        self.run_tmux_logged(&["kill-pane", "-t", pane]);
    }

    fn activate(&self, pane: &str) {
        self.run_tmux_logged(&["select-pane", "-t", pane]);
    }

    fn get_text(&self, pane: &str) -> Option<String> {
        let argv = proc::argv([self.bin.as_str(), "capture-pane", "-p", "-t", pane]);
        match proc::run(&argv, None, QUERY_TIMEOUT, None) {
            Ok(out) if out.success => Some(out.stdout),
            _ => None,
        }
    }

    fn set_title(&self, pane: &str, title: &str) -> Result<(), MuxError> {
        self.run_tmux(&["select-pane", "-t", pane, "-T", title], QUERY_TIMEOUT)?;
        Ok(())
    }

    fn list_panes(&self) -> Result<Vec<PaneRecord>, MuxError> {
        let out = self.run_tmux(
            &["list-panes", "-a", "-F", "#{pane_id}\t#{pane_title}"],
            QUERY_TIMEOUT,
        )?;
        Ok(out
            .lines()
            .filter_map(|line| {
                let (id, title) = line.split_once('\t')?;
                let id = id.trim();
                if id.is_empty() {
                    return None;
                }
                Some(PaneRecord {
                    pane_id: id.to_string(),
                    title: title.trim().to_string(),
                    window_id: None,
                    cwd: None,
                })
            })
            .collect())
    }

    fn current_pane(&self) -> Option<PaneId> {
        if let Some(pane) = env_string("TMUX_PANE") {
            return Some(pane);
        }
        if env_string("TMUX").is_none() {
            return None;
        }
        self.run_tmux(&["display-message", "-p", "#{pane_id}"], QUERY_TIMEOUT)
            .ok()
            .filter(|p| p.starts_with('%'))
    }

    fn create_container(&self, name: &str, cwd: &Path) -> Result<PaneId, MuxError> {
        let cwd = cwd.to_string_lossy();
        if !self.has_session(name) {
            self.run_tmux(
                &["new-session", "-d", "-s", name, "-c", cwd.as_ref()],
                CREATE_TIMEOUT,
            )?;
        }
        let root = self.first_pane_of(name)?;
        if !root.starts_with('%') {
            return Err(MuxError::Other(format!(
                "failed to allocate container root pane for session {name}"
            )));
        }
        Ok(root)
    }
}
