//! WezTerm multiplexer driver
//!
//! Drives `wezterm cli` for pane creation, text/key delivery, and
//! introspection. Pane working directories are translated across the
//! Windows/WSL boundary when the controlling `wezterm.exe` lives on the
//! other side of it.

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use muxgrid_mux_core::{MuxError, Multiplexer, PaneId, PaneOptions, PaneRecord};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::delivery::{self, EnterMethod, Payload};
use crate::env::{env_flag, env_string};
use crate::locate;
use crate::proc;
use crate::winpath;

const PROBE_TIMEOUT: Duration = Duration::from_millis(800);
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
const KEY_TIMEOUT: Duration = Duration::from_secs(2);
const DELIVER_TIMEOUT: Duration = Duration::from_secs(5);
const CREATE_TIMEOUT: Duration = Duration::from_secs(10);

const ENTER_RETRIES: usize = 3;
const ENTER_RETRY_DELAY: Duration = Duration::from_millis(50);

/// WezTerm driver. Holds the resolved binary path and tunables for the life
/// of the process.
pub struct WeztermBackend {
    bin: PathBuf,
    windows_host: bool,
    class: Option<String>,
    prefer_mux: bool,
    no_auto_start: bool,
    enter_method: EnterMethod,
    enter_delay: Duration,
    paste_delay: Duration,
}

/// Row of `wezterm cli list --format json`.
#[derive(Debug, Deserialize)]
struct WezPane {
    pane_id: u64,
    #[serde(default)]
    window_id: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    cwd: Option<String>,
}

impl From<WezPane> for PaneRecord {
    fn from(p: WezPane) -> Self {
        PaneRecord {
            pane_id: p.pane_id.to_string(),
            title: p.title,
            window_id: p.window_id.map(|w| w.to_string()),
            cwd: p.cwd,
        }
    }
}

/// The listing arrives as one JSON object per line; some releases emit a
/// single array instead. Unparsable lines are skipped.
fn parse_pane_listing(raw: &str) -> Vec<PaneRecord> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    if trimmed.starts_with('[') {
        return serde_json::from_str::<Vec<WezPane>>(trimmed)
            .map(|panes| panes.into_iter().map(Into::into).collect())
            .unwrap_or_default();
    }
    trimmed
        .lines()
        .filter_map(|line| serde_json::from_str::<WezPane>(line.trim()).ok())
        .map(Into::into)
        .collect()
}

/// POSIX single-quote wrapping for the WSL startup script; `'` becomes
/// `'\''`.
fn quote_sh(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        if c == '\'' {
            out.push_str("'\\''");
        } else {
            out.push(c);
        }
    }
    out.push('\'');
    out
}

/// Default shell and its command flag for the launching side.
fn default_shell() -> (&'static str, &'static str) {
    if winpath::is_wsl() {
        return ("bash", "-c");
    }
    if cfg!(windows) {
        for shell in ["pwsh", "powershell"] {
            if which::which(shell).is_ok() {
                return match shell {
                    "pwsh" => ("pwsh", "-Command"),
                    _ => ("powershell", "-Command"),
                };
            }
        }
        return ("powershell", "-Command");
    }
    ("bash", "-c")
}

impl WeztermBackend {
    pub fn new() -> Result<Self, MuxError> {
        let bin = locate::wezterm_bin()?;
        let windows_host = locate::is_windows_hosted(&bin);
        Ok(Self {
            windows_host,
            bin,
            class: env_string("MUXGRID_WEZTERM_CLASS").or_else(|| env_string("WEZTERM_CLASS")),
            prefer_mux: env_flag("MUXGRID_WEZTERM_PREFER_MUX"),
            no_auto_start: env_flag("MUXGRID_WEZTERM_NO_AUTO_START"),
            enter_method: EnterMethod::from_env(),
            enter_delay: delivery::enter_delay(),
            paste_delay: delivery::paste_delay(),
        })
    }

    /// `wezterm cli` argv prefix with the session-selection flags applied.
    fn cli_argv<I, S>(&self, rest: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut argv = vec![self.bin.to_string_lossy().into_owned(), "cli".to_string()];
        if let Some(class) = &self.class {
            argv.push("--class".to_string());
            argv.push(class.clone());
        }
        if self.prefer_mux {
            argv.push("--prefer-mux".to_string());
        }
        if self.no_auto_start {
            argv.push("--no-auto-start".to_string());
        }
        argv.extend(rest.into_iter().map(Into::into));
        argv
    }

    /// Safe cwd for the control binary itself when it lives across the WSL
    /// boundary; a foreign-looking process cwd confuses WezTerm's WSL relay.
    fn control_cwd(&self) -> Option<PathBuf> {
        if winpath::is_wsl() && self.windows_host {
            winpath::control_cwd()
        } else {
            None
        }
    }

    /// Try the known `send-key` spellings for `key`; WezTerm releases differ
    /// on both the flag form and the key names they accept.
    fn send_key_cli(&self, pane: &str, key: &str) -> bool {
        let key = key.trim();
        if key.is_empty() {
            return false;
        }

        let variants: Vec<&str> = match key.to_ascii_lowercase().as_str() {
            "enter" => vec!["Enter", "Return"],
            "escape" | "esc" => vec!["Escape", "Esc"],
            _ => vec![key],
        };

        for variant in variants {
            let candidates = [
                self.cli_argv(["send-key", "--pane-id", pane, "--key", variant]),
                self.cli_argv(["send-key", "--pane-id", pane, variant]),
            ];
            for argv in candidates {
                match proc::run(&argv, None, KEY_TIMEOUT, self.control_cwd().as_deref()) {
                    Ok(out) if out.success => return true,
                    Ok(_) => continue,
                    Err(err) => {
                        debug!(%err, "send-key candidate failed");
                        continue;
                    }
                }
            }
        }
        false
    }

    /// Submit the pending input as if Enter was pressed.
    ///
    /// Raw-mode TUIs may ignore a pasted CR and need a real key event, and
    /// some platforms drop the first key event into a freshly created pane,
    /// hence the escalation and bounded retries.
    fn submit_enter(&self, pane: &str) {
        if !self.enter_delay.is_zero() {
            thread::sleep(self.enter_delay);
        }

        let ok = delivery::submit_with_retries(ENTER_RETRIES, ENTER_RETRY_DELAY, || {
            if self.enter_method.wants_key_injection() && self.send_key_cli(pane, "Enter") {
                return true;
            }
            // CR byte through the no-paste path; enough for shells and
            // readline, and the fallback for everything else.
            let argv = self.cli_argv(["send-text", "--pane-id", pane, "--no-paste"]);
            matches!(
                proc::run(&argv, Some(b"\r".as_slice()), DELIVER_TIMEOUT, self.control_cwd().as_deref()),
                Ok(out) if out.success
            )
        });

        if !ok {
            warn!(%pane, "enter submission failed after {ENTER_RETRIES} attempts");
        }
    }

    fn send_no_paste_argv(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        let argv = self.cli_argv(["send-text", "--pane-id", pane, "--no-paste", text]);
        proc::run_checked(&argv, None, DELIVER_TIMEOUT, self.control_cwd().as_deref())?;
        Ok(())
    }

    fn send_no_paste_stdin(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        let argv = self.cli_argv(["send-text", "--pane-id", pane, "--no-paste"]);
        proc::run_checked(
            &argv,
            Some(text.as_bytes()),
            DELIVER_TIMEOUT,
            self.control_cwd().as_deref(),
        )?;
        Ok(())
    }

    fn send_paste(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        let argv = self.cli_argv(["send-text", "--pane-id", pane]);
        proc::run_checked(
            &argv,
            Some(text.as_bytes()),
            DELIVER_TIMEOUT,
            self.control_cwd().as_deref(),
        )?;
        Ok(())
    }

    /// Last `lines` of the pane's rendered text.
    pub fn get_text_tail(&self, pane: &str, lines: usize) -> Option<String> {
        let text = self.get_text(pane)?;
        let all: Vec<&str> = text.lines().collect();
        let start = all.len().saturating_sub(lines);
        Some(all[start..].join("\n"))
    }
}

impl Multiplexer for WeztermBackend {
    fn id(&self) -> &'static str {
        "wezterm"
    }

    fn is_available(&self) -> bool {
        let argv = proc::argv([self.bin.to_string_lossy().into_owned(), "--version".into()]);
        matches!(
            proc::run(&argv, None, PROBE_TIMEOUT, self.control_cwd().as_deref()),
            Ok(out) if out.success
        )
    }

    fn create_pane(&self, opts: &PaneOptions) -> Result<PaneId, MuxError> {
        let percent = opts.percent.clamp(1, 99);
        let cwd_raw = opts.cwd.to_string_lossy().into_owned();

        let mut force_wsl = env_string("MUXGRID_BACKEND_ENV")
            .map(|v| v.eq_ignore_ascii_case("wsl"))
            .unwrap_or(false);
        let unc_cwd = winpath::extract_wsl_path(&cwd_raw);
        // A caller sitting in a UNC-style WSL path (e.g. Git Bash) wants the
        // pane to land in the real WSL directory even without the flag.
        if cfg!(windows) && unc_cwd.is_some() {
            force_wsl = true;
        }
        let use_wsl_launch =
            (winpath::is_wsl() && self.windows_host) || (force_wsl && cfg!(windows));

        let mut argv = self.cli_argv(["split-pane"]);
        if use_wsl_launch {
            let wsl_cwd = unc_cwd.unwrap_or_else(|| winpath::pane_cwd_for_wsl(opts.cwd));
            argv.push(opts.direction.as_flag().to_string());
            argv.push("--percent".to_string());
            argv.push(percent.to_string());
            if let Some(parent) = opts.parent {
                argv.push("--pane-id".to_string());
                argv.push(parent.to_string());
            }
            // No `exec` here: the command may be a compound shell snippet.
            let command = if opts.command.is_empty() { "bash" } else { opts.command };
            let startup = format!("cd {} && {}", quote_sh(&wsl_cwd), command);
            argv.push("--".to_string());
            let in_wsl_pane =
                env_string("WSL_DISTRO_NAME").is_some() || env_string("WSL_INTEROP").is_some();
            if !in_wsl_pane {
                argv.push("wsl.exe".to_string());
            }
            argv.extend(
                ["bash", "-l", "-i", "-c"]
                    .into_iter()
                    .map(str::to_string),
            );
            argv.push(startup);
        } else {
            argv.push("--cwd".to_string());
            argv.push(cwd_raw);
            argv.push(opts.direction.as_flag().to_string());
            argv.push("--percent".to_string());
            argv.push(percent.to_string());
            if let Some(parent) = opts.parent {
                argv.push("--pane-id".to_string());
                argv.push(parent.to_string());
            }
            if !opts.command.is_empty() {
                let (shell, flag) = default_shell();
                argv.push("--".to_string());
                argv.push(shell.to_string());
                argv.push(flag.to_string());
                argv.push(opts.command.to_string());
            }
        }

        let out = proc::run_checked(&argv, None, CREATE_TIMEOUT, self.control_cwd().as_deref())?;
        let pane_id = out.stdout_trimmed();
        if pane_id.is_empty() {
            return Err(MuxError::command_failed(&argv, "empty pane id on stdout"));
        }
        Ok(pane_id)
    }

    fn spawn_tab(&self, cwd: &Path) -> Result<PaneId, MuxError> {
        let argv = self.cli_argv([
            "spawn".to_string(),
            "--cwd".to_string(),
            cwd.to_string_lossy().into_owned(),
        ]);
        let out = proc::run_checked(&argv, None, CREATE_TIMEOUT, self.control_cwd().as_deref())?;
        let pane_id = out.stdout_trimmed();
        if pane_id.is_empty() {
            return Err(MuxError::command_failed(&argv, "empty pane id on stdout"));
        }
        Ok(pane_id)
    }

    fn send_text(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        match delivery::classify(text) {
            Payload::Skip => Ok(()),
            Payload::Argv(line) => {
                self.send_no_paste_argv(pane, &line)?;
                self.submit_enter(pane);
                Ok(())
            }
            Payload::Stdin(line) => {
                self.send_no_paste_stdin(pane, &line)?;
                self.submit_enter(pane);
                Ok(())
            }
            Payload::Paste(block) => {
                self.send_paste(pane, &block)?;
                if !self.paste_delay.is_zero() {
                    thread::sleep(self.paste_delay);
                }
                self.submit_enter(pane);
                Ok(())
            }
        }
    }

    fn send_key(&self, pane: &str, key: &str) -> bool {
        if self.send_key_cli(pane, key) {
            return true;
        }
        // Fallback: the raw key bytes through the no-paste path.
        let argv = self.cli_argv(["send-text", "--pane-id", pane, "--no-paste"]);
        matches!(
            proc::run(&argv, Some(key.as_bytes()), KEY_TIMEOUT, self.control_cwd().as_deref()),
            Ok(out) if out.success
        )
    }

    fn is_alive(&self, pane: &str) -> bool {
        let panes = match self.list_panes() {
            Ok(panes) => panes,
            Err(_) => return false,
        };
        if panes.is_empty() {
            return false;
        }
        if panes.iter().any(|p| p.pane_id == pane) {
            return true;
        }
        // Repaired mappings may carry a title marker instead of a pane id.
        panes.iter().any(|p| p.title.starts_with(pane))
    }

    fn kill_pane(&self, pane: &str) {
        let argv = self.cli_argv(["kill-pane", "--pane-id", pane]);
        match proc::run(&argv, None, QUERY_TIMEOUT, self.control_cwd().as_deref()) {
            Ok(out) if !out.success => {
                debug!(%pane, stderr = %out.stderr.trim(), "kill-pane failed")
            }
            Err(err) => debug!(%pane, %err, "kill-pane failed"),
            _ => {}
        }
    }

    fn activate(&self, pane: &str) {
        let argv = self.cli_argv(["activate-pane", "--pane-id", pane]);
        match proc::run(&argv, None, QUERY_TIMEOUT, self.control_cwd().as_deref()) {
            Ok(out) if !out.success => {
                debug!(%pane, stderr = %out.stderr.trim(), "activate-pane failed")
            }
            Err(err) => debug!(%pane, %err, "activate-pane failed"),
            _ => {}
        }
    }

    fn get_text(&self, pane: &str) -> Option<String> {
        let argv = self.cli_argv(["get-text", "--pane-id", pane]);
        match proc::run(&argv, None, QUERY_TIMEOUT, self.control_cwd().as_deref()) {
            Ok(out) if out.success => Some(out.stdout),
            _ => None,
        }
    }

    fn set_title(&self, pane: &str, title: &str) -> Result<(), MuxError> {
        let argv = self.cli_argv(["set-tab-title", "--pane-id", pane, title]);
        proc::run_checked(&argv, None, QUERY_TIMEOUT, self.control_cwd().as_deref())?;
        Ok(())
    }

    fn list_panes(&self) -> Result<Vec<PaneRecord>, MuxError> {
        let argv = self.cli_argv(["list", "--format", "json"]);
        let out = proc::run_checked(&argv, None, QUERY_TIMEOUT, self.control_cwd().as_deref())?;
        Ok(parse_pane_listing(&out.stdout))
    }

    fn current_pane(&self) -> Option<PaneId> {
        if let Some(pane) = env_string("WEZTERM_PANE") {
            return Some(pane);
        }
        self.list_panes().ok()?.first().map(|p| p.pane_id.clone())
    }
}
