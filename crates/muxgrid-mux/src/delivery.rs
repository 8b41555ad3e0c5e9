//! Text/key delivery protocol pieces shared by the drivers.
//!
//! Terminal multiplexers distinguish bracketed-paste input from typed input,
//! and raw-mode TUIs may ignore a pasted carriage return entirely. The
//! classification here decides how a payload travels (argv vs stdin, paste vs
//! no-paste), and [`submit_with_retries`] drives the escalating Enter
//! submission so the strategy is testable without a live multiplexer.

use std::thread;
use std::time::Duration;

use crate::env::{env_duration_ms, env_string};

/// Payloads up to this many bytes ride on the command line; longer ones go
/// through stdin to stay clear of platform argv-length and escaping limits.
pub const ARGV_LIMIT: usize = 200;

/// How a sanitized payload should be delivered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    /// Empty or whitespace-only input: deliver nothing, invoke nothing.
    Skip,
    /// Short single line, passed as a command-line argument in no-paste mode
    /// so the receiving application sees keystrokes rather than a paste block.
    Argv(String),
    /// Long single line, same no-paste mode but fed through stdin.
    Stdin(String),
    /// Multi-line text: bracketed paste, followed by a settle delay before
    /// the submit action.
    Paste(String),
}

/// Classify `text` per the delivery protocol. Carriage returns are stripped
/// so CRLF input cannot smuggle a premature submit.
pub fn classify(text: &str) -> Payload {
    let sanitized = text.replace('\r', "");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return Payload::Skip;
    }
    if !sanitized.contains('\n') {
        if sanitized.len() <= ARGV_LIMIT {
            return Payload::Argv(sanitized.to_string());
        }
        return Payload::Stdin(sanitized.to_string());
    }
    Payload::Paste(sanitized.to_string())
}

/// Strategy for the submit ("Enter") action after a payload lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnterMethod {
    /// Key injection on native Windows, CR byte elsewhere.
    Auto,
    /// Always inject a native key event first.
    Key,
    /// Always send a literal carriage-return byte.
    Text,
}

impl EnterMethod {
    /// Resolve from `MUXGRID_WEZTERM_ENTER_METHOD`, defaulting to `Auto` on
    /// native Windows and `Text` elsewhere (some Windows setups silently drop
    /// the first pasted CR into a freshly created pane).
    pub fn from_env() -> Self {
        let default = if cfg!(windows) {
            EnterMethod::Auto
        } else {
            EnterMethod::Text
        };
        match env_string("MUXGRID_WEZTERM_ENTER_METHOD")
            .map(|v| v.to_ascii_lowercase())
            .as_deref()
        {
            Some("auto") => EnterMethod::Auto,
            Some("key") => EnterMethod::Key,
            Some("text") => EnterMethod::Text,
            _ => default,
        }
    }

    /// Whether a native key event should be attempted before the CR byte.
    pub fn wants_key_injection(&self) -> bool {
        match self {
            EnterMethod::Key => true,
            EnterMethod::Auto => cfg!(windows),
            EnterMethod::Text => false,
        }
    }
}

/// Delay before the submit action, giving the pane time to register input.
pub fn enter_delay() -> Duration {
    let default_ms = if cfg!(windows) { 50 } else { 10 };
    env_duration_ms("MUXGRID_WEZTERM_ENTER_DELAY", default_ms)
}

/// Delay after a bracketed paste before submitting, so the receiving TUI can
/// finish draining its paste event queue.
pub fn paste_delay() -> Duration {
    env_duration_ms("MUXGRID_WEZTERM_PASTE_DELAY", 100)
}

/// Run `attempt` up to `max_attempts` times with `retry_delay` between
/// failures, stopping at the first success. Returns whether any attempt
/// succeeded.
pub fn submit_with_retries(
    max_attempts: usize,
    retry_delay: Duration,
    mut attempt: impl FnMut() -> bool,
) -> bool {
    for round in 0..max_attempts {
        if attempt() {
            return true;
        }
        if round + 1 < max_attempts && !retry_delay.is_zero() {
            thread::sleep(retry_delay);
        }
    }
    false
}
