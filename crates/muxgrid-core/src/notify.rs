//! Asynchronous completion notification.
//!
//! The one place the system leaves its synchronous model: a task-completion
//! hook runs on a background thread so the initiating call is not blocked on
//! it, but the call still joins that thread with a bounded wait, keeping an
//! upper bound from the caller's perspective. Failures are swallowed; the
//! hook is advisory.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use std::io::Write;

use tracing::debug;

/// Hook executable override; when unset, well-known install locations are
/// probed.
const HOOK_ENV: &str = "MUXGRID_COMPLETION_HOOK";
const ENABLED_ENV: &str = "MUXGRID_COMPLETION_HOOK_ENABLED";

const JOIN_BUDGET: Duration = Duration::from_secs(15);

/// What completed, and for whom.
#[derive(Clone, Debug)]
pub struct CompletionNotice<'a> {
    pub instance: &'a str,
    pub request_id: &'a str,
    pub caller: &'a str,
    pub output_file: Option<&'a Path>,
    /// Reply text; passed on stdin to stay clear of argv length limits.
    pub reply: &'a str,
}

fn hook_enabled() -> bool {
    match std::env::var(ENABLED_ENV) {
        Ok(v) if !v.trim().is_empty() => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        _ => true,
    }
}

fn hook_executable() -> Option<PathBuf> {
    if let Ok(explicit) = std::env::var(HOOK_ENV) {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            let p = PathBuf::from(explicit);
            return p.exists().then_some(p);
        }
    }

    let mut candidates = Vec::new();
    if cfg!(windows) {
        if let Ok(localappdata) = std::env::var("LOCALAPPDATA") {
            candidates.push(
                PathBuf::from(localappdata)
                    .join("muxgrid")
                    .join("bin")
                    .join("muxgrid-completion-hook"),
            );
        }
    }
    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join(".local").join("bin").join("muxgrid-completion-hook"));
    }
    candidates.push(PathBuf::from("/usr/local/bin/muxgrid-completion-hook"));

    candidates.into_iter().find(|p| p.exists())
}

/// Notify the caller that a delegated task completed. Effectively
/// synchronous with an upper bound: the hook runs on its own thread, and
/// this function waits at most [`JOIN_BUDGET`] for it.
pub fn notify_completion(notice: &CompletionNotice) {
    if !hook_enabled() {
        return;
    }
    let Some(hook) = hook_executable() else {
        debug!("no completion hook installed");
        return;
    };

    let instance = notice.instance.to_string();
    let request_id = notice.request_id.to_string();
    let caller = notice.caller.to_string();
    let output_file = notice.output_file.map(Path::to_path_buf);
    let reply = notice.reply.to_string();

    let (done_tx, done_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut cmd = Command::new(&hook);
        cmd.arg("--instance")
            .arg(&instance)
            .arg("--caller")
            .arg(&caller)
            .arg("--req-id")
            .arg(&request_id)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(output) = &output_file {
            cmd.arg("--output").arg(output);
        }

        match cmd.spawn() {
            Ok(mut child) => {
                if let Some(mut stdin) = child.stdin.take() {
                    let _ = stdin.write_all(reply.as_bytes());
                }
                let _ = child.wait();
            }
            Err(err) => debug!(%err, hook = %hook.display(), "completion hook failed to spawn"),
        }
        let _ = done_tx.send(());
    });

    if done_rx.recv_timeout(JOIN_BUDGET).is_err() {
        debug!("completion hook still running past join budget");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_hook_is_noop() {
        std::env::set_var(ENABLED_ENV, "0");
        notify_completion(&CompletionNotice {
            instance: "ui",
            request_id: "req-1",
            caller: "cli",
            output_file: None,
            reply: "done",
        });
        std::env::remove_var(ENABLED_ENV);
    }

    #[test]
    fn test_hook_runs_and_receives_stdin() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran.txt");
        let hook = dir.path().join("hook.sh");
        std::fs::write(&hook, format!("#!/bin/sh\ncat > {}\n", marker.display())).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&hook, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        std::env::set_var(HOOK_ENV, &hook);
        std::env::remove_var(ENABLED_ENV);
        notify_completion(&CompletionNotice {
            instance: "ui",
            request_id: "req-2",
            caller: "cli",
            output_file: None,
            reply: "task finished",
        });
        std::env::remove_var(HOOK_ENV);

        let payload = std::fs::read_to_string(&marker).unwrap();
        assert_eq!(payload, "task finished");
    }
}
