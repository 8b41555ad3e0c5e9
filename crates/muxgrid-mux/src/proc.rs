//! Timeout-bounded synchronous subprocess execution.
//!
//! Every multiplexer CLI invocation in this crate goes through [`run`] so no
//! control call can hang past its budget. Output pipes are drained on helper
//! threads while the parent polls for exit; on expiry the child is killed and
//! the call reports [`MuxError::Timeout`].

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use muxgrid_mux_core::MuxError;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Captured result of a finished subprocess.
#[derive(Debug)]
pub struct CmdOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    /// Stdout with surrounding whitespace removed.
    pub fn stdout_trimmed(&self) -> String {
        self.stdout.trim().to_string()
    }
}

fn drain(mut source: impl Read + Send + 'static) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = source.read_to_end(&mut buf);
        buf
    })
}

/// Run `argv` (program plus arguments), optionally feeding `input` on stdin,
/// and wait at most `timeout` for it to exit.
///
/// A non-zero exit status is not an error at this layer; callers that need
/// hard failures use [`run_checked`].
pub fn run(
    argv: &[String],
    input: Option<&[u8]>,
    timeout: Duration,
    cwd: Option<&Path>,
) -> Result<CmdOutput, MuxError> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| MuxError::Other("empty argv".to_string()))?;

    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    let mut child = cmd.spawn()?;

    if let Some(payload) = input {
        // Dropping the handle closes the pipe so the child sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            let _ = stdin.write_all(payload);
        }
    }

    let stdout = child
        .stdout
        .take()
        .map(drain)
        .ok_or_else(|| MuxError::Other("child stdout not captured".to_string()))?;
    let stderr = child
        .stderr
        .take()
        .map(drain)
        .ok_or_else(|| MuxError::Other("child stderr not captured".to_string()))?;

    let started = Instant::now();
    let status = loop {
        match child.try_wait()? {
            Some(status) => break status,
            None => {
                if started.elapsed() >= timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(MuxError::Timeout {
                        argv: argv.to_vec(),
                        elapsed_ms: started.elapsed().as_millis() as u64,
                    });
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
    };

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    Ok(CmdOutput {
        success: status.success(),
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

/// Like [`run`], but a non-zero exit becomes [`MuxError::CommandFailed`]
/// carrying the argv and captured stderr.
pub fn run_checked(
    argv: &[String],
    input: Option<&[u8]>,
    timeout: Duration,
    cwd: Option<&Path>,
) -> Result<CmdOutput, MuxError> {
    let output = run(argv, input, timeout, cwd)?;
    if output.success {
        Ok(output)
    } else {
        Err(MuxError::command_failed(argv, &output.stderr))
    }
}

/// Convenience for building an argv from mixed string types.
pub fn argv<I, S>(parts: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    parts.into_iter().map(Into::into).collect()
}
