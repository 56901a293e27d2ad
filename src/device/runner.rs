use std::io::Read;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::device::error::ProbeError;

pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Run `program args...` to completion, killing it after `timeout`.
pub fn run_command(
    program: &str,
    args: &[String],
    timeout: Duration,
) -> Result<CommandOutput, ProbeError> {
    let command_line = format!("{} {}", program, args.join(" "));
    debug!(command = %command_line, "running command");

    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ProbeError::Spawn {
            program: program.to_string(),
            source,
        })?;

    // Both pipes are drained on their own threads; a chatty child would
    // otherwise block on a full pipe and look like a timeout.
    let stdout = child.stdout.take().ok_or_else(|| ProbeError::Io {
        context: "capturing stdout".into(),
        source: std::io::Error::other("stdout not piped"),
    })?;
    let stderr = child.stderr.take().ok_or_else(|| ProbeError::Io {
        context: "capturing stderr".into(),
        source: std::io::Error::other("stderr not piped"),
    })?;

    let stdout_handle = std::thread::spawn(move || drain(stdout));
    let stderr_handle = std::thread::spawn(move || drain(stderr));

    let start = Instant::now();
    let exit_code = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status.code(),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    let _ = stdout_handle.join();
                    let _ = stderr_handle.join();
                    return Err(ProbeError::CommandTimeout {
                        command: command_line,
                        timeout_ms: timeout.as_millis(),
                    });
                }
                std::thread::sleep(Duration::from_millis(25));
            }
            Err(source) => {
                let _ = stdout_handle.join();
                let _ = stderr_handle.join();
                return Err(ProbeError::Io {
                    context: format!("polling `{}`", command_line),
                    source,
                });
            }
        }
    };

    let stdout_bytes = stdout_handle.join().unwrap_or_default();
    let stderr_bytes = stderr_handle.join().unwrap_or_default();

    let output = CommandOutput {
        stdout: String::from_utf8_lossy(&stdout_bytes).to_string(),
        stderr: String::from_utf8_lossy(&stderr_bytes).to_string(),
        exit_code,
    };
    debug!(
        command = %command_line,
        exit_code = ?output.exit_code,
        stdout_len = output.stdout.len(),
        "command finished"
    );
    Ok(output)
}

fn drain(mut reader: impl Read) -> Vec<u8> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(count) => buffer.extend_from_slice(&chunk[..count]),
            Err(_) => break,
        }
    }
    buffer
}
