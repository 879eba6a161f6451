//! `run_command`: shell command execution with a wall-clock ceiling.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use super::CapabilityError;

use crate::constants::{COMMAND_MAX_OUTPUT_SIZE, COMMAND_STRIPPED_ENV_VARS};

/// Truncate `output` to at most `COMMAND_MAX_OUTPUT_SIZE` bytes, appending a
/// notice when truncation occurs.
fn cap_output(output: &str) -> String {
    if output.len() <= COMMAND_MAX_OUTPUT_SIZE {
        return output.to_string();
    }
    let mut end = COMMAND_MAX_OUTPUT_SIZE;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n... output truncated at {} bytes",
        &output[..end],
        COMMAND_MAX_OUTPUT_SIZE
    )
}

fn format_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);

    let mut text = format!("STDOUT:\n{}", stdout.trim_end());
    if !stderr.trim().is_empty() {
        text.push_str("\nSTDERR:\n");
        text.push_str(stderr.trim_end());
    }
    cap_output(&text)
}

/// Runs `command` through `sh -c` in `cwd`.
///
/// The shell runs in its own process group; if it outlives `timeout` the whole
/// group is killed, so background workers it started do not survive. A non-zero exit is reported
/// as [`CapabilityError::CommandFailed`] with the captured output attached.
pub async fn execute(cwd: &Path, command: &str, timeout: Duration) -> Result<String, CapabilityError> {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd.current_dir(cwd);
    cmd.kill_on_drop(true);
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    for var in COMMAND_STRIPPED_ENV_VARS {
        cmd.env_remove(var);
    }

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(CapabilityError::Spawn)?;
    let pid = child.id();

    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(CapabilityError::Spawn(e)),
        Err(_) => {
            if let Some(pid) = pid {
                kill_process_group(pid);
            }
            return Err(CapabilityError::Timeout(timeout.as_secs()));
        }
    };

    let text = format_output(&output.stdout, &output.stderr);
    match output.status.code() {
        Some(0) => Ok(text),
        code => Err(CapabilityError::CommandFailed {
            code: code.unwrap_or(-1),
            output: text,
        }),
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal. The group id is the shell's pid,
    // which leads the group created for it by `process_group(0)`.
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(pid, error = %std::io::Error::last_os_error(), "failed to kill command process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}
