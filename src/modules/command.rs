//! Bounded external command execution
//!
//! Every program this tool starts gets a timeout. When it elapses the child
//! is killed and the step sees a [`ConfigureError::Timeout`], which is
//! handled exactly like a non-zero exit.

use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::ConfigureError;

/// Run `command` to completion, failing on non-zero exit or timeout
pub async fn run_with_timeout(
    mut command: Command,
    description: &str,
    timeout: Duration,
) -> Result<Output, ConfigureError> {
    debug!("Running {} (timeout {}s)", description, timeout.as_secs());

    let child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ConfigureError::command(description, -1, format!("failed to start: {}", e)))?;

    // Dropping the wait future on timeout drops the child, which kills it
    let output = match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            warn!("{} timed out after {}s, killed", description, timeout.as_secs());
            return Err(ConfigureError::Timeout {
                command: description.to_string(),
                seconds: timeout.as_secs(),
            });
        }
    };

    if !output.stdout.is_empty() {
        debug!(
            "{} stdout: {}",
            description,
            String::from_utf8_lossy(&output.stdout)
        );
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ConfigureError::command(
            description,
            output.status.code().unwrap_or(-1),
            stderr.trim(),
        ));
    }

    Ok(output)
}
