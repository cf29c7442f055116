//! User supplied scripts
//!
//! Scripts arrive base64 encoded in user-data and run through the shell
//! with a timeout. Used after configuration and after scylla has started.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;
use tracing::info;

use super::StepStatus;
use super::command::run_with_timeout;
use crate::ConfigureError;
use crate::settings::Settings;

/// Decode a base64 encoded script
pub fn decode_script(encoded: &str) -> Result<String, ConfigureError> {
    let cleaned: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let decoded = BASE64.decode(cleaned)?;
    String::from_utf8(decoded)
        .map_err(|e| ConfigureError::InvalidData(format!("Script is not UTF-8: {}", e)))
}

/// Decode and run a script through `shell`
pub async fn run_script(
    shell: &Path,
    encoded: &str,
    description: &str,
    timeout: Duration,
) -> Result<(), ConfigureError> {
    let script = decode_script(encoded)?;
    info!("Running {}:\n{}", description, script);

    let mut command = Command::new(shell);
    command.arg("-c").arg(&script);
    run_with_timeout(command, description, timeout).await?;
    Ok(())
}

/// Run the post-configuration script, if one was supplied
pub async fn run_post_configuration_script(
    settings: &Settings,
    encoded: Option<&str>,
    timeout_secs: u64,
) -> Result<StepStatus, ConfigureError> {
    let Some(encoded) = encoded.filter(|script| !script.trim().is_empty()) else {
        return Ok(StepStatus::Skipped("no post configuration script"));
    };

    run_script(
        &settings.shell,
        encoded,
        "post configuration script",
        Duration::from_secs(timeout_secs),
    )
    .await?;
    Ok(StepStatus::Applied)
}
