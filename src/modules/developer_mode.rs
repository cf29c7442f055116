//! Developer mode setup

use tokio::process::Command;
use tracing::info;

use super::StepStatus;
use super::command::run_with_timeout;
use crate::ConfigureError;
use crate::settings::Settings;

/// Enable developer mode through the setup program when requested
///
/// A non-zero exit or timeout of the setup program is returned to the caller.
pub async fn set_developer_mode(
    settings: &Settings,
    enabled: bool,
) -> Result<StepStatus, ConfigureError> {
    if !enabled {
        return Ok(StepStatus::Skipped("developer mode not requested"));
    }

    info!("Setting up developer mode");
    let mut command = Command::new(&settings.dev_mode_setup);
    command.args(["--developer-mode", "1"]);

    let description = settings.dev_mode_setup.display().to_string();
    run_with_timeout(command, &description, settings.dev_mode_timeout).await?;
    Ok(StepStatus::Applied)
}
