//! Data device creation

use tokio::process::Command;
use tracing::info;

use super::StepStatus;
use super::command::run_with_timeout;
use crate::ConfigureError;
use crate::settings::Settings;

/// Run the device creation program, optionally for a specific device type
pub async fn create_devices(
    settings: &Settings,
    data_device: Option<&str>,
) -> Result<StepStatus, ConfigureError> {
    let mut command = Command::new(&settings.create_devices);

    match data_device.map(str::trim).filter(|device| !device.is_empty()) {
        Some(device) => {
            info!("Creating data devices of type {}", device);
            command.args(["--data-device", device]);
        }
        None => info!("Creating data devices"),
    }

    let description = settings.create_devices.display().to_string();
    run_with_timeout(command, &description, settings.create_devices_timeout).await?;
    Ok(StepStatus::Applied)
}
