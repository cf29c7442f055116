//! First-boot start suppression
//!
//! The service manager leaves scylla stopped on first boot while the
//! marker file exists.

use std::path::Path;
use tokio::fs::OpenOptions;
use tracing::info;

use super::StepStatus;
use crate::ConfigureError;

/// Create the start suppression marker unless scylla should start
///
/// Creating a marker that already exists is a no-op.
pub async fn start_scylla_on_first_boot(
    marker: &Path,
    start: bool,
) -> Result<StepStatus, ConfigureError> {
    if start {
        return Ok(StepStatus::Skipped("scylla starts on first boot"));
    }

    info!("Disabling Scylla start on first boot");
    touch(marker).await?;
    Ok(StepStatus::Applied)
}

/// Create `path` if missing, leaving existing content alone
pub async fn touch(path: &Path) -> Result<(), ConfigureError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(())
}
