//! Post-start stage - runs once after scylla has started
//!
//! Runs the `post_start_script` from user-data, then writes a marker so the
//! script never runs again on later boots.

use tokio::fs;
use tracing::info;

use super::fetch_user_data;
use crate::ConfigureError;
use crate::datasources::CloudInstance;
use crate::modules::StepStatus;
use crate::modules::first_boot::touch;
use crate::modules::scripts::run_script;
use crate::settings::Settings;

/// Run the post-start script unless it already ran
pub async fn run(
    settings: &Settings,
    instance: Option<&dyn CloudInstance>,
) -> Result<StepStatus, ConfigureError> {
    info!("Post-start stage");

    if fs::try_exists(&settings.post_start_marker).await? {
        info!(
            "{} exists, post-start script already ran",
            settings.post_start_marker.display()
        );
        return Ok(StepStatus::Skipped("post-start already configured"));
    }

    let overrides = fetch_user_data(instance).await;
    let Some(script) = overrides
        .post_start_script
        .as_deref()
        .filter(|script| !script.trim().is_empty())
    else {
        info!("No post-start script");
        return Ok(StepStatus::Skipped("no post-start script"));
    };

    run_script(
        &settings.shell,
        script,
        "post-start script",
        settings.post_start_timeout,
    )
    .await?;

    touch(&settings.post_start_marker).await?;
    info!("Post-start script completed");
    Ok(StepStatus::Applied)
}
