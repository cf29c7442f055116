//! Scylla startup arguments
//!
//! Not supported yet: a request for startup arguments is only reported.

use tracing::warn;

use super::StepStatus;
use crate::userdata::UserOverrides;

/// Warn when user-data asks for startup arguments
pub fn configure_startup_args(overrides: &UserOverrides) -> StepStatus {
    if overrides.requests_startup_args() {
        warn!("Setting of Scylla startup args currently unsupported");
        StepStatus::Skipped("startup args unsupported")
    } else {
        StepStatus::Skipped("no startup args requested")
    }
}
