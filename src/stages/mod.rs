//! Boot stages
//!
//! 1. Configure - first boot, before scylla starts: scylla.yaml and
//!    provisioning steps
//! 2. Post-start - after scylla has started: the post-start script

pub mod configure;
pub mod post_start;

use tracing::{info, warn};

use crate::datasources::{CloudInstance, InstanceFacts};
use crate::userdata::{UserOverrides, parse_user_data};

/// Fetch and parse user-data, falling back to an empty override set
pub async fn fetch_user_data(instance: Option<&dyn CloudInstance>) -> UserOverrides {
    let Some(instance) = instance else {
        warn!("No cloud instance, using default settings");
        return UserOverrides::default();
    };

    match instance.user_data().await {
        Ok(raw) => {
            info!("Got user-data ({} bytes)", raw.len());
            parse_user_data(raw.as_bytes())
        }
        Err(e) => {
            warn!("Error getting user data: {}. Will use defaults!", e);
            UserOverrides::default()
        }
    }
}

/// Fetch the instance facts once, `None` when they are unavailable
pub async fn fetch_instance_facts(instance: Option<&dyn CloudInstance>) -> Option<InstanceFacts> {
    let instance = instance?;

    match InstanceFacts::fetch(instance).await {
        Ok(facts) => {
            info!(
                "Instance private IP {}, endpoint snitch {}",
                facts.private_ip, facts.endpoint_snitch
            );
            Some(facts)
        }
        Err(e) => {
            warn!("Error getting instance facts: {}. Will use static defaults!", e);
            None
        }
    }
}
