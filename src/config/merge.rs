//! scylla.yaml reconciliation
//!
//! Implements merging of the configuration sources with this precedence,
//! highest first:
//! 1. scylla_yaml overrides from user-data
//! 2. Instance facts (listen/broadcast/seed address, endpoint snitch)
//! 3. Static defaults
//! 4. The pre-existing scylla.yaml, for keys none of the above mention
//!
//! Merging is shallow: a top-level key is replaced as a whole.

use tracing::{debug, info};

use super::ConfigDocument;
use super::defaults::DefaultTable;
use crate::datasources::InstanceFacts;
use crate::userdata::UserOverrides;

/// Merge defaults, instance facts and user overrides into `existing`
pub fn reconcile(
    defaults: &DefaultTable,
    facts: Option<&InstanceFacts>,
    overrides: &UserOverrides,
    existing: ConfigDocument,
) -> ConfigDocument {
    let defaults = match facts {
        Some(facts) => defaults.with_instance_facts(facts),
        None => defaults.clone(),
    };

    let mut document = existing;

    if !overrides.scylla_yaml.is_empty() {
        info!("Setting params from user-data...");
        for (param, value) in &overrides.scylla_yaml {
            info!("Setting {}={}", display_key(param), display_value(value));
            document.insert(param.clone(), value.clone());
        }
    }

    for (param, value) in &defaults.scylla_yaml {
        if overrides.scylla_yaml.contains_key(param) {
            debug!("Keeping user-data value for {}", display_key(param));
            continue;
        }
        info!("Setting default {}={}", display_key(param), display_value(value));
        document.insert(param.clone(), value.clone());
    }

    document
}

fn display_key(key: &serde_yaml::Value) -> String {
    key.as_str()
        .map(str::to_string)
        .unwrap_or_else(|| display_value(key))
}

fn display_value(value: &serde_yaml::Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}
