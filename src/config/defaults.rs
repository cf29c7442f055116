//! Default configuration table
//!
//! Static defaults for scylla.yaml and the provisioning directives. The
//! listen, broadcast and seed addresses are placeholders until they are
//! filled with instance facts by [`DefaultTable::with_instance_facts`].

use serde_yaml::{Mapping, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::datasources::InstanceFacts;

/// Seed provider class written into the default seed list
pub const SEED_PROVIDER_CLASS: &str = "org.apache.cassandra.locator.SimpleSeedProvider";

/// Defaults for every value user-data can override
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultTable {
    /// scylla.yaml defaults, lowest precedence
    pub scylla_yaml: Mapping,
    pub developer_mode: bool,
    /// Seconds
    pub post_configuration_script_timeout: u64,
    pub start_scylla_on_first_boot: bool,
}

impl Default for DefaultTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultTable {
    /// Defaults with a cluster name derived from the current time
    pub fn new() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::at(now)
    }

    /// Defaults with a cluster name derived from `boot_timestamp` (seconds since the epoch)
    pub fn at(boot_timestamp: u64) -> Self {
        let mut scylla_yaml = Mapping::new();
        scylla_yaml.insert(
            "cluster_name".into(),
            format!("scylladb-cluster-{}", boot_timestamp).into(),
        );
        scylla_yaml.insert("experimental".into(), false.into());
        scylla_yaml.insert("auto_bootstrap".into(), true.into());
        scylla_yaml.insert("listen_address".into(), "".into());
        scylla_yaml.insert("broadcast_rpc_address".into(), "".into());
        scylla_yaml.insert("rpc_address".into(), "0.0.0.0".into());
        scylla_yaml.insert("seed_provider".into(), seed_provider(""));

        Self {
            scylla_yaml,
            developer_mode: false,
            post_configuration_script_timeout: 600,
            start_scylla_on_first_boot: true,
        }
    }

    /// A copy of this table with the instance-derived values filled in
    ///
    /// Instance facts replace the static placeholders; the table itself is
    /// left untouched.
    pub fn with_instance_facts(&self, facts: &InstanceFacts) -> Self {
        let mut table = self.clone();
        let ip = Value::from(facts.private_ip.as_str());

        table.scylla_yaml.insert("listen_address".into(), ip.clone());
        table.scylla_yaml.insert("broadcast_rpc_address".into(), ip);
        table
            .scylla_yaml
            .insert("seed_provider".into(), seed_provider(&facts.private_ip));
        table.scylla_yaml.insert(
            "endpoint_snitch".into(),
            facts.endpoint_snitch.as_str().into(),
        );
        table
    }
}

/// `seed_provider` value with a single seed
pub fn seed_provider(seed: &str) -> Value {
    let mut parameters = Mapping::new();
    parameters.insert("seeds".into(), seed.into());

    let mut provider = Mapping::new();
    provider.insert("class_name".into(), SEED_PROVIDER_CLASS.into());
    provider.insert(
        "parameters".into(),
        Value::Sequence(vec![Value::Mapping(parameters)]),
    );

    Value::Sequence(vec![Value::Mapping(provider)])
}

/// The sole seed of a `seed_provider` value, if it has that shape
pub fn sole_seed(seed_provider: &Value) -> Option<&str> {
    seed_provider
        .as_sequence()?
        .first()?
        .get("parameters")?
        .as_sequence()?
        .first()?
        .get("seeds")?
        .as_str()
}
