//! End to end tests of the configure stage
//!
//! External programs are replaced by small shell scripts that record their
//! arguments, and the cloud by a mock instance.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use scylla_configure::config::DefaultTable;
use scylla_configure::config::defaults::sole_seed;
use scylla_configure::datasources::mock::MockCloudInstance;
use scylla_configure::modules::Step;
use scylla_configure::{ConfigureError, Configurator, RunReport, Settings, StepOutcome};
use serde_yaml::{Mapping, Value};
use tempfile::TempDir;

struct Node {
    dir: TempDir,
    settings: Settings,
}

impl Node {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let dev_mode = fake_program(dir.path(), "scylla_dev_mode_setup", 0);
        let devices = fake_program(dir.path(), "scylla_create_devices", 0);

        let settings = Settings::new()
            .with_config_dir(dir.path())
            .with_dev_mode_setup(dev_mode)
            .with_create_devices(devices);

        Self { dir, settings }
    }

    async fn configure(&self, instance: &MockCloudInstance) -> RunReport {
        Configurator::new(self.settings.clone())
            .with_defaults(DefaultTable::at(1700000000))
            .run(Some(instance))
            .await
    }

    /// Arguments of every invocation of a fake program, one line per call
    fn invocations(&self, program: &str) -> Option<String> {
        fs::read_to_string(self.dir.path().join(format!("{}.calls", program))).ok()
    }

    fn scylla_yaml(&self) -> Mapping {
        serde_yaml::from_str(&fs::read_to_string(&self.settings.scylla_yaml).unwrap()).unwrap()
    }
}

/// Write a program that records its arguments and exits with `code`
fn fake_program(dir: &Path, name: &str, code: i32) -> PathBuf {
    let program = dir.join(name);
    let calls = dir.join(format!("{}.calls", name));
    fs::write(
        &program,
        format!("#!/bin/sh\necho \"$@\" >> {}\nexit {}\n", calls.display(), code),
    )
    .unwrap();
    fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();
    program
}

fn b64(script: &str) -> String {
    BASE64.encode(script)
}

fn get<'a>(document: &'a Mapping, key: &str) -> Option<&'a Value> {
    document.get(key)
}

#[tokio::test]
async fn test_failed_script_does_not_block_devices() {
    let node = Node::new();
    let user_data = format!(
        r#"{{"developer_mode": true, "post_configuration_script": "{}"}}"#,
        b64("exit 1")
    );
    let instance = MockCloudInstance::new().with_user_data(&user_data);

    let report = node.configure(&instance).await;

    assert!(!report.aborted);
    assert_eq!(
        node.invocations("scylla_dev_mode_setup").as_deref(),
        Some("--developer-mode 1\n")
    );
    assert!(matches!(
        report.outcome(Step::PostConfigurationScript),
        Some(StepOutcome::Failed(ConfigureError::Command { code: 1, .. }))
    ));
    assert!(matches!(
        report.outcome(Step::CreateDevices),
        Some(StepOutcome::Applied)
    ));
    assert_eq!(node.invocations("scylla_create_devices").as_deref(), Some("\n"));
}

#[tokio::test]
async fn test_instance_facts_fill_addresses() {
    let node = Node::new();
    let instance = MockCloudInstance::new()
        .with_private_ip("10.0.0.5")
        .with_snitch("Ec2Snitch")
        .with_user_data(r#"{"scylla_yaml": {"cluster_name": "prod"}}"#);

    node.configure(&instance).await;
    let document = node.scylla_yaml();

    assert_eq!(get(&document, "cluster_name"), Some(&Value::from("prod")));
    assert_eq!(get(&document, "listen_address"), Some(&Value::from("10.0.0.5")));
    assert_eq!(
        get(&document, "broadcast_rpc_address"),
        Some(&Value::from("10.0.0.5"))
    );
    assert_eq!(get(&document, "endpoint_snitch"), Some(&Value::from("Ec2Snitch")));
    assert_eq!(
        sole_seed(get(&document, "seed_provider").unwrap()),
        Some("10.0.0.5")
    );
    assert_eq!(get(&document, "auto_bootstrap"), Some(&Value::from(true)));
    assert_eq!(get(&document, "rpc_address"), Some(&Value::from("0.0.0.0")));
}

#[tokio::test]
async fn test_user_override_beats_instance_facts() {
    let node = Node::new();
    let instance = MockCloudInstance::new()
        .with_private_ip("10.0.0.5")
        .with_user_data(
            r#"{"scylla_yaml": {"listen_address": "192.168.1.1", "auto_bootstrap": false}}"#,
        );

    node.configure(&instance).await;
    let document = node.scylla_yaml();

    assert_eq!(
        get(&document, "listen_address"),
        Some(&Value::from("192.168.1.1"))
    );
    assert_eq!(get(&document, "auto_bootstrap"), Some(&Value::from(false)));
    assert_eq!(
        get(&document, "broadcast_rpc_address"),
        Some(&Value::from("10.0.0.5"))
    );
}

#[tokio::test]
async fn test_existing_file_is_preserved() {
    let node = Node::new();
    let previous = "cluster_name: old\nnum_tokens: 256\n";
    fs::write(&node.settings.scylla_yaml, previous).unwrap();

    let instance = MockCloudInstance::new().with_private_ip("10.0.0.5");
    let report = node.configure(&instance).await;

    assert!(!report.aborted);
    assert_eq!(
        fs::read_to_string(node.settings.scylla_yaml_example()).unwrap(),
        previous
    );

    let document = node.scylla_yaml();
    // Keys only the old file knows about survive, defaults replace the rest
    assert_eq!(get(&document, "num_tokens"), Some(&Value::from(256)));
    assert_eq!(
        get(&document, "cluster_name"),
        Some(&Value::from("scylladb-cluster-1700000000"))
    );
}

#[tokio::test]
async fn test_malformed_user_data_uses_defaults() {
    let node = Node::new();
    let instance = MockCloudInstance::new().with_user_data("{not json");

    let report = node.configure(&instance).await;

    assert!(!report.aborted);
    assert!(report.failures().next().is_none());
    assert!(node.invocations("scylla_dev_mode_setup").is_none());
    assert!(!node.settings.disable_start_marker.exists());
    assert_eq!(
        get(&node.scylla_yaml(), "cluster_name"),
        Some(&Value::from("scylladb-cluster-1700000000"))
    );
}

#[tokio::test]
async fn test_suppression_marker_survives_second_run() {
    let node = Node::new();
    let instance =
        MockCloudInstance::new().with_user_data(r#"{"start_scylla_on_first_boot": false}"#);

    let first = node.configure(&instance).await;
    let second = node.configure(&instance).await;

    for report in [first, second] {
        assert!(matches!(
            report.outcome(Step::FirstBootStart),
            Some(StepOutcome::Applied)
        ));
    }
    assert!(node.settings.disable_start_marker.exists());
    assert_eq!(
        fs::metadata(&node.settings.disable_start_marker).unwrap().len(),
        0
    );
}

#[tokio::test]
async fn test_data_device_is_passed() {
    let node = Node::new();
    let instance = MockCloudInstance::new().with_user_data(r#"{"data_device": "instance_store"}"#);

    node.configure(&instance).await;

    assert_eq!(
        node.invocations("scylla_create_devices").as_deref(),
        Some("--data-device instance_store\n")
    );
}

#[tokio::test]
async fn test_device_failure_is_isolated() {
    let node = Node::new();
    let devices = fake_program(node.dir.path(), "failing_create_devices", 5);
    let configurator = Configurator::new(node.settings.clone().with_create_devices(devices));

    let instance = MockCloudInstance::new();
    let report = configurator.run(Some(&instance)).await;

    assert!(!report.aborted);
    assert!(matches!(
        report.outcome(Step::CreateDevices),
        Some(StepOutcome::Failed(ConfigureError::Command { code: 5, .. }))
    ));
}

#[tokio::test]
async fn test_post_configuration_script_runs() {
    let node = Node::new();
    let touched = node.dir.path().join("script-ran");
    let user_data = format!(
        r#"{{"post_configuration_script": "{}", "post_configuration_script_timeout": 30}}"#,
        b64(&format!("touch {}", touched.display()))
    );
    let instance = MockCloudInstance::new().with_user_data(&user_data);

    let report = node.configure(&instance).await;

    assert!(matches!(
        report.outcome(Step::PostConfigurationScript),
        Some(StepOutcome::Applied)
    ));
    assert!(touched.exists());
}

#[tokio::test]
async fn test_multipart_user_data() {
    let node = Node::new();
    let raw = "Content-Type: multipart/mixed; boundary=\"XYZ\"\nMIME-Version: 1.0\n\n\
               --XYZ\nContent-Type: text/cloud-config\n\n#cloud-config\nhostname: node\n\
               --XYZ\nContent-Type: x-scylla/yaml\n\nscylla_yaml:\n  cluster_name: from-mime\n\
               --XYZ--\n";
    let instance = MockCloudInstance::new().with_user_data(raw);

    node.configure(&instance).await;

    assert_eq!(
        get(&node.scylla_yaml(), "cluster_name"),
        Some(&Value::from("from-mime"))
    );
}
