//! Configure stage - first boot provisioning
//!
//! Responsibilities, in order:
//! - Reconcile and write scylla.yaml (fatal on failure)
//! - Report unsupported startup arguments
//! - Enable developer mode
//! - Run the post-configuration script
//! - Suppress scylla start on first boot
//! - Create data devices
//!
//! Only a scylla.yaml failure stops the sequence. Every other failure is
//! logged and the next step runs.

use tracing::{error, info, warn};

use super::{fetch_instance_facts, fetch_user_data};
use crate::ConfigureError;
use crate::config::{self, DefaultTable};
use crate::datasources::{CloudInstance, InstanceFacts};
use crate::modules::{
    Fatality, Step, StepStatus, developer_mode, devices, first_boot, scripts, startup_args,
};
use crate::settings::Settings;
use crate::userdata::UserOverrides;

/// Outcome of one step
#[derive(Debug)]
pub enum StepOutcome {
    Applied,
    Skipped(&'static str),
    /// Failed; whether the run went on depends on the step's fatality
    Failed(ConfigureError),
}

/// Outcome of one step in a run
#[derive(Debug)]
pub struct StepReport {
    pub step: Step,
    pub outcome: StepOutcome,
}

/// What happened during a configuration run
#[derive(Debug, Default)]
pub struct RunReport {
    pub steps: Vec<StepReport>,
    /// A fatal step failed and the remaining steps did not run
    pub aborted: bool,
}

impl RunReport {
    /// Outcome of `step`, `None` if it did not run
    pub fn outcome(&self, step: Step) -> Option<&StepOutcome> {
        self.steps
            .iter()
            .find(|report| report.step == step)
            .map(|report| &report.outcome)
    }

    /// Steps that failed
    pub fn failures(&self) -> impl Iterator<Item = &StepReport> {
        self.steps
            .iter()
            .filter(|report| matches!(report.outcome, StepOutcome::Failed(_)))
    }

    fn log_summary(&self) {
        let failed = self.failures().count();
        if self.aborted {
            error!(
                "Configuration aborted after {} of {} steps",
                self.steps.len(),
                Step::SEQUENCE.len()
            );
        } else if failed > 0 {
            warn!("Configuration completed, {} step(s) failed", failed);
        } else {
            info!("Configuration completed");
        }
    }
}

/// Runs the provisioning sequence once
pub struct Configurator {
    settings: Settings,
    defaults: DefaultTable,
}

impl Configurator {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            defaults: DefaultTable::new(),
        }
    }

    /// Replace the default table (useful for testing)
    pub fn with_defaults(mut self, defaults: DefaultTable) -> Self {
        self.defaults = defaults;
        self
    }

    /// Run every step in order against `instance`
    ///
    /// Without an instance (or when its metadata cannot be read) the static
    /// defaults and an empty override set are used.
    pub async fn run(&self, instance: Option<&dyn CloudInstance>) -> RunReport {
        info!("Configure stage: provisioning scylla machine image");

        let facts = fetch_instance_facts(instance).await;
        let overrides = fetch_user_data(instance).await;

        let mut report = RunReport::default();

        for step in Step::SEQUENCE {
            let outcome = match self.run_step(step, facts.as_ref(), &overrides).await {
                Ok(StepStatus::Applied) => {
                    info!("Step {}: applied", step);
                    StepOutcome::Applied
                }
                Ok(StepStatus::Skipped(reason)) => {
                    info!("Step {}: skipped ({})", step, reason);
                    StepOutcome::Skipped(reason)
                }
                Err(e) => {
                    error!("Step {} failed: {}", step, e);
                    StepOutcome::Failed(e)
                }
            };

            let failed = matches!(outcome, StepOutcome::Failed(_));
            report.steps.push(StepReport { step, outcome });

            if failed && step.fatality() == Fatality::Fatal {
                report.aborted = true;
                break;
            }
        }

        report.log_summary();
        report
    }

    async fn run_step(
        &self,
        step: Step,
        facts: Option<&InstanceFacts>,
        overrides: &UserOverrides,
    ) -> Result<StepStatus, ConfigureError> {
        match step {
            Step::ScyllaYaml => self.configure_scylla_yaml(facts, overrides).await,
            Step::StartupArgs => Ok(startup_args::configure_startup_args(overrides)),
            Step::DeveloperMode => {
                let enabled = overrides
                    .developer_mode
                    .unwrap_or(self.defaults.developer_mode);
                developer_mode::set_developer_mode(&self.settings, enabled).await
            }
            Step::PostConfigurationScript => {
                let timeout = overrides
                    .post_configuration_script_timeout
                    .unwrap_or(self.defaults.post_configuration_script_timeout);
                scripts::run_post_configuration_script(
                    &self.settings,
                    overrides.post_configuration_script.as_deref(),
                    timeout,
                )
                .await
            }
            Step::FirstBootStart => {
                let start = overrides
                    .start_scylla_on_first_boot
                    .unwrap_or(self.defaults.start_scylla_on_first_boot);
                first_boot::start_scylla_on_first_boot(&self.settings.disable_start_marker, start)
                    .await
            }
            Step::CreateDevices => {
                devices::create_devices(&self.settings, overrides.data_device.as_deref()).await
            }
        }
    }

    async fn configure_scylla_yaml(
        &self,
        facts: Option<&InstanceFacts>,
        overrides: &UserOverrides,
    ) -> Result<StepStatus, ConfigureError> {
        info!("Going to create {}...", self.settings.scylla_yaml.display());

        let existing = config::load_document(&self.settings.scylla_yaml).await?;
        let document = config::reconcile(&self.defaults, facts, overrides, existing);
        config::write_document(
            &self.settings.scylla_yaml,
            self.settings.scylla_yaml_example(),
            &document,
        )
        .await?;

        Ok(StepStatus::Applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasources::mock::MockCloudInstance;
    use serde_yaml::{Mapping, Value};
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        // /bin/true stands in for the external programs
        Settings::new()
            .with_config_dir(dir.path())
            .with_dev_mode_setup("/bin/true")
            .with_create_devices("/bin/true")
    }

    fn written(settings: &Settings) -> Mapping {
        serde_yaml::from_str(&std::fs::read_to_string(&settings.scylla_yaml).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_run_without_user_data() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let instance = MockCloudInstance::new().with_private_ip("10.0.0.9");

        let report = Configurator::new(settings.clone())
            .with_defaults(DefaultTable::at(5))
            .run(Some(&instance))
            .await;

        assert!(!report.aborted);
        assert_eq!(report.steps.len(), Step::SEQUENCE.len());
        assert!(matches!(
            report.outcome(Step::ScyllaYaml),
            Some(StepOutcome::Applied)
        ));
        assert!(matches!(
            report.outcome(Step::DeveloperMode),
            Some(StepOutcome::Skipped(_))
        ));

        let document = written(&settings);
        assert_eq!(document.get("listen_address"), Some(&Value::from("10.0.0.9")));
        assert_eq!(
            document.get("cluster_name"),
            Some(&Value::from("scylladb-cluster-5"))
        );
        assert!(!settings.disable_start_marker.exists());
    }

    #[tokio::test]
    async fn test_instance_facts_fetched_once() {
        let dir = TempDir::new().unwrap();
        let instance = MockCloudInstance::new();

        Configurator::new(settings(&dir)).run(Some(&instance)).await;
        assert_eq!(instance.private_ip_calls(), 1);
    }

    #[tokio::test]
    async fn test_run_without_instance_uses_static_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);

        let report = Configurator::new(settings.clone()).run(None).await;

        assert!(!report.aborted);
        assert_eq!(written(&settings).get("listen_address"), Some(&Value::from("")));
    }

    #[tokio::test]
    async fn test_fatal_failure_aborts_sequence() {
        let dir = TempDir::new().unwrap();
        // The configuration directory does not exist, so nothing can be written
        let settings = settings(&dir).with_scylla_yaml(dir.path().join("missing/scylla.yaml"));
        let instance =
            MockCloudInstance::new().with_user_data(r#"{"start_scylla_on_first_boot": false}"#);

        let report = Configurator::new(settings.clone()).run(Some(&instance)).await;

        assert!(report.aborted);
        assert_eq!(report.steps.len(), 1);
        assert!(matches!(
            report.outcome(Step::ScyllaYaml),
            Some(StepOutcome::Failed(ConfigureError::Precondition { .. }))
        ));
        assert!(report.outcome(Step::FirstBootStart).is_none());
        assert!(!settings.disable_start_marker.exists());
    }

    #[tokio::test]
    async fn test_isolated_failure_continues() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir).with_dev_mode_setup("/bin/false");
        let instance = MockCloudInstance::new()
            .with_user_data(r#"{"developer_mode": true, "start_scylla_on_first_boot": false}"#);

        let report = Configurator::new(settings.clone()).run(Some(&instance)).await;

        assert!(!report.aborted);
        assert!(matches!(
            report.outcome(Step::DeveloperMode),
            Some(StepOutcome::Failed(ConfigureError::Command { .. }))
        ));
        assert!(matches!(
            report.outcome(Step::FirstBootStart),
            Some(StepOutcome::Applied)
        ));
        assert!(matches!(
            report.outcome(Step::CreateDevices),
            Some(StepOutcome::Applied)
        ));
        assert_eq!(report.failures().count(), 1);
        assert!(settings.disable_start_marker.exists());
    }
}
