//! Provisioning steps
//!
//! Each step handles one aspect of first-boot provisioning. Steps run in a
//! fixed order and report a [`StepStatus`] or an error; what an error means
//! for the rest of the run is decided by [`Step::fatality`].

pub mod command;
pub mod developer_mode;
pub mod devices;
pub mod first_boot;
pub mod scripts;
pub mod startup_args;

/// Provisioning steps, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Reconcile and write scylla.yaml
    ScyllaYaml,
    /// Scylla startup arguments (unsupported, warns only)
    StartupArgs,
    /// Developer mode setup
    DeveloperMode,
    /// User supplied post-configuration script
    PostConfigurationScript,
    /// Start suppression on first boot
    FirstBootStart,
    /// Data device creation
    CreateDevices,
}

impl Step {
    /// The fixed provisioning sequence
    pub const SEQUENCE: [Step; 6] = [
        Step::ScyllaYaml,
        Step::StartupArgs,
        Step::DeveloperMode,
        Step::PostConfigurationScript,
        Step::FirstBootStart,
        Step::CreateDevices,
    ];

    /// Name of this step
    pub fn name(&self) -> &'static str {
        match self {
            Step::ScyllaYaml => "scylla_yaml",
            Step::StartupArgs => "scylla_startup_args",
            Step::DeveloperMode => "developer_mode",
            Step::PostConfigurationScript => "post_configuration_script",
            Step::FirstBootStart => "start_scylla_on_first_boot",
            Step::CreateDevices => "create_devices",
        }
    }

    /// What a failure of this step means for the remaining steps
    pub fn fatality(&self) -> Fatality {
        match self {
            // Every later step assumes scylla.yaml is in place
            Step::ScyllaYaml => Fatality::Fatal,
            _ => Fatality::Isolated,
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Failure class of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fatality {
    /// Abort the remaining sequence
    Fatal,
    /// Log and continue with the next step
    Isolated,
}

/// Successful result of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The step changed something
    Applied,
    /// The step had nothing to do
    Skipped(&'static str),
}
