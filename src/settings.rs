//! Fixed paths and external programs used during provisioning
//!
//! Every location has a production default; tests redirect them into a
//! scratch directory with the `with_*` builders.

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default location of the database configuration file
pub const SCYLLA_YAML: &str = "/etc/scylla/scylla.yaml";

/// Marker whose existence keeps the service manager from starting scylla on first boot
pub const DISABLE_START_MARKER: &str = "/etc/scylla/ami_disabled";

/// Marker written once the post-start script has succeeded
pub const POST_START_MARKER: &str = "/etc/scylla/machine_image_post_start_configured";

/// Developer mode setup program
pub const DEV_MODE_SETUP: &str = "/usr/sbin/scylla_dev_mode_setup";

/// Data device creation program
pub const CREATE_DEVICES: &str = "/opt/scylladb/scylla-machine-image/scylla_create_devices";

/// Shell used for user supplied scripts
pub const SHELL: &str = "/bin/sh";

/// Default log directory
pub const LOG_DIR: &str = "/var/lib/scylla/logs";

/// Suffix appended to the configuration file when it is preserved
const EXAMPLE_SUFFIX: &str = ".example";

/// Paths, programs and timeouts for one configuration run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Configuration file (default: /etc/scylla/scylla.yaml)
    pub scylla_yaml: PathBuf,
    /// First-boot start suppression marker
    pub disable_start_marker: PathBuf,
    /// Post-start completion marker
    pub post_start_marker: PathBuf,
    /// Developer mode setup program
    pub dev_mode_setup: PathBuf,
    /// Data device creation program
    pub create_devices: PathBuf,
    /// Shell for post-configuration and post-start scripts
    pub shell: PathBuf,
    /// Bound on the developer mode setup program
    pub dev_mode_timeout: Duration,
    /// Bound on the device creation program
    pub create_devices_timeout: Duration,
    /// Bound on the post-start script
    pub post_start_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

impl Settings {
    /// Create with the production defaults
    pub fn new() -> Self {
        Self {
            scylla_yaml: PathBuf::from(SCYLLA_YAML),
            disable_start_marker: PathBuf::from(DISABLE_START_MARKER),
            post_start_marker: PathBuf::from(POST_START_MARKER),
            dev_mode_setup: PathBuf::from(DEV_MODE_SETUP),
            create_devices: PathBuf::from(CREATE_DEVICES),
            shell: PathBuf::from(SHELL),
            dev_mode_timeout: Duration::from_secs(60),
            create_devices_timeout: Duration::from_secs(900),
            post_start_timeout: Duration::from_secs(600),
        }
    }

    /// Place the configuration file and both markers under `dir`
    /// (useful for testing)
    pub fn with_config_dir(self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            scylla_yaml: dir.join("scylla.yaml"),
            disable_start_marker: dir.join("ami_disabled"),
            post_start_marker: dir.join("machine_image_post_start_configured"),
            ..self
        }
    }

    pub fn with_scylla_yaml(mut self, path: impl AsRef<Path>) -> Self {
        self.scylla_yaml = path.as_ref().to_path_buf();
        self
    }

    pub fn with_dev_mode_setup(mut self, program: impl AsRef<Path>) -> Self {
        self.dev_mode_setup = program.as_ref().to_path_buf();
        self
    }

    pub fn with_create_devices(mut self, program: impl AsRef<Path>) -> Self {
        self.create_devices = program.as_ref().to_path_buf();
        self
    }

    pub fn with_dev_mode_timeout(mut self, timeout: Duration) -> Self {
        self.dev_mode_timeout = timeout;
        self
    }

    /// `<scylla_yaml>.example` - where the pre-existing file is preserved
    pub fn scylla_yaml_example(&self) -> PathBuf {
        let mut name = self.scylla_yaml.clone().into_os_string();
        name.push(EXAMPLE_SUFFIX);
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let settings = Settings::new();
        assert_eq!(settings.scylla_yaml, PathBuf::from("/etc/scylla/scylla.yaml"));
        assert_eq!(
            settings.disable_start_marker,
            PathBuf::from("/etc/scylla/ami_disabled")
        );
        assert_eq!(settings.dev_mode_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_example_path_appends_suffix() {
        let settings = Settings::new();
        assert_eq!(
            settings.scylla_yaml_example(),
            PathBuf::from("/etc/scylla/scylla.yaml.example")
        );
    }

    #[test]
    fn test_with_config_dir() {
        let settings = Settings::new().with_config_dir("/tmp/test-scylla");
        assert_eq!(settings.scylla_yaml, PathBuf::from("/tmp/test-scylla/scylla.yaml"));
        assert_eq!(
            settings.scylla_yaml_example(),
            PathBuf::from("/tmp/test-scylla/scylla.yaml.example")
        );
        assert_eq!(
            settings.disable_start_marker,
            PathBuf::from("/tmp/test-scylla/ami_disabled")
        );
        // Programs are untouched
        assert_eq!(settings.dev_mode_setup, PathBuf::from(DEV_MODE_SETUP));
    }
}
