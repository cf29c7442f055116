//! Error types for scylla-configure

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scylla-configure operations
#[derive(Error, Debug)]
pub enum ConfigureError {
    #[error("Datasource error: {0}")]
    Datasource(String),

    #[error("Unknown cloud provider, only AWS/GCP/Azure are supported")]
    NoCloudInstance,

    #[error("Cannot place configuration file {}: {source}", path.display())]
    Precondition {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Command '{command}' exited with status {code}: {stderr}")]
    Command {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Command '{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl ConfigureError {
    /// Create a precondition error for the configuration file at `path`
    pub fn precondition(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Precondition {
            path: path.into(),
            source,
        }
    }

    /// Create a command failure error
    pub fn command(command: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }
}
