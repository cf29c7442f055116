//! Cloud instance providers
//!
//! Each cloud exposes the same three facts: the private IPv4 address of the
//! instance, the raw user-data blob, and the endpoint snitch class scylla
//! should use on that cloud.

pub mod azure;
pub mod ec2;
pub mod gce;
pub mod mock;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, info};

use crate::ConfigureError;

/// Trait for cloud instance metadata providers
///
/// Implementations must be safe to call repeatedly; callers fetch what they
/// need once per run through [`InstanceFacts::fetch`].
#[async_trait]
pub trait CloudInstance: Send + Sync {
    /// Name of this provider (e.g., "AWS", "GCP", "Azure")
    fn name(&self) -> &'static str;

    /// Endpoint snitch class for this cloud
    fn endpoint_snitch(&self) -> &'static str;

    /// Quick check whether the metadata service of this cloud answers
    async fn is_available(&self) -> bool;

    /// Private IPv4 address of the instance
    async fn private_ipv4(&self) -> Result<String, ConfigureError>;

    /// Raw user-data, empty when none was supplied
    async fn user_data(&self) -> Result<String, ConfigureError>;
}

/// Immutable per-instance facts, fetched once per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceFacts {
    pub private_ip: String,
    pub endpoint_snitch: String,
}

impl InstanceFacts {
    /// Query the provider for the facts the configuration depends on
    pub async fn fetch(instance: &dyn CloudInstance) -> Result<Self, ConfigureError> {
        let private_ip = instance.private_ipv4().await?.trim().to_string();
        if private_ip.is_empty() {
            return Err(ConfigureError::Datasource(format!(
                "{} returned an empty private IPv4 address",
                instance.name()
            )));
        }

        let facts = Self {
            private_ip,
            endpoint_snitch: instance.endpoint_snitch().to_string(),
        };
        debug!("Instance facts: {:?}", facts);
        Ok(facts)
    }
}

/// Supported clouds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Aws,
    Gcp,
    Azure,
}

impl std::fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloudProvider::Aws => write!(f, "aws"),
            CloudProvider::Gcp => write!(f, "gcp"),
            CloudProvider::Azure => write!(f, "azure"),
        }
    }
}

/// Build the provider for a known cloud, skipping detection
pub fn cloud_instance(provider: CloudProvider) -> Result<Box<dyn CloudInstance>, ConfigureError> {
    Ok(match provider {
        CloudProvider::Aws => Box::new(ec2::Ec2::new()?),
        CloudProvider::Gcp => Box::new(gce::Gce::new()?),
        CloudProvider::Azure => Box::new(azure::Azure::new()?),
    })
}

/// Detect and return the provider for the cloud this instance runs on
pub async fn detect_cloud_instance() -> Result<Box<dyn CloudInstance>, ConfigureError> {
    // Same order as the image build: AWS, then GCP, then Azure
    let candidates: Vec<Box<dyn CloudInstance>> = vec![
        Box::new(ec2::Ec2::new()?),
        Box::new(gce::Gce::new()?),
        Box::new(azure::Azure::new()?),
    ];

    for instance in candidates {
        if instance.is_available().await {
            info!("Detected cloud: {}", instance.name());
            return Ok(instance);
        }
    }

    Err(ConfigureError::NoCloudInstance)
}

/// Retry policy for metadata requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, at least one
    pub attempts: u32,
    /// Pause between attempts
    pub interval: Duration,
    /// Bound on each individual request
    pub request_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(3),
        }
    }
}

impl RetryPolicy {
    /// A single attempt, used for availability probes
    pub fn once() -> Self {
        Self {
            attempts: 1,
            interval: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// HTTP client shared by the metadata providers
pub(crate) fn http_client() -> Result<Client, ConfigureError> {
    Ok(Client::builder()
        .connect_timeout(Duration::from_secs(2))
        .build()?)
}

/// Send a metadata request and return its body
///
/// Transport errors and server errors are retried according to `policy`.
/// A 404 yields `Ok(None)`; any other unsuccessful status is an error.
pub(crate) async fn get_text<F>(
    policy: &RetryPolicy,
    what: &str,
    request: F,
) -> Result<Option<String>, ConfigureError>
where
    F: Fn() -> RequestBuilder,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = request().timeout(policy.request_timeout).send().await;

        let retryable = match &result {
            Ok(response) => response.status().is_server_error(),
            Err(_) => true,
        };

        if retryable && attempt < attempts {
            debug!("Request for {} failed (attempt {}/{}), retrying", what, attempt, attempts);
            tokio::time::sleep(policy.interval).await;
            attempt += 1;
            continue;
        }

        let response = result?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{} not found", what);
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ConfigureError::Datasource(format!(
                "Failed to fetch {}: {}",
                what, status
            )));
        }

        return Ok(Some(response.text().await?));
    }
}
