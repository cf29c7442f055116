//! GCP instance provider
//!
//! Fetches metadata from the GCE metadata server.
//! <https://cloud.google.com/compute/docs/metadata/overview>

use async_trait::async_trait;
use reqwest::Client;

use super::{CloudInstance, RetryPolicy, get_text, http_client};
use crate::ConfigureError;

/// GCE instance metadata base URL
const GCE_METADATA_URL: &str = "http://metadata.google.internal/computeMetadata/v1/instance";

/// Required header for GCE metadata requests
const METADATA_FLAVOR_HEADER: &str = "Metadata-Flavor";
const METADATA_FLAVOR_VALUE: &str = "Google";

/// Google Compute Engine instance
pub struct Gce {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Gce {
    pub fn new() -> Result<Self, ConfigureError> {
        Self::with_base_url(GCE_METADATA_URL)
    }

    /// Create with a custom base URL (for testing)
    pub fn with_base_url(base_url: &str) -> Result<Self, ConfigureError> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Fetch an instance metadata path with the required Metadata-Flavor header
    async fn fetch(
        &self,
        path: &str,
        policy: &RetryPolicy,
    ) -> Result<Option<String>, ConfigureError> {
        let url = format!("{}/{}?recursive=false", self.base_url, path);
        get_text(policy, path, || {
            self.client
                .get(&url)
                .header(METADATA_FLAVOR_HEADER, METADATA_FLAVOR_VALUE)
        })
        .await
    }
}

#[async_trait]
impl CloudInstance for Gce {
    fn name(&self) -> &'static str {
        "GCP"
    }

    fn endpoint_snitch(&self) -> &'static str {
        "GoogleCloudSnitch"
    }

    async fn is_available(&self) -> bool {
        // GKE nodes resolve the metadata server too but have no machine-type
        matches!(
            self.fetch("machine-type", &RetryPolicy::once()).await,
            Ok(Some(_))
        )
    }

    async fn private_ipv4(&self) -> Result<String, ConfigureError> {
        self.fetch("network-interfaces/0/ip", &self.retry)
            .await?
            .ok_or_else(|| {
                ConfigureError::Datasource("GCE metadata has no network interface IP".to_string())
            })
    }

    async fn user_data(&self) -> Result<String, ConfigureError> {
        Ok(self
            .fetch("attributes/user-data", &self.retry)
            .await?
            .unwrap_or_default())
    }
}
