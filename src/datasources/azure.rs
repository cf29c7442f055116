//! Azure instance provider
//!
//! Fetches metadata from Azure Instance Metadata Service (IMDS).
//! <https://docs.microsoft.com/en-us/azure/virtual-machines/linux/instance-metadata-service>

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use reqwest::Client;

use super::{CloudInstance, RetryPolicy, get_text, http_client};
use crate::ConfigureError;

/// Azure IMDS instance URL (link-local address)
const AZURE_IMDS_URL: &str = "http://169.254.169.254/metadata/instance";

/// API version for Azure IMDS
const AZURE_API_VERSION: &str = "2021-01-01";

/// Azure virtual machine
pub struct Azure {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Azure {
    pub fn new() -> Result<Self, ConfigureError> {
        Self::with_base_url(AZURE_IMDS_URL)
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

    /// Fetch a metadata path as plain text
    async fn fetch(
        &self,
        path: &str,
        policy: &RetryPolicy,
    ) -> Result<Option<String>, ConfigureError> {
        let url = format!(
            "{}{}?api-version={}&format=text",
            self.base_url, path, AZURE_API_VERSION
        );
        get_text(policy, path, || self.client.get(&url).header("Metadata", "True")).await
    }
}

#[async_trait]
impl CloudInstance for Azure {
    fn name(&self) -> &'static str {
        "Azure"
    }

    fn endpoint_snitch(&self) -> &'static str {
        "AzureSnitch"
    }

    async fn is_available(&self) -> bool {
        let policy = RetryPolicy {
            attempts: 2,
            interval: std::time::Duration::from_secs(1),
            ..RetryPolicy::default()
        };
        matches!(self.fetch("", &policy).await, Ok(Some(_)))
    }

    async fn private_ipv4(&self) -> Result<String, ConfigureError> {
        self.fetch("/network/interface/0/ipv4/ipAddress/0/privateIpAddress", &self.retry)
            .await?
            .ok_or_else(|| {
                ConfigureError::Datasource("Azure metadata has no private IP address".to_string())
            })
    }

    async fn user_data(&self) -> Result<String, ConfigureError> {
        let encoded = self
            .fetch("/compute/userData", &self.retry)
            .await?
            .unwrap_or_default();
        decode_user_data(&encoded)
    }
}

/// Azure hands out user-data base64 encoded
fn decode_user_data(encoded: &str) -> Result<String, ConfigureError> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Ok(String::new());
    }

    let decoded = BASE64.decode(encoded)?;
    String::from_utf8(decoded)
        .map_err(|e| ConfigureError::InvalidData(format!("Azure user-data is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_azure_default() {
        let azure = Azure::new().unwrap();
        assert_eq!(azure.name(), "Azure");
        assert_eq!(azure.endpoint_snitch(), "AzureSnitch");
        assert_eq!(azure.base_url, AZURE_IMDS_URL);
    }

    #[test]
    fn test_decode_user_data() {
        let encoded = BASE64.encode(r#"{"developer_mode": true}"#);
        assert_eq!(
            decode_user_data(&encoded).unwrap(),
            r#"{"developer_mode": true}"#
        );
    }

    #[test]
    fn test_decode_empty_user_data() {
        assert_eq!(decode_user_data("").unwrap(), "");
        assert_eq!(decode_user_data("\n").unwrap(), "");
    }

    #[test]
    fn test_decode_invalid_user_data() {
        assert!(matches!(
            decode_user_data("not base64!"),
            Err(ConfigureError::Base64(_))
        ));
    }
}
