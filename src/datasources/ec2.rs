//! AWS instance provider
//!
//! Talks to the EC2 Instance Metadata Service (IMDS). IMDSv2 tokens are
//! preferred; when no token can be obtained requests fall back to IMDSv1.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{CloudInstance, RetryPolicy, get_text, http_client};
use crate::ConfigureError;

/// EC2 metadata service base URL (link-local address)
const IMDS_BASE_URL: &str = "http://169.254.169.254";

/// IMDSv2 token TTL in seconds
const TOKEN_TTL_SECONDS: u32 = 21600;

const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";
const TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";

/// AWS EC2 instance
pub struct Ec2 {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl Ec2 {
    pub fn new() -> Result<Self, ConfigureError> {
        Self::with_base_url(IMDS_BASE_URL)
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

    /// Get an IMDSv2 token for authenticated requests
    async fn get_token(&self, policy: &RetryPolicy) -> Option<String> {
        let url = format!("{}/latest/api/token", self.base_url);
        let token = get_text(policy, "IMDSv2 token", || {
            self.client
                .put(&url)
                .header(TOKEN_TTL_HEADER, TOKEN_TTL_SECONDS.to_string())
        })
        .await
        .ok()
        .flatten()?;

        let token = token.trim().to_string();
        (!token.is_empty()).then_some(token)
    }

    /// Fetch a path below /latest/, with a token when IMDSv2 is available
    async fn fetch(&self, path: &str) -> Result<Option<String>, ConfigureError> {
        let url = format!("{}/latest/{}", self.base_url, path);
        let token = self.get_token(&self.retry).await;
        if token.is_none() {
            debug!("No IMDSv2 token, falling back to IMDSv1 for {}", path);
        }

        get_text(&self.retry, path, || {
            let request = self.client.get(&url);
            match &token {
                Some(token) => request.header(TOKEN_HEADER, token),
                None => request,
            }
        })
        .await
    }
}

#[async_trait]
impl CloudInstance for Ec2 {
    fn name(&self) -> &'static str {
        "AWS"
    }

    fn endpoint_snitch(&self) -> &'static str {
        "Ec2Snitch"
    }

    async fn is_available(&self) -> bool {
        self.get_token(&RetryPolicy::once()).await.is_some()
    }

    async fn private_ipv4(&self) -> Result<String, ConfigureError> {
        self.fetch("meta-data/local-ipv4").await?.ok_or_else(|| {
            ConfigureError::Datasource("EC2 metadata has no local-ipv4".to_string())
        })
    }

    async fn user_data(&self) -> Result<String, ConfigureError> {
        // 404 means no user-data configured
        Ok(self.fetch("user-data").await?.unwrap_or_default())
    }
}
