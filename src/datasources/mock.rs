//! Mock cloud instance for testing
//!
//! Provides a configurable provider that can be used in unit and
//! integration tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::CloudInstance;
use crate::ConfigureError;

/// Mock cloud instance for testing
///
/// # Example
/// ```
/// use scylla_configure::datasources::mock::MockCloudInstance;
///
/// let mock = MockCloudInstance::new()
///     .with_private_ip("10.0.0.7")
///     .with_user_data(r#"{"developer_mode": true}"#);
/// ```
pub struct MockCloudInstance {
    name: &'static str,
    snitch: &'static str,
    available: bool,
    private_ip: String,
    user_data: String,
    private_ip_error: Option<String>,
    user_data_error: Option<String>,
    private_ip_calls: AtomicUsize,
}

impl MockCloudInstance {
    /// Create a new mock instance with default values
    pub fn new() -> Self {
        Self {
            name: "Mock",
            snitch: "SimpleSnitch",
            available: true,
            private_ip: "127.0.0.1".to_string(),
            user_data: String::new(),
            private_ip_error: None,
            user_data_error: None,
            private_ip_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_snitch(mut self, snitch: &'static str) -> Self {
        self.snitch = snitch;
        self
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn with_private_ip(mut self, ip: &str) -> Self {
        self.private_ip = ip.to_string();
        self
    }

    pub fn with_user_data(mut self, user_data: &str) -> Self {
        self.user_data = user_data.to_string();
        self
    }

    /// Configure to return an error for the private IP
    pub fn with_private_ip_error(mut self, error: &str) -> Self {
        self.private_ip_error = Some(error.to_string());
        self
    }

    /// Configure to return an error for user-data
    pub fn with_user_data_error(mut self, error: &str) -> Self {
        self.user_data_error = Some(error.to_string());
        self
    }

    /// How many times the private IP was requested
    pub fn private_ip_calls(&self) -> usize {
        self.private_ip_calls.load(Ordering::SeqCst)
    }
}

impl Default for MockCloudInstance {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloudInstance for MockCloudInstance {
    fn name(&self) -> &'static str {
        self.name
    }

    fn endpoint_snitch(&self) -> &'static str {
        self.snitch
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    async fn private_ipv4(&self) -> Result<String, ConfigureError> {
        self.private_ip_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.private_ip_error {
            return Err(ConfigureError::Datasource(error.clone()));
        }
        Ok(self.private_ip.clone())
    }

    async fn user_data(&self) -> Result<String, ConfigureError> {
        if let Some(error) = &self.user_data_error {
            return Err(ConfigureError::Datasource(error.clone()));
        }
        Ok(self.user_data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_instance_default() {
        let mock = MockCloudInstance::new();

        assert_eq!(mock.name(), "Mock");
        assert!(mock.is_available().await);
        assert_eq!(mock.private_ipv4().await.unwrap(), "127.0.0.1");
        assert_eq!(mock.user_data().await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_mock_instance_counts_ip_requests() {
        let mock = MockCloudInstance::new().with_private_ip("10.1.2.3");

        mock.private_ipv4().await.unwrap();
        mock.private_ipv4().await.unwrap();
        assert_eq!(mock.private_ip_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_instance_errors() {
        let mock = MockCloudInstance::new()
            .with_private_ip_error("no route")
            .with_user_data_error("user-data fetch failed");

        assert!(mock.private_ipv4().await.is_err());
        let error = mock.user_data().await.unwrap_err();
        assert!(error.to_string().contains("user-data fetch failed"));
    }

    #[tokio::test]
    async fn test_mock_instance_unavailable() {
        let mock = MockCloudInstance::new().with_available(false);
        assert!(!mock.is_available().await);
    }
}
