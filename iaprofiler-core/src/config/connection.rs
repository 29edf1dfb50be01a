//! Catalog connection configuration.
//!
//! `ConnectionConfig` replaces process-wide connection state: every transport
//! is built from one explicitly, so tests and tools can talk to several
//! catalogs side by side.

use crate::transport::{NoRetry, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;

/// Configuration for reaching the catalog services.
///
/// # Security
/// This struct does NOT store passwords. Credentials are handled by
/// [`crate::security::Credentials`] and never logged or displayed.
///
/// # Example
/// ```rust
/// use iaprofiler_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("ia.example.com".to_string())
///     .with_port(9445)
///     .with_max_connections(2);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.base_url(), "https://ia.example.com:9445");
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Catalog services host
    pub host: String,
    /// HTTPS port
    pub port: u16,
    /// Accept self-signed or otherwise unverifiable TLS certificates
    pub accept_invalid_certs: bool,
    /// Maximum number of concurrent in-flight requests
    pub max_connections: usize,
    /// TCP/TLS connect timeout
    pub connect_timeout: Duration,
    /// Whole-request timeout; `None` leaves requests unbounded
    pub request_timeout: Option<Duration>,
    /// Strategy applied to failed requests
    pub retry_policy: Arc<dyn RetryPolicy>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: crate::security::DEFAULT_PORT,
            accept_invalid_certs: true,
            max_connections: 1,
            connect_timeout: Duration::from_secs(30),
            request_timeout: None,
            retry_policy: Arc::new(NoRetry),
        }
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConnectionConfig({}:{})", self.host, self.port)
    }
}

impl ConnectionConfig {
    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if configuration values are invalid or unsafe
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::error::ProfilerError::configuration(
                "host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::ProfilerError::configuration(
                "port must be greater than 0",
            ));
        }

        if self.max_connections == 0 {
            return Err(crate::error::ProfilerError::configuration(
                "max_connections must be greater than 0",
            ));
        }

        if self.max_connections > 32 {
            return Err(crate::error::ProfilerError::configuration(
                "max_connections should not exceed 32; the catalog throttles concurrent sessions",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(crate::error::ProfilerError::configuration(
                "connect_timeout must be greater than 0",
            ));
        }

        if self.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(crate::error::ProfilerError::configuration(
                "request_timeout must be greater than 0 when set",
            ));
        }

        Ok(())
    }

    /// Creates a new connection config with defaults.
    pub fn new(host: String) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Creates a config from a parsed server address.
    pub fn from_address(address: &crate::security::ServerAddress) -> Self {
        Self::new(address.host.clone()).with_port(address.port)
    }

    /// Base URL all request paths are appended to.
    pub fn base_url(&self) -> String {
        if self.host.contains(':') {
            format!("https://[{}]:{}", self.host, self.port)
        } else {
            format!("https://{}:{}", self.host, self.port)
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to toggle TLS certificate verification.
    pub fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Builder method to set the concurrent request cap.
    pub fn with_max_connections(mut self, max_connections: usize) -> Self {
        self.max_connections = max_connections;
        self
    }

    /// Builder method to set a whole-request timeout.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Builder method to install a retry policy.
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.retry_policy = policy;
        self
    }
}
