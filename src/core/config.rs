use std::time::Duration;

use reqwest::Url;

use crate::auth::AuthTokenMode;
use crate::error::{ClientError, ErrorCode};
use crate::http::{CircuitBreakerConfig, RetryConfig};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_USER_AGENT: &str = concat!("metering-client-rust/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub auth: Option<AuthTokenMode>,
    /// How long a loaded auth token is reused. `None` reloads it for every call.
    pub auth_refresh_interval: Option<Duration>,
    /// Deadline for a single physical attempt.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub retry: RetryConfig,
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth: None,
            auth_refresh_interval: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryConfig::default(),
            circuit_breaker: None,
        }
    }

    pub fn builder(base_url: impl Into<String>) -> ClientOptionsBuilder {
        ClientOptionsBuilder::new(base_url)
    }

    /// Parse the base URL, which must be an absolute http(s) URL.
    pub fn parsed_base_url(&self) -> Result<Url, ClientError> {
        let url = Url::parse(&self.base_url).map_err(|e| {
            ClientError::with_source(
                ErrorCode::ConfigInvalidUrl,
                format!("Invalid base URL: {}", self.base_url),
                e,
            )
        })?;

        if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidUrl,
                format!("Base URL must be an http(s) URL: {}", self.base_url),
            ));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidUrl,
                "Base URL must not carry a query or fragment",
            ));
        }

        Ok(url)
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        self.parsed_base_url()?;

        if self.timeout.is_zero() {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidTimeout,
                "Timeout must be positive",
            ));
        }

        if self.connect_timeout.is_zero() {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidTimeout,
                "Connect timeout must be positive",
            ));
        }

        self.retry.validate()
    }
}

pub struct ClientOptionsBuilder {
    options: ClientOptions,
}

impl ClientOptionsBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            options: ClientOptions::new(base_url),
        }
    }

    pub fn auth(mut self, mode: AuthTokenMode) -> Self {
        self.options.auth = Some(mode);
        self
    }

    pub fn auth_refresh_interval(mut self, interval: Duration) -> Self {
        self.options.auth_refresh_interval = Some(interval);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.options.user_agent = user_agent.into();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.options.retry = retry;
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.options.circuit_breaker = Some(config);
        self
    }

    pub fn build(self) -> ClientOptions {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::new("https://metering.example.com");
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.connect_timeout, Duration::from_secs(5));
        assert!(options.auth.is_none());
        assert!(options.circuit_breaker.is_none());
        assert!(options.user_agent.starts_with("metering-client-rust/"));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_url() {
        let options = ClientOptions::new("metering.example.com/api");
        let error = options.validate().unwrap_err();
        assert_eq!(error.code, ErrorCode::ConfigInvalidUrl);
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let options = ClientOptions::new("ftp://metering.example.com");
        assert_eq!(options.validate().unwrap_err().code, ErrorCode::ConfigInvalidUrl);

        let options = ClientOptions::new("mailto:ops@example.com");
        assert_eq!(options.validate().unwrap_err().code, ErrorCode::ConfigInvalidUrl);
    }

    #[test]
    fn test_rejects_query_in_base_url() {
        let options = ClientOptions::new("https://metering.example.com/?x=1");
        assert_eq!(options.validate().unwrap_err().code, ErrorCode::ConfigInvalidUrl);
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let options = ClientOptions::builder("https://metering.example.com")
            .timeout(Duration::ZERO)
            .build();
        assert_eq!(options.validate().unwrap_err().code, ErrorCode::ConfigInvalidTimeout);
    }

    #[test]
    fn test_rejects_invalid_retry() {
        let options = ClientOptions::builder("https://metering.example.com")
            .retry(RetryConfig::builder().max_attempts(0).build())
            .build();
        assert_eq!(options.validate().unwrap_err().code, ErrorCode::ConfigInvalidRetry);
    }
}
