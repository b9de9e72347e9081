use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Method;
use std::sync::Arc;

use crate::auth::{AuthTokenLoader, AuthTokenProvider};
use crate::core::ClientOptions;
use crate::error::{ClientError, ErrorCode, Result};
use crate::http::{CircuitBreaker, ReqwestTransport, RequestExecutor, RetryConfig, Transport};
use crate::types::{Identity, PutUsageRequest, ThrottlingDecision, Usage};

/// SDK version.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Client for the metering service.
///
/// The client is cheap to share behind an [`Arc`]; concurrent calls reuse one
/// connection pool and never share retry state.
pub struct MeteringServiceClient {
    executor: RequestExecutor,
    token_provider: Option<Arc<dyn AuthTokenProvider>>,
    retry_config: RwLock<Arc<RetryConfig>>,
}

/// Shared client handle.
pub type SharedClient = Arc<MeteringServiceClient>;

impl MeteringServiceClient {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn new(options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let transport = ReqwestTransport::new(options.connect_timeout, &options.user_agent)?;
        Self::with_transport(options, Arc::new(transport))
    }

    /// Create a client that sends its requests through `transport`.
    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Self> {
        options.validate()?;
        let base_url = options.parsed_base_url()?;

        let mut executor = RequestExecutor::new(transport, base_url, options.timeout);
        if let Some(config) = options.circuit_breaker {
            executor = executor.with_circuit_breaker(CircuitBreaker::from_config(config));
        }

        let token_provider = options.auth.map(|mode| {
            let loader = AuthTokenLoader::new(mode);
            match options.auth_refresh_interval {
                Some(interval) => loader.with_refresh_interval(interval).into_provider(),
                None => loader.into_provider(),
            }
        });

        Ok(Self {
            executor,
            token_provider,
            retry_config: RwLock::new(Arc::new(options.retry)),
        })
    }

    /// Replace the auth token source.
    pub fn with_token_provider(mut self, provider: Arc<dyn AuthTokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// The retry configuration used by calls started from now on.
    pub fn retry_config(&self) -> Arc<RetryConfig> {
        Arc::clone(&self.retry_config.read())
    }

    /// Swap the retry configuration. Calls already in flight keep the old one.
    pub fn set_retry_config(&self, config: RetryConfig) -> Result<()> {
        config.validate()?;
        *self.retry_config.write() = Arc::new(config);
        Ok(())
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.executor.circuit_breaker()
    }

    /// Record the resources `operation_name` consumed on behalf of `identity`.
    pub async fn put_usage(
        &self,
        identity: &Identity,
        operation_name: &str,
        usage: &Usage,
    ) -> Result<()> {
        let url = self.executor.endpoint(&["usage", operation_name], &[]);
        let body = PutUsageRequest { identity, usage };
        let retry = self.retry_config();
        let headers = self.headers().await?;

        let response = self
            .executor
            .execute(Method::PUT, url, headers, Some(&body), &retry)
            .await?;

        tracing::debug!(
            "Usage recorded for operation {} (status {}, {} attempt(s))",
            operation_name,
            response.status,
            response.attempts
        );
        Ok(())
    }

    /// Ask the service whether `identity` is currently throttled.
    pub async fn get_throttling(&self, identity: &Identity) -> Result<ThrottlingDecision> {
        let url = self
            .executor
            .endpoint(&["throttling"], &identity.query_pairs());
        let retry = self.retry_config();
        let headers = self.headers().await?;

        let response = self
            .executor
            .execute::<()>(Method::GET, url, headers, None, &retry)
            .await?;

        response.json()
    }

    async fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        if let Some(provider) = &self.token_provider {
            let token = provider.get_token().await?;
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token)).map_err(|e| {
                ClientError::with_source(
                    ErrorCode::AuthTokenUnavailable,
                    "Auth token is not a valid header value",
                    e,
                )
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}
