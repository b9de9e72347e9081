//! Runs one logical HTTP call as a sequence of physical attempts.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::{de::DeserializeOwned, Serialize};
use tokio::time::{sleep, timeout};

use super::circuit_breaker::CircuitBreaker;
use super::retry::{Outcome, RetryConfig, RetryDecision};
use super::transport::{HttpRequest, HttpResponse, Transport, TransportError, TransportErrorKind};
use crate::error::{ClientError, ErrorCode, HttpError, MeteringError, Result};

/// Status codes accepted as success.
pub const SUCCESS_STATUSES: [u16; 4] = [200, 201, 202, 204];

pub fn is_success_status(status: u16) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// A successful response together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEnvelope {
    pub status: u16,
    pub body: Option<String>,
    pub attempts: u32,
}

impl ResponseEnvelope {
    /// Decode the body as JSON into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        let body = self.body.as_deref().ok_or_else(|| {
            ClientError::new(
                ErrorCode::HttpInvalidResponse,
                "Response body could not be read",
            )
        })?;

        serde_json::from_str(body).map_err(|e| {
            ClientError::with_source(
                ErrorCode::HttpInvalidResponse,
                format!("Failed to parse response: {}", e),
                e,
            )
            .into()
        })
    }
}

pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
    base_url: Url,
    attempt_timeout: Duration,
    circuit_breaker: Option<CircuitBreaker>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>, base_url: Url, attempt_timeout: Duration) -> Self {
        Self {
            transport,
            base_url,
            attempt_timeout,
            circuit_breaker: None,
        }
    }

    pub fn with_circuit_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.circuit_breaker = Some(breaker);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker> {
        self.circuit_breaker.as_ref()
    }

    /// Resolve `segments` below the base URL. Each segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    /// Execute a logical call, retrying according to `retry`.
    ///
    /// Returns the first accepted response. Otherwise returns the failure
    /// observed on the last attempt made.
    pub async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        url: Url,
        mut headers: HeaderMap,
        json_body: Option<&B>,
        retry: &RetryConfig,
    ) -> Result<ResponseEnvelope> {
        let body = match json_body {
            Some(value) => {
                let bytes = serde_json::to_vec(value).map_err(|e| {
                    ClientError::with_source(
                        ErrorCode::RequestEncodeFailed,
                        "Failed to encode request body",
                        e,
                    )
                })?;
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                Some(bytes)
            }
            None => None,
        };
        headers
            .entry(ACCEPT)
            .or_insert_with(|| HeaderValue::from_static("application/json"));

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        match &self.circuit_breaker {
            Some(breaker) => {
                breaker
                    .execute_async(|| self.run_attempts(&request, retry))
                    .await
            }
            None => self.run_attempts(&request, retry).await,
        }
    }

    async fn run_attempts(
        &self,
        request: &HttpRequest,
        retry: &RetryConfig,
    ) -> Result<ResponseEnvelope> {
        let mut attempt = 1;

        loop {
            tracing::debug!(
                "{} {} (attempt {} of {})",
                request.method,
                request.url,
                attempt,
                retry.max_attempts
            );

            let (outcome, failure) = match self.send_once(request.clone()).await {
                Ok(response) if is_success_status(response.status) => {
                    return Ok(ResponseEnvelope {
                        status: response.status,
                        body: response.body,
                        attempts: attempt,
                    });
                }
                Ok(HttpResponse { status, body }) => (
                    Outcome::HttpFailure(status),
                    MeteringError::from(HttpError::new(status, body.unwrap_or_default())),
                ),
                Err(error) => {
                    let error = convert_error(error);
                    (Outcome::from_client_error(&error), MeteringError::from(error))
                }
            };

            match retry.decide(attempt, &outcome) {
                RetryDecision::Retry(delay) => {
                    tracing::debug!(
                        "Retry attempt {} of {} failed ({}), waiting {:?}",
                        attempt,
                        retry.max_attempts,
                        failure,
                        delay
                    );
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    attempt += 1;
                }
                RetryDecision::Stop => {
                    tracing::warn!(
                        "{} {} failed after {} attempt(s): {}",
                        request.method,
                        request.url,
                        attempt,
                        failure
                    );
                    return Err(failure);
                }
            }
        }
    }

    async fn send_once(
        &self,
        request: HttpRequest,
    ) -> std::result::Result<HttpResponse, TransportError> {
        match timeout(self.attempt_timeout, self.transport.send(request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::timeout(self.attempt_timeout)),
        }
    }
}

fn convert_error(error: TransportError) -> ClientError {
    let code = error.kind.error_code();
    let message = match error.kind {
        TransportErrorKind::Timeout => "Request timed out".to_string(),
        TransportErrorKind::Connect => "Connection failed".to_string(),
        _ => format!("Request failed: {}", error.message),
    };
    ClientError::with_source(code, message, error)
}
