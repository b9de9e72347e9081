use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::HeaderMap;
use reqwest::{Client, Method, Url};
use thiserror::Error;

use crate::error::{ClientError, ErrorCode};

/// Boxed future returned by the crate's pluggable async collaborators.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Classification of a failure raised by the transport before a response was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Body,
    Redirect,
    Other,
}

impl TransportErrorKind {
    /// The [`ErrorCode`] a terminal failure of this kind is reported with.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            TransportErrorKind::Timeout => ErrorCode::NetworkTimeout,
            TransportErrorKind::Connect => ErrorCode::NetworkConnect,
            _ => ErrorCode::NetworkError,
        }
    }
}

#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        kind: TransportErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            TransportErrorKind::Timeout,
            format!("no response within {:?}", after),
        )
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let kind = if error.is_timeout() {
            TransportErrorKind::Timeout
        } else if error.is_connect() {
            TransportErrorKind::Connect
        } else if error.is_redirect() {
            TransportErrorKind::Redirect
        } else if error.is_body() || error.is_decode() {
            TransportErrorKind::Body
        } else if error.is_request() || error.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        TransportError::with_source(kind, error.to_string(), error)
    }
}

/// One physical request, ready to be sent as many times as the retry loop needs.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Response text; `None` if it could not be read or was not valid text.
    pub body: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Some(body.into()),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            body: Some(String::new()),
        }
    }
}

/// Sends physical requests. Shared by all in-flight logical calls of a client.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>>;
}

/// [`Transport`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(connect_timeout: Duration, user_agent: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                ClientError::with_source(ErrorCode::NetworkError, "Failed to create HTTP client", e)
            })?;
        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method, request.url)
                .headers(request.headers);
            if let Some(body) = request.body {
                builder = builder.body(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.text().await.ok();

            Ok(HttpResponse { status, body })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_for_kinds() {
        assert_eq!(TransportErrorKind::Timeout.error_code(), ErrorCode::NetworkTimeout);
        assert_eq!(TransportErrorKind::Connect.error_code(), ErrorCode::NetworkConnect);
        assert_eq!(TransportErrorKind::Body.error_code(), ErrorCode::NetworkError);
        assert_eq!(TransportErrorKind::Other.error_code(), ErrorCode::NetworkError);
    }

    #[test]
    fn test_timeout_error() {
        let error = TransportError::timeout(Duration::from_secs(2));
        assert_eq!(error.kind, TransportErrorKind::Timeout);
        assert_eq!(error.to_string(), "no response within 2s");
    }

    #[test]
    fn test_http_response_constructors() {
        assert_eq!(HttpResponse::empty(204).body.as_deref(), Some(""));
        assert_eq!(HttpResponse::new(200, "{}").status, 200);
    }

    #[tokio::test]
    async fn test_reqwest_transport_connect_failure_is_classified() {
        let transport = ReqwestTransport::new(Duration::from_secs(1), "test").unwrap();
        let request = HttpRequest {
            method: Method::GET,
            // Port 9 (discard) on localhost is closed in test environments.
            url: Url::parse("http://127.0.0.1:9/throttling").unwrap(),
            headers: HeaderMap::new(),
            body: None,
        };

        let error = transport.send(request).await.unwrap_err();
        assert_eq!(error.kind, TransportErrorKind::Connect);
    }
}
