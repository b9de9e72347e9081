use thiserror::Error;

use crate::auth::AuthError;
use crate::http::TransportErrorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Authentication errors
    AuthTokenUnavailable,

    // Configuration errors
    ConfigInvalidUrl,
    ConfigInvalidRetry,
    ConfigInvalidTimeout,

    // Network errors
    NetworkError,
    NetworkTimeout,
    NetworkConnect,

    // Request / response errors
    RequestEncodeFailed,
    HttpInvalidResponse,

    // Circuit breaker errors
    CircuitOpen,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AuthTokenUnavailable => "AUTH_TOKEN_UNAVAILABLE",
            ErrorCode::ConfigInvalidUrl => "CONFIG_INVALID_URL",
            ErrorCode::ConfigInvalidRetry => "CONFIG_INVALID_RETRY",
            ErrorCode::ConfigInvalidTimeout => "CONFIG_INVALID_TIMEOUT",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::NetworkTimeout => "NETWORK_TIMEOUT",
            ErrorCode::NetworkConnect => "NETWORK_CONNECT",
            ErrorCode::RequestEncodeFailed => "REQUEST_ENCODE_FAILED",
            ErrorCode::HttpInvalidResponse => "HTTP_INVALID_RESPONSE",
            ErrorCode::CircuitOpen => "CIRCUIT_OPEN",
        }
    }

    /// Whether this is a network-level failure.
    ///
    /// Informational only. Retries are driven by
    /// [`RetryConfig`](crate::RetryConfig) and nothing is retried by default.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ErrorCode::NetworkError | ErrorCode::NetworkTimeout | ErrorCode::NetworkConnect
        )
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ErrorCode::ConfigInvalidUrl
                | ErrorCode::ConfigInvalidRetry
                | ErrorCode::ConfigInvalidTimeout
        )
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failure raised before, or independently of, a well-formed HTTP response.
///
/// The underlying cause, when there is one, is kept in `source` and is
/// reachable through [`std::error::Error::source`].
#[derive(Error, Debug)]
#[error("[{code}] {message}")]
pub struct ClientError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ClientError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn config_error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(code, message)
    }

    /// Kind of the wrapped transport error, if the cause came from the transport.
    pub fn cause_kind(&self) -> Option<TransportErrorKind> {
        self.source
            .as_deref()
            .and_then(|source| source.downcast_ref::<crate::http::TransportError>())
            .map(|err| err.kind)
    }

    pub fn is_recoverable(&self) -> bool {
        self.code.is_recoverable()
    }
}

impl From<AuthError> for ClientError {
    fn from(error: AuthError) -> Self {
        Self::with_source(
            ErrorCode::AuthTokenUnavailable,
            "Failed to load auth token",
            error,
        )
    }
}

/// The service answered with a status outside the accepted success set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("HTTP {http_status}: {body}")]
pub struct HttpError {
    pub http_status: u16,
    /// Raw response text; empty if it could not be read.
    pub body: String,
}

impl HttpError {
    pub fn new(http_status: u16, body: impl Into<String>) -> Self {
        Self {
            http_status,
            body: body.into(),
        }
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.http_status)
    }
}

/// Every failure a logical call can end with.
#[derive(Error, Debug)]
pub enum MeteringError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Http(#[from] HttpError),
}

impl MeteringError {
    pub fn http_status(&self) -> Option<u16> {
        match self {
            MeteringError::Http(err) => Some(err.http_status),
            MeteringError::Client(_) => None,
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            MeteringError::Client(err) => Some(err.code),
            MeteringError::Http(_) => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self, MeteringError::Client(_))
    }

    pub fn is_http_error(&self) -> bool {
        matches!(self, MeteringError::Http(_))
    }
}

impl From<AuthError> for MeteringError {
    fn from(error: AuthError) -> Self {
        MeteringError::Client(error.into())
    }
}

pub type Result<T> = std::result::Result<T, MeteringError>;
