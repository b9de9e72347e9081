mod circuit_breaker;
mod executor;
pub mod retry;
mod transport;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, DEFAULT_CIRCUIT_BREAKER_RESET_TIMEOUT,
    DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
};
pub use executor::{is_success_status, RequestExecutor, ResponseEnvelope, SUCCESS_STATUSES};
pub use retry::{Outcome, RetryConfig, RetryConfigBuilder, RetryDecision};
pub use transport::{
    BoxFuture, HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError,
    TransportErrorKind,
};
