//! Metering service client
//!
//! Asynchronous client that reports resource usage to a metering service and
//! asks it for throttling decisions. Every call runs through a retry loop
//! driven by [`RetryConfig`] and ends with either a decoded result or exactly
//! one typed error: [`ClientError`] for failures without a usable response,
//! [`HttpError`] for responses outside the accepted success statuses.
//!
//! # Quick Start
//!
//! ```no_run
//! use metering_client::{
//!     AuthTokenMode, ClientOptions, Identity, MeteringServiceClient, RetryConfig, Usage,
//! };
//!
//! #[tokio::main]
//! async fn main() -> metering_client::Result<()> {
//!     let options = ClientOptions::builder("https://metering.example.com/v1")
//!         .auth(AuthTokenMode::EnvVar("METERING_TOKEN".into()))
//!         .retry(
//!             RetryConfig::builder()
//!                 .max_attempts(3)
//!                 .http_statuses([502, 503, 504])
//!                 .build(),
//!         )
//!         .build();
//!     let client = MeteringServiceClient::new(options)?;
//!
//!     let identity = Identity::new("main", "build", "bazel", "alice");
//!     client.put_usage(&identity, "compile", &Usage::with_utime(1500)).await?;
//!
//!     if client.get_throttling(&identity).await?.throttled {
//!         println!("slow down");
//!     }
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod auth;
pub mod core;
pub mod error;
pub mod http;
pub mod types;
mod client;

// Re-exports from auth module
pub use auth::{AuthError, AuthTokenLoader, AuthTokenMode, AuthTokenProvider};

// Re-exports from core module
pub use self::core::{ClientOptions, ClientOptionsBuilder};

// Re-exports from error module
pub use error::{ClientError, ErrorCode, HttpError, MeteringError, Result};

// Re-exports from http module
pub use http::{
    CircuitBreakerConfig, CircuitState, HttpRequest, HttpResponse, Outcome, ReqwestTransport,
    RetryConfig, RetryConfigBuilder, RetryDecision, Transport, TransportError,
    TransportErrorKind,
};

// Re-exports from types module
pub use types::{ComputingUsage, Identity, ThrottlingDecision, Usage};

// Re-exports from client module
pub use client::{MeteringServiceClient, SharedClient, SDK_VERSION};
