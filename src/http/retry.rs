//! Retry policy with capped exponential backoff.
//!
//! The policy is a pure decision over the attempt number and the outcome of
//! that attempt. Nothing is retried unless the configuration opts in to it
//! through `http_statuses`, `exception_types` or `cause_exception_types`.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::{ClientError, ErrorCode};
use crate::http::TransportErrorKind;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts per logical call, including the first. Default: 3
    pub max_attempts: u32,

    /// Base backoff delay in seconds. `0.0` disables sleeping. Default: 1.0
    pub multiplier: f64,

    /// Upper bound for a single backoff delay. Default: 30s
    pub max_delay: Duration,

    /// Maximum random jitter added to a non-zero delay. Default: none
    pub jitter: Duration,

    /// HTTP status codes that trigger a retry.
    pub http_statuses: HashSet<u16>,

    /// Locally raised failure kinds that trigger a retry.
    pub exception_types: HashSet<ErrorCode>,

    /// Underlying transport failure kinds that trigger a retry.
    pub cause_exception_types: HashSet<TransportErrorKind>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: Duration::ZERO,
            http_statuses: HashSet::new(),
            exception_types: HashSet::new(),
            cause_exception_types: HashSet::new(),
        }
    }
}

/// What a single physical attempt ended with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    HttpFailure(u16),
    ClientFailure {
        code: ErrorCode,
        cause: Option<TransportErrorKind>,
    },
}

impl Outcome {
    pub fn from_client_error(error: &ClientError) -> Self {
        Outcome::ClientFailure {
            code: error.code,
            cause: error.cause_kind(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Stop,
}

impl RetryDecision {
    pub fn is_retry(&self) -> bool {
        matches!(self, RetryDecision::Retry(_))
    }
}

impl RetryConfig {
    /// Create a new retry configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder for custom configuration.
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::default()
    }

    /// A configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ClientError> {
        if self.max_attempts == 0 {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidRetry,
                "max_attempts must be at least 1",
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(ClientError::config_error(
                ErrorCode::ConfigInvalidRetry,
                "multiplier must be a finite, non-negative number",
            ));
        }
        Ok(())
    }

    /// Whether the outcome belongs to one of the retryable sets.
    pub fn is_retryable(&self, outcome: &Outcome) -> bool {
        match outcome {
            Outcome::Success => false,
            Outcome::HttpFailure(status) => self.http_statuses.contains(status),
            Outcome::ClientFailure { code, cause } => {
                self.exception_types.contains(code)
                    || cause.map_or(false, |kind| self.cause_exception_types.contains(&kind))
            }
        }
    }

    /// Decide what to do after attempt number `attempt` (1-based) ended with `outcome`.
    pub fn decide(&self, attempt: u32, outcome: &Outcome) -> RetryDecision {
        if attempt < self.max_attempts && self.is_retryable(outcome) {
            RetryDecision::Retry(self.calculate_delay(attempt))
        } else {
            RetryDecision::Stop
        }
    }

    /// Calculate the backoff delay after a given attempt number.
    ///
    /// Uses capped exponential backoff: min(multiplier * 2^(attempt - 1), max_delay),
    /// plus up to `jitter` of random delay when the result is non-zero.
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.multiplier <= 0.0 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 1).min(i32::MAX as u32) as i32;
        let exponential = self.multiplier * 2f64.powi(exponent);
        let base = if exponential >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::try_from_secs_f64(exponential).unwrap_or(self.max_delay)
        };

        if base.is_zero() || self.jitter.is_zero() {
            return base;
        }

        let jitter = self.jitter.mul_f64(rand::random::<f64>());
        base.checked_add(jitter).unwrap_or(Duration::MAX)
    }
}

/// Builder for RetryConfig.
#[derive(Debug, Default)]
pub struct RetryConfigBuilder {
    config: RetryConfig,
}

impl RetryConfigBuilder {
    /// Set total attempts per logical call.
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the base backoff delay in seconds.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.config.multiplier = multiplier;
        self
    }

    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.config.max_delay = delay;
        self
    }

    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Retry on these HTTP status codes.
    pub fn http_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.config.http_statuses.extend(statuses);
        self
    }

    /// Retry on these locally raised failure kinds.
    pub fn exception_types(mut self, codes: impl IntoIterator<Item = ErrorCode>) -> Self {
        self.config.exception_types.extend(codes);
        self
    }

    /// Retry when the underlying transport failure is one of these kinds.
    pub fn cause_exception_types(
        mut self,
        kinds: impl IntoIterator<Item = TransportErrorKind>,
    ) -> Self {
        self.config.cause_exception_types.extend(kinds);
        self
    }

    /// Build the configuration.
    pub fn build(self) -> RetryConfig {
        self.config
    }
}
