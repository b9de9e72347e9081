use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ClientError, ErrorCode, MeteringError, Result};

pub const DEFAULT_CIRCUIT_BREAKER_THRESHOLD: u32 = 5;
pub const DEFAULT_CIRCUIT_BREAKER_RESET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed logical calls that open the circuit.
    pub failure_threshold: u32,
    /// How long the circuit stays open before letting a trial call through.
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_CIRCUIT_BREAKER_THRESHOLD,
            reset_timeout: DEFAULT_CIRCUIT_BREAKER_RESET_TIMEOUT,
        }
    }
}

struct BreakerState {
    state: CircuitState,
    failure_count: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
}

impl BreakerState {
    fn refresh(&mut self, reset_timeout: Duration) {
        if self.state == CircuitState::Open {
            if let Some(opened) = self.opened_at {
                if opened.elapsed() >= reset_timeout {
                    self.state = CircuitState::HalfOpen;
                }
            }
        }
    }
}

/// Clears the half-open trial slot when the trial call ends or is dropped.
struct TrialSlot<'a> {
    breaker: &'a CircuitBreaker,
    held: bool,
}

impl Drop for TrialSlot<'_> {
    fn drop(&mut self) {
        if self.held {
            self.breaker.inner.lock().trial_in_flight = false;
        }
    }
}

/// Guards logical calls against a service that keeps failing.
///
/// Only failures that say something about the service's health count:
/// transport failures and 5xx responses. A 4xx response means the service
/// is reachable and closes the circuit like a success does.
///
/// Once the reset timeout has passed the circuit is half-open and admits a
/// single trial call. Other calls are rejected until that trial finishes.
pub struct CircuitBreaker {
    inner: Mutex<BreakerState>,
    threshold: u32,
    reset_timeout: Duration,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
            threshold: threshold.max(1),
            reset_timeout,
        }
    }

    pub fn from_config(config: CircuitBreakerConfig) -> Self {
        Self::new(config.failure_threshold, config.reset_timeout)
    }

    pub fn state(&self) -> CircuitState {
        let mut inner = self.inner.lock();
        inner.refresh(self.reset_timeout);
        inner.state
    }

    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == CircuitState::Closed
    }

    pub fn is_half_open(&self) -> bool {
        self.state() == CircuitState::HalfOpen
    }

    pub fn failure_count(&self) -> u32 {
        self.inner.lock().failure_count
    }

    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock();
        inner.refresh(self.reset_timeout);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => !inner.trial_in_flight,
            CircuitState::Open => false,
        }
    }

    /// Claim permission for one call. `None` means the call must be rejected.
    fn admit(&self) -> Option<TrialSlot<'_>> {
        let mut inner = self.inner.lock();
        inner.refresh(self.reset_timeout);
        match inner.state {
            CircuitState::Closed => Some(TrialSlot {
                breaker: self,
                held: false,
            }),
            CircuitState::HalfOpen if !inner.trial_in_flight => {
                inner.trial_in_flight = true;
                Some(TrialSlot {
                    breaker: self,
                    held: true,
                })
            }
            _ => None,
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count = 0;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock();
        inner.failure_count += 1;

        if inner.state == CircuitState::HalfOpen || inner.failure_count >= self.threshold {
            if inner.state != CircuitState::Open {
                tracing::warn!(
                    "Circuit breaker opened after {} consecutive failures",
                    inner.failure_count
                );
            }
            inner.state = CircuitState::Open;
            inner.opened_at = Some(Instant::now());
        }
    }

    pub fn reset(&self) {
        self.record_success();
    }

    pub async fn execute_async<T, F, Fut>(&self, action: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let Some(slot) = self.admit() else {
            return Err(ClientError::new(ErrorCode::CircuitOpen, "Circuit breaker is open").into());
        };

        let result = action().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(MeteringError::Http(err)) if !err.is_server_error() => self.record_success(),
            Err(e) if counts_as_failure(e) => self.record_failure(),
            Err(_) => {}
        }
        drop(slot);
        result
    }
}

fn counts_as_failure(error: &MeteringError) -> bool {
    match error {
        MeteringError::Http(err) => err.is_server_error(),
        MeteringError::Client(err) => !matches!(
            err.code,
            ErrorCode::CircuitOpen
                | ErrorCode::RequestEncodeFailed
                | ErrorCode::AuthTokenUnavailable
        ),
    }
}
