use metering_client::http::CircuitBreaker;
use metering_client::{CircuitState, ClientError, ErrorCode, HttpError, MeteringError};
use std::time::Duration;

#[test]
fn test_initial_state_is_closed() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));

    assert_eq!(breaker.state(), CircuitState::Closed);
    assert!(breaker.is_closed());
    assert!(!breaker.is_open());
    assert!(!breaker.is_half_open());
    assert!(breaker.can_execute());
    assert_eq!(breaker.failure_count(), 0);
}

#[test]
fn test_opens_after_threshold_failures() {
    let breaker = CircuitBreaker::new(3, Duration::from_secs(30));

    breaker.record_failure();
    breaker.record_failure();
    assert!(breaker.is_closed());
    assert_eq!(breaker.failure_count(), 2);

    breaker.record_failure();
    assert!(breaker.is_open());
    assert!(!breaker.can_execute());
}

#[test]
fn test_reset_returns_to_closed() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(30));

    breaker.record_failure();
    assert!(breaker.is_open());

    breaker.reset();

    assert!(breaker.is_closed());
    assert_eq!(breaker.failure_count(), 0);
    assert!(breaker.can_execute());
}

#[test]
fn test_half_open_after_timeout() {
    let breaker = CircuitBreaker::new(1, Duration::from_millis(50));

    breaker.record_failure();
    assert!(breaker.is_open());

    std::thread::sleep(Duration::from_millis(60));

    assert!(breaker.is_half_open());
    assert!(breaker.can_execute());
}

#[test]
fn test_closes_from_half_open_on_success() {
    let breaker = CircuitBreaker::new(1, Duration::from_millis(50));

    breaker.record_failure();
    std::thread::sleep(Duration::from_millis(60));
    assert!(breaker.is_half_open());

    breaker.record_success();

    assert!(breaker.is_closed());
}

#[tokio::test]
async fn test_execute_async_success() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));
    breaker.record_failure();

    let result = breaker.execute_async(|| async { Ok("async success") }).await;

    assert_eq!(result.unwrap(), "async success");
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn test_execute_async_when_open() {
    let breaker = CircuitBreaker::new(1, Duration::from_secs(30));
    breaker.record_failure();

    let result: Result<&str, _> = breaker.execute_async(|| async { Ok("value") }).await;

    assert_eq!(result.unwrap_err().code(), Some(ErrorCode::CircuitOpen));
}

#[tokio::test]
async fn test_transport_failures_count() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));

    let _: Result<(), MeteringError> = breaker
        .execute_async(|| async {
            Err(ClientError::new(ErrorCode::NetworkConnect, "refused").into())
        })
        .await;

    assert_eq!(breaker.failure_count(), 1);
}

#[tokio::test]
async fn test_auth_failures_do_not_count() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));
    breaker.record_failure();

    let _: Result<(), MeteringError> = breaker
        .execute_async(|| async {
            Err(ClientError::new(ErrorCode::AuthTokenUnavailable, "no token").into())
        })
        .await;

    assert_eq!(breaker.failure_count(), 1);
}

#[tokio::test]
async fn test_client_side_status_closes_circuit() {
    let breaker = CircuitBreaker::new(5, Duration::from_secs(30));
    breaker.record_failure();

    let _: Result<(), MeteringError> = breaker
        .execute_async(|| async { Err(HttpError::new(404, "").into()) })
        .await;

    assert_eq!(breaker.failure_count(), 0);
}
