#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use metering_client::http::BoxFuture;
use metering_client::{
    ClientOptions, HttpRequest, HttpResponse, Identity, MeteringServiceClient, RetryConfig,
    Transport, TransportError, TransportErrorKind,
};
use parking_lot::Mutex;

pub const BASE_URL: &str = "http://metering.test/v1";

/// What the fake transport does for one physical attempt.
#[derive(Debug, Clone)]
pub enum Step {
    Respond(u16, &'static str),
    Unreadable(u16),
    Fail(TransportErrorKind),
    Hang,
}

/// Transport that plays back a scripted sequence of outcomes.
///
/// Once the script runs out, `repeat` (if set) is used for every further call.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Step>,
    calls: AtomicU32,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(steps.into_iter().collect()),
            repeat: None,
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn always(step: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            repeat: Some(step),
            calls: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }

    fn next_step(&self) -> Step {
        self.script
            .lock()
            .pop_front()
            .or_else(|| self.repeat.clone())
            .expect("transport called more often than scripted")
    }
}

impl Transport for ScriptedTransport {
    fn send(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        let step = self.next_step();

        Box::pin(async move {
            match step {
                Step::Respond(status, body) => Ok(HttpResponse::new(status, body)),
                Step::Unreadable(status) => Ok(HttpResponse { status, body: None }),
                Step::Fail(kind) => Err(TransportError::new(kind, format!("{:?} failure", kind))),
                Step::Hang => std::future::pending().await,
            }
        })
    }
}

pub fn identity() -> Identity {
    Identity::new("main", "build", "bazel", "alice")
}

pub fn retry_on(statuses: impl IntoIterator<Item = u16>) -> RetryConfig {
    RetryConfig::builder()
        .max_attempts(3)
        .multiplier(0.0)
        .http_statuses(statuses)
        .build()
}

pub fn client_with(
    transport: &Arc<ScriptedTransport>,
    retry: RetryConfig,
) -> MeteringServiceClient {
    let options = ClientOptions::builder(BASE_URL).retry(retry).build();
    MeteringServiceClient::with_transport(options, transport.clone()).expect("valid options")
}
