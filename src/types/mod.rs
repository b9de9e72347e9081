//! Payloads exchanged with the metering service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies the caller whose usage is recorded or throttled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub instance: String,
    pub workflow: String,
    pub actor: String,
    pub subject: String,
}

impl Identity {
    pub fn new(
        instance: impl Into<String>,
        workflow: impl Into<String>,
        actor: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            instance: instance.into(),
            workflow: workflow.into(),
            actor: actor.into(),
            subject: subject.into(),
        }
    }

    /// Query parameters in the order the service documents them.
    pub fn query_pairs(&self) -> [(&'static str, &str); 4] {
        [
            ("instance", self.instance.as_str()),
            ("workflow", self.workflow.as_str()),
            ("actor", self.actor.as_str()),
            ("subject", self.subject.as_str()),
        ]
    }
}

/// Compute resources consumed by an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputingUsage {
    /// User CPU time, in microseconds.
    pub utime: i64,
    /// System CPU time, in microseconds.
    pub stime: i64,
    /// Peak resident set size, in kilobytes.
    pub maxrss: i64,
    pub inblock: i64,
    pub oublock: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub computing: ComputingUsage,
}

impl Usage {
    pub fn new(computing: ComputingUsage) -> Self {
        Self { computing }
    }

    /// Usage consisting only of user CPU time.
    pub fn with_utime(utime: i64) -> Self {
        Self {
            computing: ComputingUsage {
                utime,
                ..ComputingUsage::default()
            },
        }
    }
}

/// Request body of `PUT /usage/{operation}`.
#[derive(Debug, Serialize)]
pub(crate) struct PutUsageRequest<'a> {
    pub identity: &'a Identity,
    pub usage: &'a Usage,
}

/// The service's verdict on whether an identity should be rate-limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottlingDecision {
    pub throttled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracked_usage: Option<Usage>,
}

impl ThrottlingDecision {
    pub fn new(throttled: bool) -> Self {
        Self {
            throttled,
            tracked_time: None,
            tracked_usage: None,
        }
    }
}
