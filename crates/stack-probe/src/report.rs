use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::service::ServiceCheck;

/// Result of probing a single service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Outcome {
    /// A response arrived and the status policy accepted it.
    Healthy {
        status: u16,
        #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
        elapsed: Duration,
    },
    /// A response arrived but the status policy refused it.
    Rejected {
        status: u16,
        #[serde(rename = "elapsed_ms", serialize_with = "as_millis")]
        elapsed: Duration,
    },
    /// No response: connection refused, timeout or transport error.
    Unreachable { error: String },
}

impl Outcome {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Outcome::Healthy { .. })
    }

    /// Time to response, when one was delivered.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            Outcome::Healthy { elapsed, .. } | Outcome::Rejected { elapsed, .. } => Some(*elapsed),
            Outcome::Unreachable { .. } => None,
        }
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub service: ServiceCheck,
    pub outcome: Outcome,
}

/// Aggregate of one prober pass, in configured service order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    checks: Vec<CheckResult>,
    all_healthy: bool,
}

impl ReadinessReport {
    /// Fold probe results into a report. An empty input is vacuously healthy.
    pub fn from_results(results: impl IntoIterator<Item = CheckResult>) -> Self {
        results.into_iter().fold(
            Self {
                checks: Vec::new(),
                all_healthy: true,
            },
            |mut report, result| {
                report.all_healthy &= result.outcome.is_healthy();
                report.checks.push(result);
                report
            },
        )
    }

    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    pub fn all_healthy(&self) -> bool {
        self.all_healthy
    }

    /// Services that failed, in configured order.
    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.checks.iter().filter(|c| !c.outcome.is_healthy())
    }

    pub fn healthy_count(&self) -> usize {
        self.checks.iter().filter(|c| c.outcome.is_healthy()).count()
    }
}
