use futures::StreamExt;
use futures::future::join_all;
use futures::stream;
use tracing::debug;

use crate::health::HealthCheck;
use crate::policy::StatusPolicy;
use crate::report::{CheckResult, Outcome, ReadinessReport};
use crate::service::ServiceCheck;

/// How the prober schedules its probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProbeMode {
    /// One probe after another; total time is the sum of probe times.
    #[default]
    Sequential,
    /// All probes in flight at once, joined before reporting.
    Concurrent,
}

/// Probes every configured service exactly once and folds the outcomes
/// into a [`ReadinessReport`].
///
/// Probe failures never escape as errors; they are recorded as
/// [`Outcome::Unreachable`] or [`Outcome::Rejected`].
#[derive(Debug, Clone)]
pub struct Prober<C> {
    checker: C,
    policy: StatusPolicy,
    mode: ProbeMode,
}

impl<C: HealthCheck> Prober<C> {
    pub fn new(checker: C) -> Self {
        Self {
            checker,
            policy: StatusPolicy::default(),
            mode: ProbeMode::default(),
        }
    }

    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_mode(mut self, mode: ProbeMode) -> Self {
        self.mode = mode;
        self
    }

    pub async fn run(&self, services: &[ServiceCheck]) -> ReadinessReport {
        let results: Vec<CheckResult> = match self.mode {
            ProbeMode::Sequential => {
                stream::iter(services)
                    .then(|service| self.check(service))
                    .collect()
                    .await
            }
            ProbeMode::Concurrent => join_all(services.iter().map(|s| self.check(s))).await,
        };
        ReadinessReport::from_results(results)
    }

    async fn check(&self, service: &ServiceCheck) -> CheckResult {
        let outcome = match self.checker.probe(service).await {
            Ok(resp) if self.policy.accepts(resp.status) => {
                debug!(
                    service = service.name(),
                    status = resp.status,
                    elapsed = ?resp.elapsed,
                    "service responded"
                );
                Outcome::Healthy {
                    status: resp.status,
                    elapsed: resp.elapsed,
                }
            }
            Ok(resp) => {
                debug!(
                    service = service.name(),
                    status = resp.status,
                    "service responded with rejected status"
                );
                Outcome::Rejected {
                    status: resp.status,
                    elapsed: resp.elapsed,
                }
            }
            Err(e) => {
                debug!(
                    service = service.name(),
                    url = %service.url(),
                    error = %e,
                    "service unreachable"
                );
                Outcome::Unreachable {
                    error: e.to_string(),
                }
            }
        };
        CheckResult {
            service: service.clone(),
            outcome,
        }
    }
}
