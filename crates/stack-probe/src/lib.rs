pub mod client;
pub mod health;
pub mod policy;
pub mod prober;
pub mod report;
pub mod service;
pub mod tcp;

pub use client::{HttpClient, ProbeError, ProbeResponse};
pub use health::{HealthCheck, HttpProbe};
pub use policy::StatusPolicy;
pub use prober::{ProbeMode, Prober};
pub use report::{CheckResult, Outcome, ReadinessReport};
pub use service::{DEFAULT_PROBE_TIMEOUT, STACK_ENDPOINTS, ServiceCheck, stack_services};
pub use tcp::port_open;
