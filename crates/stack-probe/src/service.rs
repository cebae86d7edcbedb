use std::time::Duration;

use serde::{Serialize, Serializer};
use url::Url;

use crate::client::ProbeError;

/// Probe timeout used when a caller has no opinion.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// One named endpoint to probe.
///
/// Immutable once built; its identity is its position in the list handed
/// to the [`Prober`](crate::Prober).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceCheck {
    name: String,
    #[serde(rename = "url")]
    endpoint: String,
    #[serde(skip)]
    url: Url,
    #[serde(rename = "timeout_ms", serialize_with = "as_millis")]
    timeout: Duration,
}

impl ServiceCheck {
    pub fn new(
        name: impl Into<String>,
        url: &str,
        timeout: Duration,
    ) -> Result<Self, ProbeError> {
        Ok(Self {
            name: name.into(),
            endpoint: url.to_string(),
            url: Url::parse(url)?,
            timeout,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed URL, normalized (`http://host:5000` gains a trailing `/`).
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The URL exactly as configured, for display.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Host and port the URL resolves to, for TCP-level checks.
    pub fn socket_target(&self) -> Option<(String, u16)> {
        let host = self.url.host_str()?.to_string();
        let port = self.url.port_or_known_default()?;
        Some((host, port))
    }
}

fn as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

/// The four endpoints of the housing-price serving stack, in report order.
pub const STACK_ENDPOINTS: [(&str, &str); 4] = [
    ("Housing API", "http://localhost:8000/docs"),
    ("Prometheus", "http://localhost:9090/-/healthy"),
    ("Grafana", "http://localhost:3001/api/health"),
    ("MLflow", "http://localhost:5000"),
];

/// Build the fixed service list with a shared per-probe timeout.
pub fn stack_services(timeout: Duration) -> Vec<ServiceCheck> {
    STACK_ENDPOINTS
        .iter()
        .map(|(name, url)| ServiceCheck {
            name: (*name).to_string(),
            endpoint: (*url).to_string(),
            url: Url::parse(url).unwrap_or_else(|e| panic!("invalid built-in URL {url}: {e}")),
            timeout,
        })
        .collect()
}
