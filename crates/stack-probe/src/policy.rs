use serde::Serialize;

/// Decides which delivered responses count as healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusPolicy {
    /// Any response at all is healthy, including 4xx and 5xx. Liveness only.
    #[default]
    AnyResponse,
    /// Only 2xx responses are healthy.
    Success,
}

impl StatusPolicy {
    pub fn accepts(self, status: u16) -> bool {
        match self {
            StatusPolicy::AnyResponse => true,
            StatusPolicy::Success => (200..300).contains(&status),
        }
    }
}
