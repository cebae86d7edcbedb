use crate::client::{HttpClient, ProbeError, ProbeResponse};
use crate::service::ServiceCheck;

/// Uniform reachability interface for every probed service.
///
/// The prober only needs to know whether a response came back and what
/// status it carried. Implementations must not retry.
pub trait HealthCheck: Send + Sync {
    /// Returns `Ok` if the endpoint delivered any response, or `Err` on
    /// connection failure, timeout or transport error.
    fn probe(
        &self,
        service: &ServiceCheck,
    ) -> impl std::future::Future<Output = Result<ProbeResponse, ProbeError>> + Send;
}

/// [`HealthCheck`] over plain HTTP GET.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    http: HttpClient,
}

impl HttpProbe {
    pub fn new() -> Result<Self, ProbeError> {
        Ok(Self {
            http: HttpClient::new()?,
        })
    }
}

impl HealthCheck for HttpProbe {
    async fn probe(&self, service: &ServiceCheck) -> Result<ProbeResponse, ProbeError> {
        self.http.get_status(service.url(), service.timeout()).await
    }
}
