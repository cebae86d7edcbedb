use std::time::{Duration, Instant};

use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("no response within {0:?}")]
    Timeout(Duration),
}

/// What a probe saw when the endpoint delivered a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status: u16,
    pub elapsed: Duration,
}

/// Shared HTTP client for readiness probes.
///
/// Wraps [`reqwest::Client`]. Unlike an API client there is no base URL:
/// each probe carries its own absolute URL and timeout. Redirects are not
/// followed so that a redirecting endpoint is judged by its own answer.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self, ProbeError> {
        let inner = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { inner })
    }

    /// Issue one GET against `url` and report the status, never the body.
    ///
    /// Any delivered response is `Ok`, whatever its status code. Connection
    /// errors and timeouts are `Err`.
    pub async fn get_status(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<ProbeResponse, ProbeError> {
        let started = Instant::now();
        let resp = self
            .inner
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout(timeout)
                } else {
                    ProbeError::Request(e)
                }
            })?;
        Ok(ProbeResponse {
            status: resp.status().as_u16(),
            elapsed: started.elapsed(),
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient").finish_non_exhaustive()
    }
}
