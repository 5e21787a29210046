//! HTTP reachability checks against the fixed local ports.

use std::time::Duration;

use reqwest::blocking::Client;
use thiserror::Error;

use super::ProbeResult;

/// Upper bound on a single HTTP probe.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors raised while building the HTTP client.
#[derive(Debug, Error)]
#[error("failed to build HTTP probe client: {source}")]
pub struct HttpProbeError {
    #[source]
    source: reqwest::Error,
}

/// Issues `GET` requests and maps the response onto a probe verdict.
///
/// Any response below 400 counts as ready. Refused connections mean the
/// server is not listening yet; other transport errors are indeterminate.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    /// Builds a probe whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, HttpProbeError> {
        // Targets are always on the local host.
        let client = Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|source| HttpProbeError { source })?;
        Ok(Self { client })
    }

    /// Probes `url` once.
    #[must_use]
    pub fn check(&self, url: &str) -> ProbeResult {
        match self.client.get(url).send() {
            Ok(response) => {
                let status = response.status();
                if status.is_client_error() || status.is_server_error() {
                    ProbeResult::not_ready(format!("{url} answered {status}"))
                } else {
                    ProbeResult::ready(format!("{url} answered {status}"))
                }
            }
            Err(error) if error.is_connect() => {
                ProbeResult::not_ready(format!("{url} refused the connection: {error}"))
            }
            Err(error) => ProbeResult::indeterminate(format!("{url} probe failed: {error}")),
        }
    }
}
