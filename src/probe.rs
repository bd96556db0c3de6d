use std::time::{Duration, Instant};

use crate::config::ProxyEndpoint;
use crate::error::ProbeError;

/// Timed fetches routed through one forward proxy.
pub struct Prober {
    http_client: reqwest::Client,
}

impl Prober {
    pub fn new(proxy: &ProxyEndpoint, timeout: Duration) -> Result<Self, ProbeError> {
        let proxy = reqwest::Proxy::all(proxy.url())
            .map_err(|e| ProbeError::Other(format!("invalid proxy {}: {}", proxy, e)))?;
        let http_client = reqwest::Client::builder()
            .proxy(proxy)
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Other(e.to_string()))?;
        Ok(Self { http_client })
    }

    /// Fetches `target` once and returns the time until the body was fully read.
    /// Redirects are followed; an error status after them is a failure.
    pub async fn probe(&self, target: &str) -> Result<Duration, ProbeError> {
        let start = Instant::now();
        let response = self.http_client.get(target).send().await?;
        let response = response.error_for_status()?;
        response.bytes().await?;
        Ok(start.elapsed())
    }
}
