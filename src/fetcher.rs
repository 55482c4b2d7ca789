//! Fetches one pool snapshot from the upstream endpoint
//!
//! The fetcher performs exactly one request per call and never retries. Retry
//! policy belongs to the collector loop.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{instrument, trace};

use crate::Snapshot;
use crate::error::{CollectorError, CollectorResult};

/// Source of pool snapshots
///
/// The loop only depends on this trait so tests can drive it with scripted
/// responses instead of a live endpoint.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> CollectorResult<Snapshot>;
}

/// Envelope the upstream wraps the pool document in
#[derive(Debug, Deserialize)]
struct SourceResponse {
    data: Snapshot,
}

/// HTTP implementation of [`SnapshotSource`]
pub struct HttpFetcher {
    url: String,

    /// HTTP client (reused across requests)
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> CollectorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CollectorError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SnapshotSource for HttpFetcher {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> CollectorResult<Snapshot> {
        trace!("requesting pool snapshot");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CollectorError::Network(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(CollectorError::Network(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| CollectorError::Network(format!("failed to read response body: {e}")))?;

        let SourceResponse { data } = serde_json::from_str(&body)
            .map_err(|e| CollectorError::MalformedResponse(e.to_string()))?;

        trace!(observed_at = data.observed_at, "parsed pool snapshot");

        Ok(data)
    }
}
