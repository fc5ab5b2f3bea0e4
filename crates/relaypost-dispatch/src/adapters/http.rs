//! HTTP connector adapter.
//!
//! Every supported platform is reached through a connector service that
//! speaks plain HTTP/JSON; this adapter posts the job payload to the
//! connector endpoint and classifies the response.

use async_trait::async_trait;
use relaypost_core::{Platform, PublishJob, RelayError, RelayResult};
use relaypost_config::ConnectorConfig;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::failure::{FailureKind, PublishFailure};
use crate::router::{PublishAdapter, PublishReceipt};

/// Publishes through a connector service over HTTP.
pub struct HttpConnectorAdapter {
    platform: Platform,
    client: Client,
    endpoint: String,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ConnectorResponse {
    /// Platform-assigned post identifier, if the connector relays one.
    id: Option<String>,
}

impl HttpConnectorAdapter {
    /// Creates an adapter from connector configuration.
    ///
    /// The client carries no timeout of its own; the router bounds every
    /// attempt with the dispatch timeout.
    pub fn new(platform: Platform, config: &ConnectorConfig) -> RelayResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| RelayError::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            platform,
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        })
    }

    /// Creates an adapter with a caller-supplied client, for tests.
    #[must_use]
    pub fn with_client(platform: Platform, client: Client, endpoint: &str) -> Self {
        Self {
            platform,
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    fn classify_status(status: StatusCode, body: &str) -> PublishFailure {
        let kind = match status {
            StatusCode::TOO_MANY_REQUESTS => FailureKind::RateLimited,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FailureKind::AuthRejected,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                FailureKind::PayloadRejected
            }
            s if s.is_server_error() => FailureKind::ServerError,
            // Unexpected status; treat as transient rather than burning the job.
            _ => FailureKind::ServerError,
        };
        let snippet: String = body.chars().take(256).collect();
        PublishFailure::new(kind, format!("{}: {}", status, snippet))
    }
}

#[async_trait]
impl PublishAdapter for HttpConnectorAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn publish(&self, job: &PublishJob) -> Result<PublishReceipt, PublishFailure> {
        debug!(job_id = %job.id, platform = %self.platform, "posting to connector");

        let mut request = self
            .client
            .post(format!("{}/publish", self.endpoint))
            .header("x-relaypost-job-id", job.id.to_string())
            .json(&job.payload);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            let kind = if e.is_timeout() {
                FailureKind::Timeout
            } else {
                FailureKind::Network
            };
            PublishFailure::new(kind, e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let remote_id = response
            .json::<ConnectorResponse>()
            .await
            .ok()
            .and_then(|r| r.id);
        Ok(PublishReceipt::new(remote_id))
    }
}
