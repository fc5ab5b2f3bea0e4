//! Routes publish jobs to their platform adapter.

use async_trait::async_trait;
use relaypost_core::{Platform, PublishJob};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use crate::failure::{FailureKind, PublishFailure};

/// Proof of delivery returned by an adapter on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Platform-assigned identifier of the published post, when one exists.
    pub remote_id: Option<String>,
}

impl PublishReceipt {
    #[must_use]
    pub fn new(remote_id: Option<String>) -> Self {
        Self { remote_id }
    }
}

/// One platform's delivery mechanism.
///
/// An adapter makes exactly one attempt and classifies any failure; it
/// never retries internally. Retry policy belongs to the queue and the
/// recovery sweep, which see the whole picture.
#[async_trait]
pub trait PublishAdapter: Send + Sync {
    /// The platform this adapter serves.
    fn platform(&self) -> Platform;

    /// Makes a single publish attempt.
    async fn publish(&self, job: &PublishJob) -> Result<PublishReceipt, PublishFailure>;
}

/// Maps platforms to adapters and bounds every attempt with a timeout.
pub struct PlatformRouter {
    adapters: HashMap<Platform, Arc<dyn PublishAdapter>>,
    dispatch_timeout: Duration,
}

impl PlatformRouter {
    #[must_use]
    pub fn new(dispatch_timeout: Duration) -> Self {
        Self {
            adapters: HashMap::new(),
            dispatch_timeout,
        }
    }

    /// Registers an adapter under its own platform.
    #[must_use]
    pub fn with_adapter(mut self, adapter: Arc<dyn PublishAdapter>) -> Self {
        self.adapters.insert(adapter.platform(), adapter);
        self
    }

    /// Returns the platforms with a registered adapter.
    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.adapters.keys().copied()
    }

    /// Dispatches one attempt for the job.
    ///
    /// A missing adapter is an `unsupported_platform` failure; an attempt
    /// that outlives the dispatch timeout is abandoned and reported as
    /// `timeout`.
    pub async fn dispatch(&self, job: &PublishJob) -> Result<PublishReceipt, PublishFailure> {
        let adapter = self.adapters.get(&job.platform).ok_or_else(|| {
            PublishFailure::new(
                FailureKind::UnsupportedPlatform,
                format!("no adapter registered for {}", job.platform),
            )
        })?;

        debug!(
            job_id = %job.id,
            platform = %job.platform,
            attempt = job.next_attempt(),
            "dispatching publish attempt"
        );

        match timeout(self.dispatch_timeout, adapter.publish(job)).await {
            Ok(result) => result,
            Err(_) => Err(PublishFailure::new(
                FailureKind::Timeout,
                format!(
                    "attempt exceeded {}s dispatch timeout",
                    self.dispatch_timeout.as_secs()
                ),
            )),
        }
    }
}
