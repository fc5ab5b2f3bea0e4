//! Platform safety gate.
//!
//! Answers one question before a job is accepted: is publishing to this
//! platform, for this account, safe right now? Rejections are values, not
//! errors. A store failure during the ban-risk lookup fails closed.

use chrono::{Duration, Utc};
use relaypost_config::PublishConfig;
use relaypost_core::{Platform, UserId};
use relaypost_store::JobStore;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    Rejected { reason: String },
}

impl GateDecision {
    fn rejected(reason: impl Into<String>) -> Self {
        GateDecision::Rejected {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }
}

/// Feature flags consulted by the gate.
#[derive(Debug, Clone, Copy)]
pub struct GateFlags {
    pub scheduling_enabled: bool,
    pub auto_publish_enabled: bool,
    pub connectors_enabled: bool,
}

/// Checks feature flags and the rolling 24-hour ban-risk budget.
pub struct SafetyGate {
    store: Arc<dyn JobStore>,
    flags: GateFlags,
    rate_profiles: HashMap<Platform, u32>,
    default_rate_limit: u32,
}

impl SafetyGate {
    #[must_use]
    pub fn new(
        store: Arc<dyn JobStore>,
        flags: GateFlags,
        rate_profiles: HashMap<Platform, u32>,
        default_rate_limit: u32,
    ) -> Self {
        Self {
            store,
            flags,
            rate_profiles,
            default_rate_limit,
        }
    }

    /// Builds a gate from the publish configuration section.
    #[must_use]
    pub fn from_config(store: Arc<dyn JobStore>, config: &PublishConfig) -> Self {
        Self::new(
            store,
            GateFlags {
                scheduling_enabled: config.flags.scheduling_enabled,
                auto_publish_enabled: config.flags.auto_publish_enabled,
                connectors_enabled: config.flags.connectors_enabled,
            },
            config.rate_profiles.clone(),
            config.default_rate_limit,
        )
    }

    /// Successful publishes allowed per account per platform per 24 hours.
    #[must_use]
    pub fn rate_limit_for(&self, platform: Platform) -> u32 {
        self.rate_profiles
            .get(&platform)
            .copied()
            .unwrap_or(self.default_rate_limit)
    }

    /// Runs the full check for one prospective publish.
    pub async fn check(&self, user_id: UserId, platform: Platform) -> GateDecision {
        if !self.flags.scheduling_enabled {
            return GateDecision::rejected("feature flag scheduling_enabled is off");
        }
        if !self.flags.auto_publish_enabled {
            return GateDecision::rejected("feature flag auto_publish_enabled is off");
        }
        if !self.flags.connectors_enabled {
            return GateDecision::rejected("feature flag connectors_enabled is off");
        }

        let limit = self.rate_limit_for(platform);
        let since = Utc::now() - Duration::hours(24);
        let observed = match self
            .store
            .count_succeeded_since(user_id, platform, since)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                // Fail closed: with the window unreadable the budget is unknown.
                warn!(user_id = %user_id, platform = %platform, error = %e,
                      "ban-risk lookup failed, rejecting publish");
                return GateDecision::rejected(format!(
                    "ban-risk window unavailable for {}",
                    platform
                ));
            }
        };

        if observed >= u64::from(limit) {
            return GateDecision::rejected(format!(
                "ban-risk budget reached for {}: {}/{}",
                platform, observed, limit
            ));
        }

        GateDecision::Allowed
    }
}
