//! Target platform enumeration.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use crate::RelayError;

/// External platform a publish job is destined for.
///
/// The queue and store treat this as an opaque routing key; only the
/// platform router and its adapters attach behavior to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Linkedin,
    X,
    Facebook,
    Instagram,
    Mastodon,
    Telegram,
    /// Generic outbound webhook (CRM and similar integrations).
    Webhook,
}

impl Platform {
    /// All known platforms, in routing order.
    pub const ALL: [Platform; 7] = [
        Platform::Linkedin,
        Platform::X,
        Platform::Facebook,
        Platform::Instagram,
        Platform::Mastodon,
        Platform::Telegram,
        Platform::Webhook,
    ];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Platform::Linkedin => "linkedin",
            Platform::X => "x",
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Mastodon => "mastodon",
            Platform::Telegram => "telegram",
            Platform::Webhook => "webhook",
        }
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linkedin" => Ok(Platform::Linkedin),
            // "twitter" survives in older submitters
            "x" | "twitter" => Ok(Platform::X),
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "mastodon" => Ok(Platform::Mastodon),
            "telegram" => Ok(Platform::Telegram),
            "webhook" => Ok(Platform::Webhook),
            other => Err(RelayError::UnsupportedPlatform(other.to_string())),
        }
    }
}
