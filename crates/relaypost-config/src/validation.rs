//! Configuration validation.
//!
//! Fails fast on invalid configuration rather than at runtime.

use crate::AppConfig;
use relaypost_core::RelayError;

const MIN_SECRET_LEN: usize = 32;

/// Validates the loaded configuration.
pub fn validate_config(config: &AppConfig) -> Result<(), RelayError> {
    if config.database.url.is_empty() {
        return Err(RelayError::Configuration(
            "database URL is required".to_string(),
        ));
    }

    if config.database.min_connections > config.database.max_connections {
        return Err(RelayError::Configuration(format!(
            "database pool min_connections ({}) exceeds max_connections ({})",
            config.database.min_connections, config.database.max_connections
        )));
    }

    if config.app.environment == "production" {
        if config.security.internal_secret == "change-me-in-production" {
            return Err(RelayError::Configuration(
                "default internal secret is not allowed in production".to_string(),
            ));
        }
        if config.security.internal_secret.len() < MIN_SECRET_LEN {
            return Err(RelayError::Configuration(format!(
                "internal secret too short: {} characters (minimum {})",
                config.security.internal_secret.len(),
                MIN_SECRET_LEN
            )));
        }
    }

    let retry = &config.publish.retry;
    if retry.max_attempts == 0 {
        return Err(RelayError::Configuration(
            "publish.retry.max_attempts must be at least 1".to_string(),
        ));
    }
    if retry.base_delay_secs == 0 {
        return Err(RelayError::Configuration(
            "publish.retry.base_delay_secs must be positive".to_string(),
        ));
    }
    if retry.base_delay_secs > retry.max_delay_secs {
        return Err(RelayError::Configuration(format!(
            "publish.retry.base_delay_secs ({}) exceeds max_delay_secs ({})",
            retry.base_delay_secs, retry.max_delay_secs
        )));
    }

    if config.publish.dispatch_timeout_secs == 0 {
        return Err(RelayError::Configuration(
            "publish.dispatch_timeout_secs must be positive".to_string(),
        ));
    }

    if config.publish.queue_capacity == 0 {
        return Err(RelayError::Configuration(
            "publish.queue_capacity must be positive".to_string(),
        ));
    }

    if config.publish.sweep_batch_size == 0 {
        return Err(RelayError::Configuration(
            "publish.sweep_batch_size must be positive".to_string(),
        ));
    }

    Ok(())
}
