//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;
use url::Url;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid { field: field.into(), reason: reason.into() }
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `cache_ttl_days` is outside 1..=365
    /// - `user_agents` is empty or holds a blank entry
    /// - proxying is enabled without any proxy endpoint
    /// - rendering is enabled with an unparseable `render.base_url`
    /// - `bot.small_body_bytes` is 0 or `augment.min_images` is outside 1..=20
    ///
    /// Returns `ConfigError::Missing` if rendering is enabled without a token.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(invalid("max_bytes", "must be greater than 0"));
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(invalid("max_bytes", "must not exceed 50MB"));
        }

        if self.timeout_ms < 100 {
            return Err(invalid("timeout_ms", "must be at least 100ms"));
        }
        if self.timeout_ms > 300_000 {
            return Err(invalid("timeout_ms", "must not exceed 5 minutes (300000ms)"));
        }

        if !(1..=365).contains(&self.cache_ttl_days) {
            return Err(invalid("cache_ttl_days", "must be between 1 and 365"));
        }

        if self.user_agents.is_empty() {
            return Err(invalid("user_agents", "must not be empty"));
        }
        if self.user_agents.iter().any(|ua| ua.trim().is_empty()) {
            return Err(invalid("user_agents", "must not contain blank entries"));
        }

        let proxy = &self.proxy;
        if proxy.enabled && proxy.http_proxy.is_none() && proxy.https_proxy.is_none() && proxy.proxy_list.is_empty() {
            return Err(invalid("proxy", "enabled without http_proxy, https_proxy or proxy_list"));
        }
        if !proxy.enabled && (proxy.username.is_some() || proxy.password.is_some()) {
            tracing::warn!("Proxy credentials are set but proxy.enabled is false; they will be ignored");
        }

        if self.render.enabled {
            self.require_render_token()?;
            Url::parse(&self.render.base_url).map_err(|e| invalid("render.base_url", &e.to_string()))?;
            if self.render.timeout_ms < 100 {
                return Err(invalid("render.timeout_ms", "must be at least 100ms"));
            }
        }

        if self.bot.small_body_bytes == 0 {
            return Err(invalid("bot.small_body_bytes", "must be greater than 0"));
        }

        if !(1..=20).contains(&self.augment.min_images) {
            return Err(invalid("augment.min_images", "must be between 1 and 20"));
        }

        Ok(())
    }
}
