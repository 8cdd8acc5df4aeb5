//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

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

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `origin` is not an absolute http(s) URL
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - an asset or exclusion pattern is blank
    ///
    /// Returns `ConfigError::Missing` if `cache_version` is empty or `assets` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_version.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "cache_version".into(),
                hint: "Set BG_SW_CACHE_VERSION, e.g. blindguide-v4".into(),
            });
        }

        self.origin_url()?;

        if self.assets.is_empty() {
            return Err(ConfigError::Missing {
                field: "assets".into(),
                hint: "At least one asset must be pre-cached at install".into(),
            });
        }
        if self.assets.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::Invalid { field: "assets".into(), reason: "entries must not be blank".into() });
        }

        if self.exclusions.iter().any(|p| p.is_empty()) {
            return Err(ConfigError::Invalid {
                field: "exclusions".into(),
                reason: "an empty pattern would exclude every request".into(),
            });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for asset in &self.assets {
            if let Some(pattern) = self.exclusions.iter().find(|p| asset.contains(p.as_str())) {
                tracing::warn!(
                    asset = %asset,
                    pattern = %pattern,
                    "Asset is excluded from caching and will be skipped at install"
                );
            }
        }

        Ok(())
    }
}
