//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (BG_SW_*)
//! 2. TOML config file (if BG_SW_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (BG_SW_*)
/// 2. TOML config file (if BG_SW_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Name of the current cache store. Every other store is deleted on activation.
    ///
    /// Set via BG_SW_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Origin the worker is registered for; relative assets resolve against it.
    ///
    /// Set via BG_SW_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Assets pre-populated at install time, in order.
    ///
    /// Set via BG_SW_ASSETS environment variable (array syntax: `[/,/index.html]`).
    #[serde(default = "default_assets")]
    pub assets: Vec<String>,

    /// URL substrings that bypass the cache entirely.
    ///
    /// Set via BG_SW_EXCLUSIONS environment variable (array syntax).
    #[serde(default = "default_exclusions")]
    pub exclusions: Vec<String>,

    /// Whether cache misses are written back after a successful network fetch.
    ///
    /// Set via BG_SW_WRITE_BACK environment variable.
    #[serde(default = "default_true")]
    pub write_back: bool,

    /// Path to the SQLite cache database.
    ///
    /// Set via BG_SW_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for network requests.
    ///
    /// Set via BG_SW_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Network request timeout in milliseconds.
    ///
    /// Set via BG_SW_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_version() -> String {
    "blindguide-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8080".into()
}

fn default_assets() -> Vec<String> {
    vec![
        "/".into(),
        "/index.html".into(),
        "/manifest.json".into(),
        "https://cdn.jsdelivr.net/npm/onnxruntime-web@1.16.3/dist/ort.min.js".into(),
        "https://fonts.googleapis.com/css2?family=JetBrains+Mono:wght@400;600&display=swap".into(),
    ]
}

fn default_exclusions() -> Vec<String> {
    vec!["api.openai.com".into(), "api.anthropic.com".into(), "workers.dev".into()]
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./bg-sw-cache.sqlite")
}

fn default_user_agent() -> String {
    "bg-sw/0.1".into()
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_version: default_cache_version(),
            origin: default_origin(),
            assets: default_assets(),
            exclusions: default_exclusions(),
            write_back: true,
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `BG_SW_`
    /// 2. TOML file from `BG_SW_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("BG_SW_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("BG_SW_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Parse the configured origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme: {scheme}") }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.cache_version, "blindguide-v1");
        assert_eq!(config.origin, "http://localhost:8080");
        assert_eq!(config.assets.len(), 5);
        assert_eq!(config.assets[0], "/");
        assert!(config.exclusions.contains(&"workers.dev".to_string()));
        assert!(config.write_back);
        assert_eq!(config.db_path, PathBuf::from("./bg-sw-cache.sqlite"));
        assert_eq!(config.user_agent, "bg-sw/0.1");
        assert_eq!(config.timeout_ms, 30_000);
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(30_000));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig::default();
        let origin = config.origin_url().unwrap();
        assert_eq!(origin.host_str(), Some("localhost"));
        assert_eq!(origin.port(), Some(8080));
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let config = AppConfig { origin: "file:///srv/www".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "bg-sw.toml",
                r#"
                cache_version = "blindguide-v3"
                exclusions = ["api.example.com"]
                write_back = false
                "#,
            )?;
            jail.set_env("BG_SW_CONFIG_FILE", "bg-sw.toml");
            jail.set_env("BG_SW_CACHE_VERSION", "blindguide-v4");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.cache_version, "blindguide-v4");
            assert_eq!(config.exclusions, vec!["api.example.com".to_string()]);
            assert!(!config.write_back);
            assert_eq!(config.origin, "http://localhost:8080");
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("BG_SW_TIMEOUT_MS", "10");
            let result = AppConfig::load();
            assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));
            Ok(())
        });
    }
}
