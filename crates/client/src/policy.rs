//! What gets cached: the install manifest, the exclusion rules, and the
//! write-back switch, bundled with the version that names the current store.

use bgsw_core::{AppConfig, ConfigError, Error};
use reqwest::{StatusCode, Url, header};

use crate::fetch::{FetchResponse, resolve};

/// Ordered asset list pre-populated at install. Duplicates are dropped,
/// keeping the first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetManifest {
    assets: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for asset in assets.into_iter().map(Into::into) {
            if !unique.contains(&asset) {
                unique.push(asset);
            }
        }
        Self { assets: unique }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.assets.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Resolve every asset against `origin`.
    ///
    /// Two spellings of the same asset (`/index.html` and `index.html`)
    /// collapse to one URL here.
    pub fn resolve_all(&self, origin: &Url) -> Result<Vec<Url>, Error> {
        let mut urls: Vec<Url> = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let url = resolve(origin, asset).map_err(|e| Error::InvalidUrl(format!("{asset}: {e}")))?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(urls)
    }
}

/// URL substrings whose requests must never touch a cache store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    patterns: Vec<String>,
}

impl ExclusionRules {
    /// Empty patterns are discarded; they would match every URL.
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { patterns: patterns.into_iter().map(Into::into).filter(|p| !p.is_empty()).collect() }
    }

    /// The first pattern contained in `url`, if any.
    pub fn matching(&self, url: &str) -> Option<&str> {
        self.patterns.iter().find(|p| url.contains(p.as_str())).map(String::as_str)
    }

    pub fn matches(&self, url: &str) -> bool {
        self.matching(url).is_some()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Everything the worker needs to decide what to cache.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Name of the current store.
    pub version: String,
    pub origin: Url,
    pub manifest: AssetManifest,
    pub exclusions: ExclusionRules,
    /// Store successful network responses on a cache miss.
    pub write_back: bool,
}

impl CachePolicy {
    /// A policy with an empty manifest, no exclusions and write-back on.
    pub fn new(version: impl Into<String>, origin: Url) -> Self {
        Self {
            version: version.into(),
            origin,
            manifest: AssetManifest::default(),
            exclusions: ExclusionRules::default(),
            write_back: true,
        }
    }

    pub fn with_manifest(mut self, manifest: AssetManifest) -> Self {
        self.manifest = manifest;
        self
    }

    pub fn with_exclusions(mut self, exclusions: ExclusionRules) -> Self {
        self.exclusions = exclusions;
        self
    }

    pub fn with_write_back(mut self, write_back: bool) -> Self {
        self.write_back = write_back;
        self
    }

    /// Build the policy from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the configured origin does not parse.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(config.cache_version.clone(), config.origin_url()?)
            .with_manifest(AssetManifest::new(config.assets.iter().cloned()))
            .with_exclusions(ExclusionRules::new(config.exclusions.iter().cloned()))
            .with_write_back(config.write_back))
    }
}

/// Whether a network response may be written back into a store.
///
/// Requires an ok status. Partial content and `Vary: *` responses are
/// refused, since neither can be replayed for a later request.
pub fn is_cacheable(response: &FetchResponse) -> bool {
    if !response.is_ok() || response.status == StatusCode::PARTIAL_CONTENT {
        return false;
    }
    !response
        .headers
        .get_all(header::VARY)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|v| v.trim() == "*")
}
