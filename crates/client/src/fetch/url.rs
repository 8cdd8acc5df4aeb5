//! URL normalization so the same asset always maps to the same cache key.

/// Error type for URL normalization failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum UrlError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve an asset reference against the worker's origin.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Join relative references (`/`, `index.html`) onto `base`
/// 3. Remove fragment (#...), which never reaches the network
/// 4. Keep query string intact (do not reorder)
///
/// Host lowercasing and default-port removal come from the URL parser.
pub fn resolve(base: &url::Url, input: &str) -> Result<url::Url, UrlError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(UrlError::Empty);
    }

    let mut parsed = base.join(trimmed).map_err(|e| UrlError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlError::UnsupportedScheme(scheme.to_string())),
    }

    parsed.set_fragment(None);

    Ok(parsed)
}

/// Normalize an absolute request URL into its cache-key form.
pub fn canonicalize(url: &url::Url) -> url::Url {
    let mut url = url.clone();
    url.set_fragment(None);
    url
}

/// Whether the scheme is one the cache can hold.
pub fn is_cacheable_scheme(url: &url::Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
