//! URL 验证模块
//!
//! Target URLs must be absolute, carry a host, and must not use a scheme
//! that executes or reads local content when followed.

use url::Url;

use crate::errors::StoreError;

#[derive(Debug)]
pub enum UrlValidationError {
    EmptyUrl,
    DangerousProtocol(String),
    MissingHost,
    InvalidFormat(String),
}

impl std::fmt::Display for UrlValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyUrl => write!(f, "URL cannot be empty"),
            Self::DangerousProtocol(proto) => write!(f, "Dangerous protocol blocked: {}", proto),
            Self::MissingHost => write!(f, "URL must be absolute and name a host"),
            Self::InvalidFormat(msg) => write!(f, "Invalid URL format: {}", msg),
        }
    }
}

impl std::error::Error for UrlValidationError {}

impl From<UrlValidationError> for StoreError {
    fn from(err: UrlValidationError) -> Self {
        StoreError::invalid_url(err.to_string())
    }
}

/// 危险协议列表
const DANGEROUS_PROTOCOLS: &[&str] = &[
    "javascript:",
    "data:",
    "file:",
    "vbscript:",
    "about:",
    "blob:",
];

/// Escape spaces the way browsers do before the URL is validated and stored.
pub fn normalize_url(url: &str) -> String {
    url.trim().replace(' ', "%20")
}

/// Check that `url` is a syntactically valid absolute URL with a host.
pub fn validate_url(url: &str) -> Result<(), UrlValidationError> {
    let url = url.trim();

    if url.is_empty() {
        return Err(UrlValidationError::EmptyUrl);
    }

    let url_lower = url.to_lowercase();
    for proto in DANGEROUS_PROTOCOLS {
        if url_lower.starts_with(proto) {
            return Err(UrlValidationError::DangerousProtocol(proto.to_string()));
        }
    }

    let parsed = Url::parse(url).map_err(|e| UrlValidationError::InvalidFormat(e.to_string()))?;
    if parsed.cannot_be_a_base() || !parsed.has_host() {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(())
}
