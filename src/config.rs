use std::time::Duration;

use crate::error::{ModelScopeError, Result};

pub const DEFAULT_BASE_URL: &str = "https://api-inference.modelscope.cn/";
pub const DEFAULT_API_KEY_ENV: &str = "MODELSCOPE_API_KEY";
pub const FALLBACK_API_KEY_ENV: &str = "MODELSCOPE_SDK_TOKEN";

/// Where to look for the bearer token.
///
/// The primary variable is checked first, then the fallback. Empty values
/// are treated as unset.
#[derive(Debug, Clone)]
pub struct ApiKeySource {
    pub primary: String,
    pub fallback: String,
}

impl Default for ApiKeySource {
    fn default() -> Self {
        Self {
            primary: DEFAULT_API_KEY_ENV.to_string(),
            fallback: FALLBACK_API_KEY_ENV.to_string(),
        }
    }
}

impl ApiKeySource {
    /// Use a custom primary variable name, keeping the standard fallback.
    pub fn with_primary(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..Default::default()
        }
    }

    /// Resolve the token from the process environment.
    pub fn resolve(&self) -> Result<String> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve the token through an arbitrary lookup function.
    pub fn resolve_with<F>(&self, lookup: F) -> Result<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        [self.primary.as_str(), self.fallback.as_str()]
            .into_iter()
            .filter_map(|name| lookup(name))
            .map(|value| value.trim().to_string())
            .find(|value| !value.is_empty())
            .ok_or_else(|| ModelScopeError::MissingApiKey {
                primary: self.primary.clone(),
                fallback: self.fallback.clone(),
            })
    }
}

/// Resolved settings for a [`ModelScopeClient`](crate::ModelScopeClient).
#[derive(Debug, Clone)]
pub struct ModelScopeConfig {
    /// Bearer token sent on every authenticated request
    pub api_key: String,
    /// API root (default: "https://api-inference.modelscope.cn/")
    pub base_url: String,
    /// Delay between task status checks (default: 5s)
    pub poll_interval: Duration,
    /// Timeout for the submission request (default: 120s)
    pub submit_timeout: Duration,
    /// Timeout for each status request (default: 30s)
    pub poll_request_timeout: Duration,
    /// Timeout for the image download (default: 120s)
    pub download_timeout: Duration,
}

impl ModelScopeConfig {
    /// Create a config around an already resolved token.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: Duration::from_secs(5),
            submit_timeout: Duration::from_secs(120),
            poll_request_timeout: Duration::from_secs(30),
            download_timeout: Duration::from_secs(120),
        }
    }

    /// Resolve the token from the standard environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&ApiKeySource::default())
    }

    /// Resolve the token from the given variables.
    pub fn from_source(source: &ApiKeySource) -> Result<Self> {
        source.resolve().map(Self::new)
    }

    /// Set the API root.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the delay between status checks.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the submission request timeout.
    pub fn submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }

    /// Set the per-poll request timeout.
    pub fn poll_request_timeout(mut self, timeout: Duration) -> Self {
        self.poll_request_timeout = timeout;
        self
    }

    /// Set the image download timeout.
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.download_timeout = timeout;
        self
    }
}
