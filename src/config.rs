//! Configuration Module
//!
//! Per-call cache options, loadable from environment variables or deserialized
//! from a JSON/serde source.

use std::env;

use axum::http::Method;
use serde::Deserialize;

/// Lifetime applied to new entries when neither the options nor the request
/// say otherwise (2 minutes).
pub const DEFAULT_CACHE_LENGTH_SECONDS: u64 = 120;

/// Methods cached when no allow-list is configured.
pub const DEFAULT_METHODS: [&str; 3] = ["GET", "HEAD", "OPTIONS"];

/// Cache options supplied with each call.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheOptions {
    /// Default lifetime in seconds for new entries; 0 means "use the default"
    pub cache_length_in_seconds: u64,
    /// Request methods that take part in caching, compared case-sensitively
    pub methods: Vec<String>,
}

impl CacheOptions {
    /// Creates options by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `SIMPLE_CACHE_LENGTH_SECONDS` - Default entry lifetime (default: 120)
    /// - `SIMPLE_CACHE_METHODS` - Comma-separated method allow-list
    ///   (default: GET,HEAD,OPTIONS)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_length_in_seconds: env::var("SIMPLE_CACHE_LENGTH_SECONDS")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.cache_length_in_seconds),
            methods: env::var("SIMPLE_CACHE_METHODS")
                .ok()
                .map(|v| parse_methods(&v))
                .filter(|methods| !methods.is_empty())
                .unwrap_or(defaults.methods),
        }
    }

    /// Replaces the default entry lifetime.
    pub fn with_cache_length(mut self, seconds: u64) -> Self {
        self.cache_length_in_seconds = seconds;
        self
    }

    /// Replaces the method allow-list.
    pub fn with_methods<I, S>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.methods = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Resolved default max-age in seconds.
    pub fn max_age_seconds(&self) -> u64 {
        if self.cache_length_in_seconds == 0 {
            DEFAULT_CACHE_LENGTH_SECONDS
        } else {
            self.cache_length_in_seconds
        }
    }

    /// Returns true if requests with this method take part in caching.
    pub fn allows(&self, method: &Method) -> bool {
        self.methods.iter().any(|m| m == method.as_str())
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            cache_length_in_seconds: DEFAULT_CACHE_LENGTH_SECONDS,
            methods: DEFAULT_METHODS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

/// Splits a comma-separated method list, dropping blanks and invalid tokens.
fn parse_methods(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|m| Method::from_bytes(m.as_bytes()).is_ok())
        .map(str::to_string)
        .collect()
}
