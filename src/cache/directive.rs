//! Cache-Control Directive Module
//!
//! Parses a request `Cache-Control` value into the flags the engine acts on.

// == Directive Set ==
/// Directives carried by one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectiveSet {
    /// Skip any stored entry for this request (a fresh result may still be stored)
    pub no_cache: bool,
    /// Do not store the fresh result
    pub no_store: bool,
    /// Lifetime in seconds for an entry written by this request
    pub max_age_seconds: u64,
}

impl DirectiveSet {
    // == Parse ==
    /// Parses a `Cache-Control` value.
    ///
    /// Tokens are comma-separated and matched case-insensitively after
    /// trimming. Unknown tokens and `max-age` values that are not a
    /// non-negative integer are ignored; when several valid `max-age`
    /// tokens appear, the last one wins. Parsing never fails.
    ///
    /// # Arguments
    /// * `value` - The raw header value, if the request carried one
    /// * `default_max_age` - Lifetime used when no valid `max-age` is present
    pub fn parse(value: Option<&str>, default_max_age: u64) -> Self {
        let mut directives = Self::with_default(default_max_age);
        let Some(value) = value else {
            return directives;
        };

        for token in value.split(',') {
            let token = token.trim().to_ascii_lowercase();
            match token.as_str() {
                "no-cache" => directives.no_cache = true,
                "no-store" => directives.no_store = true,
                other => {
                    if let Some(seconds) = other.strip_prefix("max-age=").and_then(parse_seconds) {
                        directives.max_age_seconds = seconds;
                    }
                }
            }
        }

        directives
    }

    /// A directive set with no flags and the given lifetime.
    pub fn with_default(default_max_age: u64) -> Self {
        Self {
            no_cache: false,
            no_store: false,
            max_age_seconds: default_max_age,
        }
    }
}

/// Digits only: `u64::from_str` would also take a leading `+`.
fn parse_seconds(value: &str) -> Option<u64> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
