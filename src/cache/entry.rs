//! Cache Entry Module
//!
//! Defines a stored response together with its time window.

use crate::cache::SharedResponse;

// == Cached Entry ==
/// A stored response with the time it was written and the time it expires.
#[derive(Debug, Clone)]
pub struct CachedEntry {
    /// The cache key this entry is stored under
    pub key: String,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Expiration timestamp (Unix milliseconds), never before `stored_at`
    pub expires_at: u64,
    /// The materialized response
    pub payload: SharedResponse,
}

impl CachedEntry {
    // == Constructor ==
    /// Creates an entry written at `now` that lives for `max_age_seconds`.
    pub fn new(key: String, payload: SharedResponse, now: u64, max_age_seconds: u64) -> Self {
        Self {
            key,
            stored_at: now,
            expires_at: now.saturating_add(max_age_seconds.saturating_mul(1000)),
            payload,
        }
    }

    // == Is Fresh ==
    /// Returns true while `now` has not passed the expiration time.
    ///
    /// Boundary condition: the entry is still fresh at exactly `expires_at`.
    pub fn is_fresh(&self, now: u64) -> bool {
        now <= self.expires_at
    }

    // == Is Within Age ==
    /// Returns true if the entry is no older than `max_age_seconds` at `now`.
    pub fn is_within_age(&self, now: u64, max_age_seconds: u64) -> bool {
        now <= self
            .stored_at
            .saturating_add(max_age_seconds.saturating_mul(1000))
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Response;

    async fn payload() -> SharedResponse {
        SharedResponse::materialize(Response::new(Body::from("body")))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_entry_window() {
        let entry = CachedEntry::new("GET/r".to_string(), payload().await, 1_000, 120);

        assert_eq!(entry.stored_at, 1_000);
        assert_eq!(entry.expires_at, 121_000);
        assert!(entry.expires_at >= entry.stored_at);
    }

    #[tokio::test]
    async fn test_expiration_boundary_condition() {
        let entry = CachedEntry::new("GET/r".to_string(), payload().await, 0, 120);

        assert!(entry.is_fresh(119_999));
        assert!(entry.is_fresh(120_000), "Entry should be fresh at exactly expires_at");
        assert!(!entry.is_fresh(120_001));
    }

    #[tokio::test]
    async fn test_zero_max_age_only_fresh_at_store_time() {
        let entry = CachedEntry::new("GET/r".to_string(), payload().await, 500, 0);

        assert!(entry.is_fresh(500));
        assert!(!entry.is_fresh(501));
    }

    #[tokio::test]
    async fn test_within_age() {
        let entry = CachedEntry::new("GET/r".to_string(), payload().await, 0, 120);

        assert!(entry.is_within_age(30_000, 30));
        assert!(!entry.is_within_age(30_001, 30));
        assert!(entry.is_within_age(100_000, 300));
    }

    #[tokio::test]
    async fn test_huge_max_age_saturates() {
        let entry = CachedEntry::new("GET/r".to_string(), payload().await, 10, u64::MAX);

        assert_eq!(entry.expires_at, u64::MAX);
        assert!(entry.is_fresh(u64::MAX));
    }
}
