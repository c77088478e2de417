//! Simple Cache - An in-memory request/response cache for HTTP client pipelines
//!
//! Honors `no-cache`, `no-store` and `max-age` request directives, expires
//! entries lazily by time, and lets many callers read one stored response.

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod middleware;

pub use cache::{CacheStats, ManualClock, SharedResponse, SystemClock};
pub use config::CacheOptions;
pub use engine::{CacheEngine, Next, Outcome};
pub use error::{BodyAccessor, CacheError, Result};
pub use middleware::{SimpleCacheLayer, SimpleCacheService};
