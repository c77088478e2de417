//! Cache Module
//!
//! Directive parsing, key derivation and in-memory response storage with
//! time-based expiry.

mod clock;
mod directive;
mod entry;
mod key;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use clock::{current_timestamp_ms, Clock, ManualClock, SystemClock};
pub use directive::DirectiveSet;
pub use entry::CachedEntry;
pub use key::derive_key;
pub use shared::SharedResponse;
pub use stats::CacheStats;
pub use store::EntryStore;
