//! Result cache for repository lookups
//!
//! Remembers the last successful answer for each logical request so that a
//! caller can opt into a stale answer when a fresh lookup fails.
//!
//! # Entry lifecycle
//!
//! | Event | created_at | last_accessed_at |
//! |-------|------------|------------------|
//! | put (fresh success) | now | now |
//! | get (stale fallback) | unchanged | now |
//! | sweep | entry removed when unused longer than the retention window | |
//! | clear_all | every entry removed | |
//!
//! Requests whose ref is already a full commit hash never read or write the
//! cache; that policy lives with the caller in [`crate::service`].

pub mod clock;
pub mod key;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{normalize_url, CacheKey};
pub use store::{CacheEntry, ResultCache, STORE_VERSION};
