//! Cache module for storing API responses to disk
//!
//! Responses are persisted as one JSON file per logical request, stamped with
//! the time they were written. Entries older than the configured TTL, and
//! entries that cannot be parsed, are deleted on read and never returned.

mod key;
mod manager;

pub use key::{logical_key, storage_id};
pub use manager::{CacheEntry, CacheManager};
