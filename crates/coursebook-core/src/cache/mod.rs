//! In-memory caching for snapshot reads.
//!
//! This module provides `TtlCache`, a key/value store whose entries are
//! considered stale after a fixed time-to-live (5 minutes by default).
//! Staleness is checked lazily on read; an optional background sweeper
//! reclaims memory held by expired entries.

pub mod ttl;

pub use ttl::{CacheEntry, TtlCache, DEFAULT_TTL};
