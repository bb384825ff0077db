//! Snapshot retrieval with bounded retry.
//!
//! This module provides the `SnapshotSource` transport boundary (file,
//! HTTP and in-memory implementations) and the `ResilientFetcher` that
//! retries transient failures with linearly increasing delays.

pub mod error;
pub mod retry;
pub mod source;

pub use error::{FetchError, TransportError};
pub use retry::{ResilientFetcher, RetryPolicy, MAX_RETRIES, REQUEST_TIMEOUT, RETRY_DELAY};
pub use source::{extract_collection, FileSource, HttpSource, MemorySource, SnapshotSource};
