//! Local write-through overlay.
//!
//! There is no write endpoint behind the static snapshot, so records the
//! application creates (enrollments, updated seat counters) are written
//! here as whole collections. An overlay for a key fully shadows the
//! snapshot for that key; the two are never merged.

pub mod store;

pub use store::{
    FileStore, KeyValueStore, MemoryStore, OverlayError, OverlayStore, COURSES_OVERLAY_KEY,
    ENROLLMENTS_OVERLAY_KEY,
};

/// Where a collection was read from.
#[derive(Debug, Clone, PartialEq)]
pub enum Source<T> {
    Snapshot(T),
    Overlay(T),
}

impl<T> Source<T> {
    pub fn into_inner(self) -> T {
        match self {
            Source::Snapshot(data) | Source::Overlay(data) => data,
        }
    }

    pub fn data(&self) -> &T {
        match self {
            Source::Snapshot(data) | Source::Overlay(data) => data,
        }
    }

    pub fn is_overlay(&self) -> bool {
        matches!(self, Source::Overlay(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Source<U> {
        match self {
            Source::Snapshot(data) => Source::Snapshot(f(data)),
            Source::Overlay(data) => Source::Overlay(f(data)),
        }
    }
}
