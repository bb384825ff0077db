//! Coursebook core - the data-access layer behind the language school's booking site.
//!
//! This crate fronts a static JSON "backend" with:
//! - `cache`: a TTL cache for snapshot collections
//! - `fetch`: snapshot sources and a resilient, retrying fetcher
//! - `overlay`: a write-through patch layer for locally created records
//! - `schedule`: aggregation of courses into a calendar index
//! - `service`: the `DataService` that ties them together

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod models;
pub mod overlay;
pub mod schedule;
pub mod service;

pub use config::Config;
pub use error::{DataError, Result};
pub use service::DataService;
