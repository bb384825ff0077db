//! Schedule aggregation for the booking calendar.
//!
//! `aggregate` turns the flat course collection into a `ScheduleIndex`
//! keyed by level, delivery type and date, enriching each course with
//! translation keys and a computed end time. It holds no state between
//! calls.

pub mod aggregate;
pub mod duration;
pub mod keys;

pub use aggregate::{aggregate, week_start, DateMap, FormattedCourse, ScheduleIndex};
pub use duration::{end_time, DurationCode};
pub use keys::{language_key, level_key, type_key};
