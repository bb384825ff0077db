//! Data models for the booking site's records.
//!
//! - `CourseRecord`: a scheduled course with its seat counters
//! - `EnrollmentRecord`: a student's seat in a course
//! - `UserRecord`: students and teachers
//!
//! All records accept the camelCase JSON the static snapshot is written in,
//! and keep unknown fields so they survive overlay write-backs.

pub mod course;
pub mod enrollment;
pub mod user;

pub use course::{CourseRecord, CourseSchedule, CourseStatus, CourseType, Level};
pub use enrollment::{EnrollmentRecord, EnrollmentStatus, StudentEnrollment};
pub use user::UserRecord;
