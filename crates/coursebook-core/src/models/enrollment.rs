use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "ts")]
use ts_rs::TS;

use super::CourseRecord;

/// Last millisecond stamp handed out, so ids stay unique within the process.
static LAST_ENROLLMENT_MILLIS: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    Cancelled,
}

impl<'de> Deserialize<'de> for EnrollmentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            // Older snapshots spell it the American way
            Some(v) if v.eq_ignore_ascii_case("cancelled") || v.eq_ignore_ascii_case("canceled") => {
                EnrollmentStatus::Cancelled
            }
            _ => EnrollmentStatus::Active,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct EnrollmentRecord {
    pub id: String,
    #[serde(rename = "studentId")]
    pub student_id: String,
    #[serde(rename = "courseId")]
    pub course_id: String,
    #[serde(rename = "enrollmentDate")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub enrollment_date: DateTime<Utc>,
    #[serde(default)]
    pub status: EnrollmentStatus,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl EnrollmentRecord {
    /// Create a fresh active enrollment stamped with the current time.
    pub fn new(student_id: &str, course_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: format!("enr-{}", next_enrollment_millis(now.timestamp_millis())),
            student_id: student_id.to_string(),
            course_id: course_id.to_string(),
            enrollment_date: now,
            status: EnrollmentStatus::Active,
            extra: Map::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    pub fn matches(&self, student_id: &str, course_id: &str) -> bool {
        self.student_id == student_id && self.course_id == course_id
    }
}

/// Millisecond stamps are bumped past the last one issued when the clock
/// hasn't moved (or went backwards).
fn next_enrollment_millis(now_millis: i64) -> i64 {
    let mut last = LAST_ENROLLMENT_MILLIS.load(Ordering::Relaxed);
    loop {
        let next = now_millis.max(last + 1);
        match LAST_ENROLLMENT_MILLIS.compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// An active enrollment joined with the course it points at.
#[derive(Debug, Clone, Serialize)]
pub struct StudentEnrollment {
    pub enrollment: EnrollmentRecord,
    /// `None` when the course was removed from the catalogue.
    pub course: Option<CourseRecord>,
}
