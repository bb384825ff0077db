use thiserror::Error;

use crate::fetch::FetchError;
use crate::overlay::OverlayError;

/// Errors surfaced by `DataService` to the booking UI.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Could not load data: {0}")]
    Fetch(#[from] FetchError),

    #[error("The '{resource}' data is not in the expected format: {source}")]
    Malformed {
        resource: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Student {student_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { student_id: String, course_id: String },

    #[error("Course {course_id} is full")]
    CourseFull { course_id: String },

    #[error("Course {course_id} is not open for enrollment")]
    CourseInactive { course_id: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Could not save changes: {0}")]
    Storage(#[from] OverlayError),
}

impl DataError {
    /// Whether offering the user a "try again" makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            DataError::Fetch(e) => e.is_transient(),
            DataError::Storage(_) => true,
            _ => false,
        }
    }

    /// Domain rejections are the user's to fix, not a system failure.
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            DataError::AlreadyEnrolled { .. }
                | DataError::CourseFull { .. }
                | DataError::CourseInactive { .. }
                | DataError::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
