use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "ts")]
use ts_rs::TS;

/// Audience of a course. Anything other than an explicit `child` is treated as adult.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Adult,
    Child,
}

impl Level {
    pub const ALL: [Level; 2] = [Level::Adult, Level::Child];

    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.trim().eq_ignore_ascii_case("child") => Level::Child,
            _ => Level::Adult,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Adult => "adult",
            Level::Child => "child",
        }
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(Level::from_str(raw.as_deref()))
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery mode. Anything other than an explicit `visio` is treated as on-site.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum CourseType {
    #[default]
    Presentiel,
    Visio,
}

impl CourseType {
    pub const ALL: [CourseType; 2] = [CourseType::Presentiel, CourseType::Visio];

    pub fn from_str(s: Option<&str>) -> Self {
        match s {
            Some(v) if v.trim().eq_ignore_ascii_case("visio") => CourseType::Visio,
            _ => CourseType::Presentiel,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CourseType::Presentiel => "presentiel",
            CourseType::Visio => "visio",
        }
    }
}

impl<'de> Deserialize<'de> for CourseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(CourseType::from_str(raw.as_deref()))
    }
}

impl std::fmt::Display for CourseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
#[serde(rename_all = "lowercase")]
pub enum CourseStatus {
    #[default]
    Active,
    Inactive,
}

impl<'de> Deserialize<'de> for CourseStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw.as_deref() {
            Some(v) if v.eq_ignore_ascii_case("inactive") => CourseStatus::Inactive,
            _ => CourseStatus::Active,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CourseSchedule {
    /// ISO date (`YYYY-MM-DD`). Courses without one cannot be placed in a calendar.
    #[serde(default)]
    pub date: Option<String>,
    /// Start time, `HH:MM`.
    #[serde(default)]
    pub time: String,
    /// Duration code such as `1h30`.
    #[serde(default)]
    pub duration: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct CourseRecord {
    pub id: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub level: Level,
    #[serde(rename = "type", default)]
    pub course_type: CourseType,
    #[serde(default)]
    pub schedule: CourseSchedule,
    #[serde(rename = "maxStudents")]
    pub max_students: u32,
    #[serde(rename = "enrolledStudents", default)]
    pub enrolled_students: u32,
    #[serde(default)]
    pub status: CourseStatus,
    #[serde(rename = "teacherId", default)]
    pub teacher_id: Option<String>,
    /// Fields the booking site stores that the data layer does not interpret
    /// (title, price, room...). Kept so overlay writes don't drop them.
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl CourseRecord {
    pub fn is_full(&self) -> bool {
        self.enrolled_students >= self.max_students
    }

    pub fn is_active(&self) -> bool {
        self.status == CourseStatus::Active
    }

    pub fn available_seats(&self) -> u32 {
        self.max_students.saturating_sub(self.enrolled_students)
    }

    pub fn display_seats(&self) -> String {
        format!("{}/{}", self.enrolled_students, self.max_students)
    }
}
