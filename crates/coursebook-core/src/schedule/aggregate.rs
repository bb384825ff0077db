use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use super::duration::end_time;
use super::keys::{language_key, level_key, type_key};
use crate::models::{CourseRecord, CourseType, Level};

/// A course ready for the calendar: the record plus derived display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormattedCourse {
    #[serde(flatten)]
    pub course: CourseRecord,
    #[serde(rename = "languageKey")]
    pub language_key: String,
    #[serde(rename = "levelKey")]
    pub level_key: String,
    #[serde(rename = "typeKey")]
    pub type_key: String,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    pub duration: String,
}

impl FormattedCourse {
    pub fn from_course(course: &CourseRecord) -> Self {
        let start_time = course.schedule.time.clone();
        let duration = course.schedule.duration.clone();
        Self {
            language_key: language_key(&course.language),
            level_key: level_key(course.level).to_string(),
            type_key: type_key(course.course_type).to_string(),
            end_time: end_time(&start_time, &duration),
            start_time,
            duration,
            course: course.clone(),
        }
    }

    pub fn available_seats(&self) -> u32 {
        self.course.available_seats()
    }

    pub fn is_full(&self) -> bool {
        self.course.is_full()
    }
}

/// ISO date → courses on that date, in source order.
pub type DateMap = BTreeMap<String, Vec<FormattedCourse>>;

/// `level → type → date → courses`.
///
/// Always holds all four level/type buckets, even when empty. Rebuilt
/// wholesale from the course collection; never patched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScheduleIndex {
    levels: BTreeMap<Level, BTreeMap<CourseType, DateMap>>,
}

impl Default for ScheduleIndex {
    fn default() -> Self {
        let levels = Level::ALL
            .iter()
            .map(|&level| {
                let types = CourseType::ALL
                    .iter()
                    .map(|&course_type| (course_type, DateMap::new()))
                    .collect();
                (level, types)
            })
            .collect();
        Self { levels }
    }
}

impl ScheduleIndex {
    pub fn bucket(&self, level: Level, course_type: CourseType) -> Option<&DateMap> {
        self.levels.get(&level).and_then(|types| types.get(&course_type))
    }

    pub fn courses_on(&self, level: Level, course_type: CourseType, date: &str) -> &[FormattedCourse] {
        self.bucket(level, course_type)
            .and_then(|dates| dates.get(date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Seven consecutive days starting at `start`, each with its courses.
    /// Days without courses are included so the calendar can render them.
    pub fn week(
        &self,
        level: Level,
        course_type: CourseType,
        start: NaiveDate,
    ) -> Vec<(NaiveDate, &[FormattedCourse])> {
        (0..7)
            .map(|offset| {
                let day = start + Duration::days(offset);
                let key = day.format("%Y-%m-%d").to_string();
                (day, self.courses_on(level, course_type, &key))
            })
            .collect()
    }

    /// Every course across all buckets.
    pub fn total_courses(&self) -> usize {
        self.levels
            .values()
            .flat_map(|types| types.values())
            .flat_map(|dates| dates.values())
            .map(Vec::len)
            .sum()
    }

    pub fn find(&self, course_id: &str) -> Option<&FormattedCourse> {
        self.levels
            .values()
            .flat_map(|types| types.values())
            .flat_map(|dates| dates.values())
            .flatten()
            .find(|c| c.course.id == course_id)
    }

    fn push(&mut self, level: Level, course_type: CourseType, date: &str, course: FormattedCourse) {
        self.levels
            .entry(level)
            .or_default()
            .entry(course_type)
            .or_default()
            .entry(date.to_string())
            .or_default()
            .push(course);
    }
}

/// Monday of the week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Reshape a flat course list into the nested calendar index.
///
/// Pure and deterministic: within each date list, courses keep their
/// order from `courses`. Courses without a date are left out.
pub fn aggregate(courses: &[CourseRecord]) -> ScheduleIndex {
    let mut index = ScheduleIndex::default();

    for course in courses {
        let Some(date) = course.schedule.date.as_deref().filter(|d| !d.trim().is_empty()) else {
            continue;
        };
        index.push(
            course.level,
            course.course_type,
            date.trim(),
            FormattedCourse::from_course(course),
        );
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn course(id: &str, level: &str, kind: &str, date: Option<&str>, time: &str) -> CourseRecord {
        serde_json::from_value(json!({
            "id": id,
            "language": "Anglais",
            "level": level,
            "type": kind,
            "schedule": {"date": date, "time": time, "duration": "1h30"},
            "maxStudents": 6,
            "enrolledStudents": 2,
            "status": "active",
            "teacherId": "t1"
        }))
        .expect("fixture course should parse")
    }

    #[test]
    fn test_empty_input_has_all_four_buckets() {
        let index = aggregate(&[]);
        for level in Level::ALL {
            for kind in CourseType::ALL {
                assert!(index.bucket(level, kind).is_some_and(|b| b.is_empty()));
            }
        }
        assert_eq!(index.total_courses(), 0);
    }

    #[test]
    fn test_courses_are_bucketed_with_defaults() {
        let courses = vec![
            course("a", "child", "visio", Some("2024-01-15"), "10:00"),
            course("b", "teen", "hybrid", Some("2024-01-15"), "11:00"),
            course("c", "adult", "presentiel", Some("2024-01-16"), "09:00"),
        ];
        let index = aggregate(&courses);

        assert_eq!(index.courses_on(Level::Child, CourseType::Visio, "2024-01-15")[0].course.id, "a");
        // Unknown level/type fall back to adult/presentiel
        let adult_day = index.courses_on(Level::Adult, CourseType::Presentiel, "2024-01-15");
        assert_eq!(adult_day.len(), 1);
        assert_eq!(adult_day[0].course.id, "b");
        assert_eq!(index.total_courses(), 3);
    }

    #[test]
    fn test_courses_without_date_are_excluded() {
        let courses = vec![
            course("a", "adult", "visio", None, "10:00"),
            course("b", "adult", "visio", Some(""), "10:00"),
            course("c", "adult", "visio", Some("2024-01-15"), "10:00"),
        ];
        let index = aggregate(&courses);
        assert_eq!(index.total_courses(), 1);
        assert!(index.find("a").is_none());
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let courses = vec![
            course("late", "adult", "visio", Some("2024-01-15"), "18:00"),
            course("early", "adult", "visio", Some("2024-01-15"), "08:00"),
            course("mid", "adult", "visio", Some("2024-01-15"), "12:00"),
        ];
        let index = aggregate(&courses);
        let ids: Vec<_> = index
            .courses_on(Level::Adult, CourseType::Visio, "2024-01-15")
            .iter()
            .map(|c| c.course.id.as_str())
            .collect();
        assert_eq!(ids, ["late", "early", "mid"]);
    }

    #[test]
    fn test_aggregate_is_deterministic() {
        let courses = vec![
            course("a", "child", "visio", Some("2024-01-17"), "10:00"),
            course("b", "adult", "visio", Some("2024-01-15"), "11:00"),
            course("c", "adult", "visio", Some("2024-01-15"), "09:00"),
        ];
        let first = aggregate(&courses);
        let second = aggregate(&courses);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_formatted_fields() {
        let index = aggregate(&[course("a", "child", "visio", Some("2024-01-15"), "09:00")]);
        let formatted = index.find("a").expect("course a is indexed");
        assert_eq!(formatted.language_key, "english");
        assert_eq!(formatted.level_key, "children");
        assert_eq!(formatted.type_key, "online");
        assert_eq!(formatted.start_time, "09:00");
        assert_eq!(formatted.end_time, "10:30");
        assert_eq!(formatted.duration, "1h30");
        assert_eq!(formatted.available_seats(), 4);
    }

    #[test]
    fn test_serialized_shape() {
        let index = aggregate(&[course("a", "child", "visio", Some("2024-01-15"), "09:00")]);
        let value = serde_json::to_value(&index).unwrap();
        let day = &value["child"]["visio"]["2024-01-15"][0];
        assert_eq!(day["id"], "a");
        assert_eq!(day["endTime"], "10:30");
        assert_eq!(day["enrolledStudents"], 2);
        assert!(value["adult"]["presentiel"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_week_view() {
        let courses = vec![
            course("mon", "adult", "visio", Some("2024-01-15"), "10:00"),
            course("sun", "adult", "visio", Some("2024-01-21"), "10:00"),
            course("next", "adult", "visio", Some("2024-01-22"), "10:00"),
        ];
        let index = aggregate(&courses);
        let wednesday = NaiveDate::from_ymd_opt(2024, 1, 17).unwrap();
        let monday = week_start(wednesday);
        assert_eq!(monday, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let week = index.week(Level::Adult, CourseType::Visio, monday);
        assert_eq!(week.len(), 7);
        assert_eq!(week[0].1[0].course.id, "mon");
        assert!(week[1].1.is_empty());
        assert_eq!(week[6].1[0].course.id, "sun");
    }
}
