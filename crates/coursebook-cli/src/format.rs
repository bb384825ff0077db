use chrono::{DateTime, NaiveDate, Utc};
use coursebook_core::models::{CourseRecord, CourseType, Level};
use coursebook_core::schedule::FormattedCourse;

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Day heading for the week view, e.g. `Mon 15 Jan`
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a %d %b").to_string()
}

/// Enrollment timestamp in a readable form
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%b %d, %Y %H:%M").to_string()
}

pub fn format_course_line(course: &CourseRecord) -> String {
    format!(
        "{:<10} {:<20} {:<6} {:<10} {:<10} {:>5} {:>9}",
        truncate_string(&course.id, 10),
        truncate_string(&course.language, 20),
        course.level.as_str(),
        course.course_type.as_str(),
        course.schedule.date.as_deref().unwrap_or("-"),
        course.schedule.time,
        course.display_seats(),
    )
}

pub fn format_slot(slot: &FormattedCourse) -> String {
    let status = if slot.is_full() {
        "full".to_string()
    } else {
        format!("{} left", slot.available_seats())
    };
    format!(
        "  {}-{}  {:<20} {:<10} {}",
        slot.start_time,
        slot.end_time,
        truncate_string(&slot.course.language, 20),
        truncate_string(&slot.course.id, 10),
        status
    )
}

/// Accepts the stored spelling as well as the calendar key (`adults`/`children`).
pub fn parse_level(s: &str) -> Option<Level> {
    match s.trim().to_lowercase().as_str() {
        "adult" | "adults" => Some(Level::Adult),
        "child" | "children" => Some(Level::Child),
        _ => None,
    }
}

/// Accepts the stored spelling as well as the calendar key (`inPerson`/`online`).
pub fn parse_course_type(s: &str) -> Option<CourseType> {
    match s.trim().to_lowercase().as_str() {
        "presentiel" | "inperson" => Some(CourseType::Presentiel),
        "visio" | "online" => Some(CourseType::Visio),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Français avancé", 8), "Franç...");
    }

    #[test]
    fn test_format_day() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(format_day(date), "Mon 15 Jan");
    }

    #[test]
    fn test_parse_filters() {
        assert_eq!(parse_level("Children"), Some(Level::Child));
        assert_eq!(parse_level("adult"), Some(Level::Adult));
        assert_eq!(parse_level("teens"), None);
        assert_eq!(parse_course_type("inPerson"), Some(CourseType::Presentiel));
        assert_eq!(parse_course_type("visio"), Some(CourseType::Visio));
        assert_eq!(parse_course_type("hybrid"), None);
    }
}
