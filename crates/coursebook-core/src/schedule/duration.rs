use std::sync::OnceLock;

use regex::Regex;

/// Free-form `<N>h[<M>min]` codes, e.g. `4h`, `1h45`, `1h45min`.
static FREEFORM_DURATION: OnceLock<Regex> = OnceLock::new();

fn freeform_duration() -> &'static Regex {
    FREEFORM_DURATION.get_or_init(|| {
        Regex::new(r"^(?i)\s*(\d{1,2})\s*h\s*(?:(\d{1,2})\s*(?:min)?)?\s*$")
            .expect("duration pattern is valid")
    })
}

/// Course length as written in the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DurationCode {
    ThirtyMinutes,
    OneHour,
    NinetyMinutes,
    TwoHours,
    TwoAndAHalfHours,
    ThreeHours,
    /// Parsed from the free-form `<N>h[<M>min]` syntax.
    Custom { hours: u32, minutes: u32 },
    /// Not understood; contributes no length.
    Unrecognized(String),
}

impl DurationCode {
    pub fn parse(code: &str) -> Self {
        match code.trim() {
            "30min" => DurationCode::ThirtyMinutes,
            "1h" => DurationCode::OneHour,
            "1h30" => DurationCode::NinetyMinutes,
            "2h" => DurationCode::TwoHours,
            "2h30" => DurationCode::TwoAndAHalfHours,
            "3h" => DurationCode::ThreeHours,
            other => Self::parse_freeform(other)
                .unwrap_or_else(|| DurationCode::Unrecognized(code.to_string())),
        }
    }

    fn parse_freeform(code: &str) -> Option<Self> {
        let caps = freeform_duration().captures(code)?;
        let hours = caps.get(1)?.as_str().parse().ok()?;
        let minutes = match caps.get(2) {
            Some(m) => m.as_str().parse().ok()?,
            None => 0,
        };
        Some(DurationCode::Custom { hours, minutes })
    }

    /// `(hours, minutes)`, or `None` when the code was not understood.
    pub fn hours_minutes(&self) -> Option<(u32, u32)> {
        match self {
            DurationCode::ThirtyMinutes => Some((0, 30)),
            DurationCode::OneHour => Some((1, 0)),
            DurationCode::NinetyMinutes => Some((1, 30)),
            DurationCode::TwoHours => Some((2, 0)),
            DurationCode::TwoAndAHalfHours => Some((2, 30)),
            DurationCode::ThreeHours => Some((3, 0)),
            DurationCode::Custom { hours, minutes } => Some((*hours, *minutes)),
            DurationCode::Unrecognized(_) => None,
        }
    }

    pub fn total_minutes(&self) -> Option<u32> {
        self.hours_minutes().map(|(h, m)| h * 60 + m)
    }
}

fn parse_clock(time: &str) -> Option<u32> {
    let (hours, minutes) = time.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if hours >= 24 || minutes >= 60 {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Add a duration code to an `HH:MM` start time.
///
/// Minutes carry into hours and hours wrap past midnight. Unparsable
/// durations (or start times) return the start time unchanged.
pub fn end_time(start_time: &str, duration: &str) -> String {
    let Some(start) = parse_clock(start_time) else {
        return start_time.to_string();
    };
    let Some(length) = DurationCode::parse(duration).total_minutes() else {
        return start_time.to_string();
    };

    let end = (start + length) % (24 * 60);
    format!("{:02}:{:02}", end / 60, end % 60)
}
