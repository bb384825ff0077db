use crate::models::{CourseType, Level};

/// Catalogue language names (French and English spellings) to translation keys.
const LANGUAGE_KEYS: &[(&str, &str)] = &[
    ("anglais", "english"),
    ("english", "english"),
    ("espagnol", "spanish"),
    ("spanish", "spanish"),
    ("allemand", "german"),
    ("german", "german"),
    ("italien", "italian"),
    ("italian", "italian"),
    ("portugais", "portuguese"),
    ("portuguese", "portuguese"),
    ("chinois", "chinese"),
    ("mandarin", "chinese"),
    ("chinese", "chinese"),
    ("japonais", "japanese"),
    ("japanese", "japanese"),
    ("arabe", "arabic"),
    ("arabic", "arabic"),
    ("russe", "russian"),
    ("russian", "russian"),
    ("français", "french"),
    ("francais", "french"),
    ("french", "french"),
    ("fle", "french"),
];

/// Translation key for a language name; unmapped names are lower-cased.
pub fn language_key(language: &str) -> String {
    let normalized = language.trim().to_lowercase();
    LANGUAGE_KEYS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, key)| key.to_string())
        .unwrap_or(normalized)
}

pub fn level_key(level: Level) -> &'static str {
    match level {
        Level::Adult => "adults",
        Level::Child => "children",
    }
}

pub fn type_key(course_type: CourseType) -> &'static str {
    match course_type {
        CourseType::Presentiel => "inPerson",
        CourseType::Visio => "online",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_key_lookup() {
        assert_eq!(language_key("Anglais"), "english");
        assert_eq!(language_key(" ESPAGNOL "), "spanish");
        assert_eq!(language_key("Français"), "french");
        assert_eq!(language_key("Mandarin"), "chinese");
    }

    #[test]
    fn test_language_key_fallback_lowercases() {
        assert_eq!(language_key("Swahili"), "swahili");
        assert_eq!(language_key(""), "");
    }

    #[test]
    fn test_level_and_type_keys() {
        assert_eq!(level_key(Level::Child), "children");
        assert_eq!(type_key(CourseType::Visio), "online");
    }
}
