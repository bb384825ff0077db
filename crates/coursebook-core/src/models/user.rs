use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[cfg(feature = "ts")]
use ts_rs::TS;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(TS), ts(export))]
pub struct UserRecord {
    pub id: String,
    pub email: String,
    #[serde(rename = "firstName", default)]
    pub first_name: Option<String>,
    #[serde(rename = "lastName", default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(flatten)]
    #[cfg_attr(feature = "ts", ts(skip))]
    pub extra: Map<String, Value>,
}

impl UserRecord {
    pub fn full_name(&self) -> String {
        match (&self.first_name, &self.last_name) {
            (Some(first), Some(last)) => format!("{} {}", first, last),
            (Some(first), None) => first.clone(),
            (None, Some(last)) => last.clone(),
            (None, None) => self.email.clone(),
        }
    }

    pub fn has_email(&self, email: &str) -> bool {
        self.email.trim().eq_ignore_ascii_case(email.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name_falls_back_to_email() {
        let json = r#"{"id": "u1", "email": "anna@example.com"}"#;
        let user: UserRecord = serde_json::from_str(json).expect("user should parse");
        assert_eq!(user.full_name(), "anna@example.com");

        let json = r#"{"id": "u2", "email": "b@example.com", "firstName": "Bob", "lastName": "Martin", "role": "student"}"#;
        let user: UserRecord = serde_json::from_str(json).expect("user should parse");
        assert_eq!(user.full_name(), "Bob Martin");
    }

    #[test]
    fn test_has_email_ignores_case() {
        let json = r#"{"id": "u1", "email": "Anna@Example.com"}"#;
        let user: UserRecord = serde_json::from_str(json).expect("user should parse");
        assert!(user.has_email("anna@example.com "));
        assert!(!user.has_email("bob@example.com"));
    }
}
