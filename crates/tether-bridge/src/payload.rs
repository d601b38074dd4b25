// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Typed payloads decoded from native responses, alongside the ResultAPI.

use std::collections::BTreeMap;

use tether_core::value::Value;

/// A Game Center achievement as reported by `loadAchievements`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Achievement {
    pub identifier: String,
    /// Progress percentage, kept in the textual form the native layer sends.
    pub percent: String,
    pub completed: bool,
}

impl Achievement {
    pub fn from_value(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            identifier: value.str_or("identifier", "").to_owned(),
            percent: match value.get_field("percent") {
                Some(Value::Null) | None => String::new(),
                Some(v) => v.to_plain_string(),
            },
            completed: value.bool_or("completed", false),
        })
    }
}

/// Method-specific data accompanying a ResultAPI.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// Nothing beyond the ResultAPI.
    #[default]
    Empty,
    Text(String),
    Mapping(BTreeMap<String, String>),
    /// A request key together with per-player values keyed by player id.
    KeyedMapping {
        key: String,
        entries: BTreeMap<i64, String>,
    },
    Achievements(Vec<Achievement>),
    Permissions {
        granted: Vec<String>,
        denied: Vec<String>,
    },
}

impl Payload {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Empty => "empty",
            Payload::Text(_) => "text",
            Payload::Mapping(_) => "mapping",
            Payload::KeyedMapping { .. } => "keyed-mapping",
            Payload::Achievements(_) => "achievements",
            Payload::Permissions { .. } => "permissions",
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Payload::Empty)
    }
}

/// Collect the string items of an array field. Non-string items are
/// stringified; a missing or non-array field yields an empty list.
pub fn string_list(response: &Value, key: &str) -> Vec<String> {
    response
        .get_field(key)
        .and_then(Value::as_array)
        .map(|items| items.iter().map(Value::to_plain_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievement_tolerates_partial_records() {
        let v = Value::parse(r#"{"identifier":"first_win","completed":true}"#).expect("parse");
        let a = Achievement::from_value(&v).expect("object");
        assert_eq!(a.identifier, "first_win");
        assert_eq!(a.percent, "");
        assert!(a.completed);
    }

    #[test]
    fn achievement_accepts_numeric_percent() {
        let v = Value::parse(r#"{"identifier":"x","percent":42.5}"#).expect("parse");
        assert_eq!(Achievement::from_value(&v).expect("object").percent, "42.5");
    }

    #[test]
    fn achievement_rejects_non_objects() {
        assert_eq!(Achievement::from_value(&Value::from("x")), None);
    }

    #[test]
    fn string_list_defaults_to_empty() {
        let v = Value::parse(r#"{"granted":["camera",3],"denied":"nope"}"#).expect("parse");
        assert_eq!(string_list(&v, "granted"), vec!["camera".to_string(), "3".to_string()]);
        assert!(string_list(&v, "denied").is_empty());
        assert!(string_list(&v, "missing").is_empty());
    }
}
