//! Form field value objects

use chrono::{DateTime, NaiveDate};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Date format used for every date field, internally and on the wire
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Type-safe field values
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl FieldValue {
    /// Create a text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// True for `Empty` and for text that is blank after trimming
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Get the text value (numbers, dates and booleans are rendered)
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Empty => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            FieldValue::Bool(b) => b.to_string(),
        }
    }

    /// Get the date value, parsing `YYYY-MM-DD` text (or the date part of an
    /// RFC 3339 timestamp)
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            FieldValue::Text(s) => parse_date(s),
            _ => None,
        }
    }

    /// Get the numeric value, parsing text
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if n.is_finite() => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Get the value as a whole number, if it is one
    pub fn as_integer(&self) -> Option<i64> {
        self.as_number()
            .filter(|n| n.fract() == 0.0 && n.abs() < i64::MAX as f64)
            .map(|n| n as i64)
    }

    /// Get the boolean value. Text "true"/"yes"/"1" counts as true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Some(true),
                "false" | "no" | "0" => Some(false),
                _ => None,
            },
            FieldValue::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Compare by content. A typed value and text that parses to it are the
    /// same, so a loaded `Date` matches the date typed back in.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        if self == other || (self.is_empty() && other.is_empty()) {
            return true;
        }
        match (self, other) {
            (FieldValue::Date(d), text @ FieldValue::Text(_))
            | (text @ FieldValue::Text(_), FieldValue::Date(d)) => text.as_date() == Some(*d),
            (FieldValue::Number(n), text @ FieldValue::Text(_))
            | (text @ FieldValue::Text(_), FieldValue::Number(n)) => text.as_number() == Some(*n),
            (FieldValue::Bool(b), text @ FieldValue::Text(_))
            | (text @ FieldValue::Text(_), FieldValue::Bool(b)) => text.as_bool() == Some(*b),
            _ => false,
        }
    }

    /// Loose conversion from a JSON value (used for value files and tests)
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => FieldValue::Empty,
            Value::Bool(b) => FieldValue::Bool(*b),
            Value::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
            Value::String(s) => FieldValue::Text(s.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_text())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Number(f64::from(value))
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Current values of a form, keyed by field name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FormValues {
    values: BTreeMap<String, FieldValue>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: &str, value: impl Into<FieldValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn get(&self, name: &str) -> &FieldValue {
        static EMPTY: FieldValue = FieldValue::Empty;
        self.values.get(name).unwrap_or(&EMPTY)
    }

    pub fn set(&mut self, name: &str, value: impl Into<FieldValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        self.values.remove(name)
    }

    pub fn is_empty_field(&self, name: &str) -> bool {
        self.get(name).is_empty()
    }

    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        self.get(name).as_date()
    }

    pub fn text(&self, name: &str) -> String {
        self.get(name).as_text()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Compare two value sets by content, treating a missing field and an
    /// empty one as equal
    pub fn same_content(&self, other: &FormValues) -> bool {
        let covers = |a: &FormValues, b: &FormValues| {
            a.values
                .iter()
                .all(|(name, value)| value.same_as(b.get(name)))
        };
        covers(self, other) && covers(other, self)
    }

    /// Build from a JSON object with `FieldValue::from_json` per entry
    pub fn from_json_object(object: &serde_json::Map<String, Value>) -> Self {
        let values = object
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect();
        Self { values }
    }
}

impl<'a> FromIterator<(&'a str, FieldValue)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (&'a str, FieldValue)>>(iter: I) -> Self {
        let values = iter
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Self { values }
    }
}

/// Parse `YYYY-MM-DD`, also accepting the date part of an RFC 3339 timestamp
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
