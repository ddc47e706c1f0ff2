//! Mapping between internal form values and backend records

use super::field::{parse_date, FieldValue, FormValues, DATE_FORMAT};
use serde::Serialize;
use serde_json::{Map, Number, Value};

/// Wire type a field is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    Integer,
    Decimal,
    Date,
    Bool,
}

/// One internal field and its backend name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    pub internal: &'static str,
    pub external: String,
    pub coercion: Coercion,
}

impl FieldMapping {
    pub fn new(internal: &'static str, external: &str, coercion: Coercion) -> Self {
        Self {
            internal,
            external: external.to_string(),
            coercion,
        }
    }

    /// Backend name is the camelCase form of the internal name
    pub fn camel(internal: &'static str, coercion: Coercion) -> Self {
        Self {
            internal,
            external: to_camel_case(internal),
            coercion,
        }
    }

    /// Wire value for one field. Text is sent trimmed, so a record whose
    /// text carries surrounding whitespace comes back with the same content
    /// but not byte for byte.
    fn to_json(&self, value: &FieldValue) -> Value {
        let raw = || Value::String(value.as_text().trim().to_string());
        match self.coercion {
            Coercion::Text => raw(),
            Coercion::Integer => match (value.as_integer(), value.as_number()) {
                (Some(n), _) => Value::from(n),
                (None, Some(n)) => Number::from_f64(n).map(Value::Number).unwrap_or_else(raw),
                (None, None) => raw(),
            },
            Coercion::Decimal => value
                .as_number()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(raw),
            Coercion::Date => value
                .as_date()
                .map(|d| Value::String(d.format(DATE_FORMAT).to_string()))
                .unwrap_or_else(raw),
            Coercion::Bool => value.as_bool().map(Value::Bool).unwrap_or_else(raw),
        }
    }

    fn from_json(&self, value: &Value) -> FieldValue {
        match (self.coercion, value) {
            (_, Value::Null) => FieldValue::Empty,
            (Coercion::Text, Value::String(s)) => FieldValue::Text(s.clone()),
            (Coercion::Text, other) => FieldValue::Text(other.to_string()),
            (Coercion::Integer | Coercion::Decimal, Value::Number(n)) => {
                n.as_f64().map(FieldValue::Number).unwrap_or_default()
            }
            (Coercion::Integer | Coercion::Decimal, Value::String(s)) => s
                .trim()
                .parse::<f64>()
                .map(FieldValue::Number)
                .unwrap_or_else(|_| FieldValue::Text(s.clone())),
            (Coercion::Date, Value::String(s)) => parse_date(s)
                .map(FieldValue::Date)
                .unwrap_or_else(|| FieldValue::Text(s.clone())),
            (Coercion::Bool, Value::Bool(b)) => FieldValue::Bool(*b),
            (Coercion::Bool, other) => {
                let text = FieldValue::from_json(other);
                text.as_bool().map(FieldValue::Bool).unwrap_or(text)
            }
            (_, other) => FieldValue::from_json(other),
        }
    }
}

/// Backend-shaped object sent on create/update
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct SubmissionPayload(Map<String, Value>);

impl SubmissionPayload {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// Field mappings of one form
#[derive(Debug, Clone, Default)]
pub struct PayloadMapping {
    fields: Vec<FieldMapping>,
}

impl PayloadMapping {
    pub fn new(fields: Vec<FieldMapping>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    /// Build the payload. Empty fields and fields without a mapping are
    /// left out.
    pub fn to_payload(&self, values: &FormValues) -> SubmissionPayload {
        let map = self
            .fields
            .iter()
            .filter(|m| !values.get(m.internal).is_empty())
            .map(|m| (m.external.clone(), m.to_json(values.get(m.internal))))
            .collect();
        SubmissionPayload(map)
    }

    /// Map a fetched record into form values (edit mode)
    pub fn from_record(&self, record: &Value) -> FormValues {
        let Some(object) = record.as_object() else {
            return FormValues::new();
        };
        self.fields
            .iter()
            .filter_map(|m| {
                object
                    .get(&m.external)
                    .map(|v| m.from_json(v))
                    .filter(|v| !v.is_empty())
                    .map(|v| (m.internal, v))
            })
            .collect()
    }

    /// Internal field for a backend field name. Internal names are accepted
    /// as-is.
    pub fn internal_name(&self, name: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|m| m.external == name)
            .or_else(|| self.fields.iter().find(|m| m.internal == name))
            .map(|m| m.internal)
    }

    pub fn external_name(&self, internal: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|m| m.internal == internal)
            .map(|m| m.external.as_str())
    }
}

/// `date_of_birth` -> `dateOfBirth`
pub fn to_camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper_next = false;
    for c in snake.chars() {
        if c == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}
