//! Declarative field constraints
//!
//! A [`ValidationSchema`] is a list of [`FieldRule`]s. Each rule is evaluated
//! against the whole value set so that conditional requiredness and
//! cross-field checks can look at other fields. Evaluation is pure: the same
//! values always produce the same errors.

use super::field::{FieldValue, FormValues};
use chrono::{NaiveDate, NaiveTime};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Field-scoped error messages, keyed by field name
pub type FieldErrors = BTreeMap<String, String>;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid")
});

// Nigerian mobile numbers, local (080...) or international (+234 80...)
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\+?234|0)[789][01]\d{8}$").expect("phone pattern is valid")
});

/// When a field must have a value
#[derive(Debug, Clone, PartialEq)]
pub enum Requirement {
    Required,
    Optional,
    /// Required only while another field satisfies the condition
    RequiredWhen {
        field: &'static str,
        condition: Condition,
    },
}

/// Predicate on another field's current value
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Text equal to the given value, ignoring case
    Equals(&'static str),
    IsTrue,
    NotEmpty,
}

impl Condition {
    pub fn holds(&self, value: &FieldValue) -> bool {
        match self {
            Condition::Equals(expected) => value.as_text().trim().eq_ignore_ascii_case(expected),
            Condition::IsTrue => value.as_bool().unwrap_or(false),
            Condition::NotEmpty => !value.is_empty(),
        }
    }
}

/// Format constraint applied to a non-empty value
#[derive(Debug, Clone)]
pub enum Format {
    Email,
    Phone,
    Date,
    /// A date no later than the given reference date
    PastDate(NaiveDate),
    Time,
    Integer { min: i64, max: i64 },
    Decimal { min: f64, max: f64 },
    OneOf(&'static [&'static str]),
    MinLength(usize),
    Pattern {
        regex: &'static LazyLock<Regex>,
        message: &'static str,
    },
}

impl Format {
    fn check(&self, label: &str, value: &FieldValue) -> Option<String> {
        match self {
            Format::Email => {
                let text = value.as_text();
                (!EMAIL_RE.is_match(text.trim())).then(|| "Enter a valid email address".to_string())
            }
            Format::Phone => {
                let normalized: String = value
                    .as_text()
                    .chars()
                    .filter(|c| !c.is_whitespace() && *c != '-')
                    .collect();
                (!PHONE_RE.is_match(&normalized))
                    .then(|| "Enter a valid phone number (e.g. 08012345678)".to_string())
            }
            Format::Date => value
                .as_date()
                .is_none()
                .then(|| "Use YYYY-MM-DD format".to_string()),
            Format::PastDate(reference) => match value.as_date() {
                None => Some("Use YYYY-MM-DD format".to_string()),
                Some(date) if date > *reference => Some(format!("{label} cannot be in the future")),
                Some(_) => None,
            },
            Format::Time => NaiveTime::parse_from_str(value.as_text().trim(), "%H:%M")
                .is_err()
                .then(|| "Use 24-hour HH:MM format".to_string()),
            Format::Integer { min, max } => match value.as_integer() {
                Some(n) if (*min..=*max).contains(&n) => None,
                _ => Some(format!(
                    "{label} must be a whole number between {min} and {max}"
                )),
            },
            Format::Decimal { min, max } => match value.as_number() {
                Some(n) if n >= *min && n <= *max => None,
                _ => Some(format!("{label} must be between {min} and {max}")),
            },
            Format::OneOf(options) => {
                let text = value.as_text();
                let text = text.trim();
                (!options.iter().any(|o| o.eq_ignore_ascii_case(text)))
                    .then(|| format!("{label} must be one of: {}", options.join(", ")))
            }
            Format::MinLength(min) => (value.as_text().chars().count() < *min)
                .then(|| format!("{label} must be at least {min} characters")),
            Format::Pattern { regex, message } => {
                (!regex.is_match(value.as_text().trim())).then(|| message.to_string())
            }
        }
    }
}

/// Constraint relating a field to another field
#[derive(Debug, Clone, PartialEq)]
pub enum CrossField {
    /// Value must equal the other field's value
    Matches {
        other: &'static str,
        message: &'static str,
    },
    /// Date must not be earlier than the other field's date. Skipped while
    /// the other date is missing or malformed.
    NotBefore {
        other: &'static str,
        message: &'static str,
    },
}

impl CrossField {
    fn other(&self) -> &'static str {
        match self {
            CrossField::Matches { other, .. } | CrossField::NotBefore { other, .. } => *other,
        }
    }

    fn check(&self, value: &FieldValue, values: &FormValues) -> Option<String> {
        match self {
            CrossField::Matches { other, message } => {
                (value.as_text() != values.text(other)).then(|| message.to_string())
            }
            CrossField::NotBefore { other, message } => {
                match (value.as_date(), values.date(other)) {
                    (Some(date), Some(earliest)) if date < earliest => Some(message.to_string()),
                    _ => None,
                }
            }
        }
    }
}

/// All constraints for one field
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: &'static str,
    pub label: &'static str,
    pub requirement: Requirement,
    pub format: Option<Format>,
    pub cross: Vec<CrossField>,
}

impl FieldRule {
    pub fn required(field: &'static str, label: &'static str) -> Self {
        Self {
            field,
            label,
            requirement: Requirement::Required,
            format: None,
            cross: Vec::new(),
        }
    }

    pub fn optional(field: &'static str, label: &'static str) -> Self {
        Self {
            requirement: Requirement::Optional,
            ..Self::required(field, label)
        }
    }

    pub fn required_when(
        field: &'static str,
        label: &'static str,
        other: &'static str,
        condition: Condition,
    ) -> Self {
        Self {
            requirement: Requirement::RequiredWhen {
                field: other,
                condition,
            },
            ..Self::required(field, label)
        }
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn matches(mut self, other: &'static str, message: &'static str) -> Self {
        self.cross.push(CrossField::Matches { other, message });
        self
    }

    pub fn not_before(mut self, other: &'static str, message: &'static str) -> Self {
        self.cross.push(CrossField::NotBefore { other, message });
        self
    }

    /// Whether the field currently needs a value
    pub fn is_required(&self, values: &FormValues) -> bool {
        match &self.requirement {
            Requirement::Required => true,
            Requirement::Optional => false,
            Requirement::RequiredWhen { field, condition } => condition.holds(values.get(field)),
        }
    }

    /// Other fields whose value this rule reads
    pub fn references(&self) -> impl Iterator<Item = &'static str> + '_ {
        let conditional = match &self.requirement {
            Requirement::RequiredWhen { field, .. } => Some(*field),
            _ => None,
        };
        conditional
            .into_iter()
            .chain(self.cross.iter().map(CrossField::other))
    }

    /// Evaluate: required check, then format, then cross-field
    pub fn check(&self, values: &FormValues) -> Option<String> {
        let value = values.get(self.field);
        if value.is_empty() {
            return self
                .is_required(values)
                .then(|| format!("{} is required", self.label));
        }
        if let Some(message) = self.format.as_ref().and_then(|f| f.check(self.label, value)) {
            return Some(message);
        }
        self.cross.iter().find_map(|c| c.check(value, values))
    }
}

/// The constraints of one form
#[derive(Debug, Clone, Default)]
pub struct ValidationSchema {
    rules: Vec<FieldRule>,
}

impl ValidationSchema {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn rule(&self, field: &str) -> Option<&FieldRule> {
        self.rules.iter().find(|r| r.field == field)
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Error for a single field, `None` when valid or unconstrained
    pub fn validate_field(&self, field: &str, values: &FormValues) -> Option<String> {
        self.rule(field).and_then(|r| r.check(values))
    }

    /// Errors for every constrained field
    pub fn validate_all(&self, values: &FormValues) -> FieldErrors {
        self.rules
            .iter()
            .filter_map(|r| r.check(values).map(|msg| (r.field.to_string(), msg)))
            .collect()
    }

    /// Fields whose rules read `field` (conditional requiredness or
    /// cross-field checks)
    pub fn dependents_of(&self, field: &str) -> Vec<&'static str> {
        self.rules
            .iter()
            .filter(|r| r.references().any(|other| other == field))
            .map(|r| r.field)
            .collect()
    }

    pub fn is_required(&self, field: &str, values: &FormValues) -> bool {
        self.rule(field).is_some_and(|r| r.is_required(values))
    }

    pub fn label(&self, field: &str) -> Option<&'static str> {
        self.rule(field).map(|r| r.label)
    }
}
