//! Derived field rules
//!
//! A derived rule recomputes one or more output fields from declared input
//! fields. The controller re-runs a rule whenever one of its inputs changes
//! and never lets it write into a field the user has touched.

use super::field::{FieldValue, FormValues};
use chrono::{Months, NaiveDate};
use std::fmt;
use std::sync::Arc;

type ComputeFn = Arc<dyn Fn(&FormValues) -> FormValues + Send + Sync>;

/// When a rule may overwrite an untouched output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Any untouched output
    #[default]
    Untouched,
    /// Untouched outputs that are empty or still hold a value this rule wrote
    FillEmpty,
}

/// Recomputes dependent fields from input fields
#[derive(Clone)]
pub struct DerivedFieldRule {
    pub name: &'static str,
    pub inputs: &'static [&'static str],
    pub outputs: &'static [&'static str],
    pub policy: WritePolicy,
    compute: ComputeFn,
}

impl fmt::Debug for DerivedFieldRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedFieldRule")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("policy", &self.policy)
            .finish()
    }
}

impl DerivedFieldRule {
    pub fn new(
        name: &'static str,
        inputs: &'static [&'static str],
        outputs: &'static [&'static str],
        compute: impl Fn(&FormValues) -> FormValues + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            inputs,
            outputs,
            policy: WritePolicy::Untouched,
            compute: Arc::new(compute),
        }
    }

    pub fn fill_empty_only(mut self) -> Self {
        self.policy = WritePolicy::FillEmpty;
        self
    }

    /// Run the rule. Entries for undeclared fields are dropped.
    pub fn compute(&self, values: &FormValues) -> FormValues {
        (self.compute)(values)
            .iter()
            .filter(|(name, _)| self.writes(name))
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }

    pub fn reads(&self, field: &str) -> bool {
        self.inputs.contains(&field)
    }

    pub fn writes(&self, field: &str) -> bool {
        self.outputs.contains(&field)
    }
}

/// Whole years from `from` to `to` (floor). `None` if `to` precedes `from`.
pub fn whole_years_between(from: NaiveDate, to: NaiveDate) -> Option<i64> {
    to.years_since(from).map(i64::from)
}

/// Months until the next family-planning visit for a method
pub fn visit_interval_months(method: &str) -> u32 {
    match method.trim().to_ascii_lowercase().as_str() {
        "iud" => 6,
        "implant" => 12,
        _ => 3,
    }
}

/// Local part of an email address, lower-cased
pub fn username_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase()
}

/// `age_at_death` from `date_of_birth` and `date_of_death`
pub fn age_at_death_rule() -> DerivedFieldRule {
    DerivedFieldRule::new(
        "age_at_death",
        &["date_of_birth", "date_of_death"],
        &["age_at_death"],
        |values| {
            match (values.date("date_of_birth"), values.date("date_of_death")) {
                (Some(born), Some(died)) => whole_years_between(born, died)
                    .map(|years| FormValues::new().with("age_at_death", years))
                    .unwrap_or_default(),
                _ => FormValues::new(),
            }
        },
    )
}

/// `age` from `date_of_birth`, measured at a fixed reference date
pub fn age_rule(reference: NaiveDate) -> DerivedFieldRule {
    DerivedFieldRule::new("age", &["date_of_birth"], &["age"], move |values| {
        values
            .date("date_of_birth")
            .and_then(|born| whole_years_between(born, reference))
            .map(|years| FormValues::new().with("age", years))
            .unwrap_or_default()
    })
}

/// `next_visit_date` from `visit_date` plus the method's interval
pub fn next_visit_rule() -> DerivedFieldRule {
    DerivedFieldRule::new(
        "next_visit_date",
        &["method", "visit_date"],
        &["next_visit_date"],
        |values| {
            let method = values.text("method");
            if method.trim().is_empty() {
                return FormValues::new();
            }
            values
                .date("visit_date")
                .and_then(|visit| {
                    visit.checked_add_months(Months::new(visit_interval_months(&method)))
                })
                .map(|next| FormValues::new().with("next_visit_date", next))
                .unwrap_or_default()
        },
    )
}

/// `username` suggested from the local part of `email`
pub fn username_suggestion_rule() -> DerivedFieldRule {
    DerivedFieldRule::new("username", &["email"], &["username"], |values| {
        let suggestion = username_from_email(&values.text("email"));
        let value = if suggestion.is_empty() {
            FieldValue::Empty
        } else {
            FieldValue::Text(suggestion)
        };
        FormValues::new().with("username", value)
    })
    .fill_empty_only()
}
