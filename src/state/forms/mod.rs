//! Form engine
//!
//! Data-driven multi-step forms: typed values, declarative validation,
//! derived fields, payload mapping and the controller that ties them
//! together.

mod derived;
mod field;
mod form_state;
mod mapping;
mod validation;

pub use derived::{
    age_at_death_rule, age_rule, next_visit_rule, username_from_email, username_suggestion_rule,
    visit_interval_months, whole_years_between, DerivedFieldRule, WritePolicy,
};
pub use field::{parse_date, FieldValue, FormValues, DATE_FORMAT};
pub use form_state::{
    CancelGate, FormPhase, FormSpec, LoadOutcome, StepBlocked, StepDefinition,
    StepFormController, SubmitBlocked, SubmitOutcome,
};
pub use mapping::{to_camel_case, Coercion, FieldMapping, PayloadMapping, SubmissionPayload};
pub use validation::{
    Condition, CrossField, FieldErrors, FieldRule, Format, Requirement, ValidationSchema,
};
