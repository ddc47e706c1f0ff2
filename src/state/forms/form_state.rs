//! Form state management: steps, validation gating and submission

use super::derived::{DerivedFieldRule, WritePolicy};
use super::field::{FieldValue, FormValues};
use super::mapping::{PayloadMapping, SubmissionPayload};
use super::validation::{FieldErrors, FieldRule, ValidationSchema};
use crate::service::{AsyncCallGateway, CallOutcome, ServiceError};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

type CompletionPredicate = Arc<dyn Fn(&FormValues, &FieldErrors) -> bool + Send + Sync>;

/// One step of a wizard
#[derive(Clone)]
pub struct StepDefinition {
    pub label: &'static str,
    pub fields: &'static [&'static str],
    predicate: Option<CompletionPredicate>,
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("label", &self.label)
            .field("fields", &self.fields)
            .field("custom_predicate", &self.predicate.is_some())
            .finish()
    }
}

impl StepDefinition {
    /// Step whose completion requires every field to pass the schema
    pub fn new(label: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            label,
            fields,
            predicate: None,
        }
    }

    /// Replace the default completion predicate
    pub fn with_predicate(
        mut self,
        predicate: impl Fn(&FormValues, &FieldErrors) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(&field)
    }

    pub fn is_complete(
        &self,
        schema: &ValidationSchema,
        values: &FormValues,
        errors: &FieldErrors,
    ) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(values, errors),
            None => self.fields.iter().all(|field| {
                !errors.contains_key(*field) && schema.validate_field(field, values).is_none()
            }),
        }
    }

    /// Fields of this step that currently fail, with their messages
    pub fn blocking_fields(
        &self,
        schema: &ValidationSchema,
        values: &FormValues,
        errors: &FieldErrors,
    ) -> FieldErrors {
        self.fields
            .iter()
            .filter_map(|field| {
                errors
                    .get(*field)
                    .cloned()
                    .or_else(|| schema.validate_field(field, values))
                    .map(|message| (field.to_string(), message))
            })
            .collect()
    }
}

/// Everything that configures one kind of form
#[derive(Debug, Clone, Default)]
pub struct FormSpec {
    pub name: &'static str,
    pub steps: Vec<StepDefinition>,
    pub schema: ValidationSchema,
    pub derived: Vec<DerivedFieldRule>,
    pub mapping: PayloadMapping,
    pub initial: FormValues,
}

impl FormSpec {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    pub fn rules(mut self, rules: Vec<FieldRule>) -> Self {
        self.schema = ValidationSchema::new(rules);
        self
    }

    pub fn derive(mut self, rule: DerivedFieldRule) -> Self {
        self.derived.push(rule);
        self
    }

    pub fn mapping(mut self, mapping: PayloadMapping) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn initial_values(mut self, values: FormValues) -> Self {
        self.initial = values;
        self
    }

    /// Index of the step holding `field`
    pub fn step_of(&self, field: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.contains(field))
    }
}

/// Top-level lifecycle of a form session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormPhase {
    #[default]
    Pristine,
    Editing,
    Submitting,
    SubmitSucceeded,
    SubmitFailed,
}

/// Advancing past a step was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step {number} ({label}) is incomplete", number = .step + 1)]
pub struct StepBlocked {
    pub step: usize,
    pub label: &'static str,
    /// Failing fields of the step and their messages
    pub fields: FieldErrors,
}

/// Submission was refused before reaching the gateway
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitBlocked {
    #[error("a submission is already in progress")]
    InProgress,
    #[error("the form has {} invalid field(s)", .errors.len())]
    Invalid {
        errors: FieldErrors,
        incomplete_steps: Vec<usize>,
    },
}

/// Result of loading a fetched record into the form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded,
    NotFound,
}

/// What leaving the screen requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelGate {
    Leave,
    /// Unsaved changes: ask before discarding
    ConfirmDiscard,
}

/// Result of [`StepFormController::submit`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Succeeded(Value),
    Failed { message: String },
    Blocked(SubmitBlocked),
    /// The gateway was already busy with another call
    Busy,
    /// The response arrived after the gateway was invalidated
    Discarded,
}

/// Owns a form session and keeps values, errors and steps consistent
#[derive(Debug, Clone)]
pub struct StepFormController {
    spec: Arc<FormSpec>,
    session_id: Uuid,
    values: FormValues,
    initial: FormValues,
    touched: BTreeSet<String>,
    errors: FieldErrors,
    /// Fields whose current error came from the server
    server_errors: BTreeSet<String>,
    /// Fields whose current value was written by a derived rule
    auto_filled: BTreeSet<String>,
    active_step: usize,
    phase: FormPhase,
    submit_attempted: bool,
    form_error: Option<String>,
}

impl StepFormController {
    pub fn new(spec: impl Into<Arc<FormSpec>>) -> Self {
        let spec = spec.into();
        let initial = spec.initial.clone();
        let session_id = Uuid::new_v4();
        tracing::debug!(form = spec.name, session = %session_id, "Form session created");
        Self {
            spec,
            session_id,
            values: initial.clone(),
            initial,
            touched: BTreeSet::new(),
            errors: FieldErrors::new(),
            server_errors: BTreeSet::new(),
            auto_filled: BTreeSet::new(),
            active_step: 0,
            phase: FormPhase::Pristine,
            submit_attempted: false,
            form_error: None,
        }
    }

    pub fn spec(&self) -> &FormSpec {
        &self.spec
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn value(&self, name: &str) -> &FieldValue {
        self.values.get(name)
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// Form-level message for failures that belong to no field
    pub fn form_error(&self) -> Option<&str> {
        self.form_error.as_deref()
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }

    pub fn touched(&self) -> impl Iterator<Item = &str> {
        self.touched.iter().map(String::as_str)
    }

    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    pub fn is_submitting(&self) -> bool {
        self.phase == FormPhase::Submitting
    }

    pub fn submit_attempted(&self) -> bool {
        self.submit_attempted
    }

    /// Values differ from the snapshot taken at mount/load
    pub fn is_dirty(&self) -> bool {
        !self.values.same_content(&self.initial)
    }

    pub fn active_step(&self) -> usize {
        self.active_step
    }

    pub fn step_count(&self) -> usize {
        self.spec.steps.len()
    }

    pub fn current_step(&self) -> Option<&StepDefinition> {
        self.spec.steps.get(self.active_step)
    }

    pub fn is_last_step(&self) -> bool {
        self.active_step == self.last_step()
    }

    /// Whether a field currently needs a value (drives conditional enabling)
    pub fn is_required(&self, name: &str) -> bool {
        self.spec.schema.is_required(name, &self.values)
    }

    pub fn is_step_complete(&self, index: usize) -> bool {
        self.spec
            .steps
            .get(index)
            .is_some_and(|s| s.is_complete(&self.spec.schema, &self.values, &self.errors))
    }

    fn last_step(&self) -> usize {
        self.spec.steps.len().saturating_sub(1)
    }

    fn mark_editing(&mut self) {
        if self.phase != FormPhase::Submitting {
            self.phase = FormPhase::Editing;
        }
    }

    /// Record a user edit: marks the field touched, re-validates it and its
    /// dependents, then recomputes derived fields
    pub fn set_field_value(&mut self, name: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        tracing::debug!(
            form = self.spec.name,
            session = %self.session_id,
            field = name,
            "Field updated"
        );
        self.mark_editing();
        self.touched.insert(name.to_string());
        self.auto_filled.remove(name);
        self.server_errors.remove(name);
        self.values.set(name, value);
        self.revalidate(name);
        self.run_derivations(name);
    }

    /// Mark a field touched without changing it (blur)
    pub fn set_field_touched(&mut self, name: &str) {
        self.mark_editing();
        self.touched.insert(name.to_string());
        self.refresh_error(name);
    }

    fn revalidate(&mut self, name: &str) {
        self.refresh_error(name);
        for dependent in self.spec.schema.dependents_of(name) {
            self.refresh_error(dependent);
        }
    }

    /// Recompute one field's error if it may be shown
    fn refresh_error(&mut self, name: &str) {
        if !(self.submit_attempted || self.touched.contains(name)) {
            return;
        }
        if self.server_errors.contains(name) {
            return;
        }
        match self.spec.schema.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(name.to_string(), message);
            }
            None => {
                self.errors.remove(name);
            }
        }
    }

    fn may_write(&self, rule: &DerivedFieldRule, field: &str) -> bool {
        if self.touched.contains(field) {
            return false;
        }
        match rule.policy {
            WritePolicy::Untouched => true,
            WritePolicy::FillEmpty => {
                self.values.get(field).is_empty() || self.auto_filled.contains(field)
            }
        }
    }

    /// Re-run rules fed by `origin`, following chains of derived outputs
    fn run_derivations(&mut self, origin: &str) {
        let spec = Arc::clone(&self.spec);
        let mut changed = vec![origin.to_string()];
        let mut passes = 0;

        while !changed.is_empty() && passes <= spec.derived.len() {
            passes += 1;
            let mut next = Vec::new();
            for rule in spec
                .derived
                .iter()
                .filter(|r| changed.iter().any(|c| r.reads(c)))
            {
                let computed = rule.compute(&self.values);
                for (field, value) in computed.iter() {
                    if !self.may_write(rule, field) || self.values.get(field) == value {
                        continue;
                    }
                    tracing::debug!(
                        form = spec.name,
                        session = %self.session_id,
                        rule = rule.name,
                        field,
                        "Derived field recomputed"
                    );
                    self.values.set(field, value.clone());
                    self.auto_filled.insert(field.to_string());
                    next.push(field.to_string());
                }
            }
            for field in &next {
                self.revalidate(field);
            }
            changed = next;
        }
    }

    /// Advance one step if the current step is complete
    pub fn go_to_next_step(&mut self) -> Result<usize, StepBlocked> {
        let Some(step) = self.spec.steps.get(self.active_step) else {
            return Ok(self.active_step);
        };
        if !step.is_complete(&self.spec.schema, &self.values, &self.errors) {
            let blocked = StepBlocked {
                step: self.active_step,
                label: step.label,
                fields: step.blocking_fields(&self.spec.schema, &self.values, &self.errors),
            };
            tracing::debug!(
                form = self.spec.name,
                session = %self.session_id,
                "Step {} blocked by {} field(s)",
                self.active_step,
                blocked.fields.len()
            );
            return Err(blocked);
        }
        self.active_step = (self.active_step + 1).min(self.last_step());
        Ok(self.active_step)
    }

    /// Go back one step; never gated
    pub fn go_to_previous_step(&mut self) -> usize {
        self.active_step = self.active_step.saturating_sub(1);
        self.active_step
    }

    /// Jump to a step. Backward jumps always succeed; forward jumps need
    /// every earlier step complete.
    pub fn go_to_step(&mut self, index: usize) -> Result<usize, StepBlocked> {
        let target = index.min(self.last_step());
        if target > self.active_step {
            for (i, step) in self.spec.steps.iter().enumerate().take(target) {
                if !step.is_complete(&self.spec.schema, &self.values, &self.errors) {
                    return Err(StepBlocked {
                        step: i,
                        label: step.label,
                        fields: step.blocking_fields(&self.spec.schema, &self.values, &self.errors),
                    });
                }
            }
        }
        self.active_step = target;
        Ok(target)
    }

    /// Every step complete and no errors
    pub fn can_submit(&self) -> bool {
        self.errors.is_empty()
            && self
                .spec
                .steps
                .iter()
                .all(|s| s.is_complete(&self.spec.schema, &self.values, &self.errors))
    }

    /// Reveal all errors and, if the form is submittable, enter
    /// `Submitting` and build the payload
    pub fn begin_submit(&mut self) -> Result<SubmissionPayload, SubmitBlocked> {
        if self.phase == FormPhase::Submitting {
            return Err(SubmitBlocked::InProgress);
        }
        self.submit_attempted = true;
        self.mark_editing();

        let local = self.spec.schema.validate_all(&self.values);
        let server_errors = &self.server_errors;
        self.errors.retain(|field, _| server_errors.contains(field));
        for (field, message) in local {
            self.errors.entry(field).or_insert(message);
        }

        if !self.can_submit() {
            let incomplete_steps = (0..self.step_count())
                .filter(|i| !self.is_step_complete(*i))
                .collect();
            tracing::debug!(
                form = self.spec.name,
                session = %self.session_id,
                "Submit blocked by {} error(s)",
                self.errors.len()
            );
            return Err(SubmitBlocked::Invalid {
                errors: self.errors.clone(),
                incomplete_steps,
            });
        }

        self.phase = FormPhase::Submitting;
        self.form_error = None;
        tracing::info!(form = self.spec.name, session = %self.session_id, "Submitting form");
        Ok(self.spec.mapping.to_payload(&self.values))
    }

    /// The backend accepted the submission
    pub fn finish_submit(&mut self) {
        tracing::info!(form = self.spec.name, session = %self.session_id, "Form submitted");
        self.phase = FormPhase::SubmitSucceeded;
        self.form_error = None;
    }

    /// The backend rejected the submission: fold field errors in, keep
    /// values and touched fields as they are
    pub fn fail_submit(&mut self, error: &ServiceError, message: &str) {
        self.phase = FormPhase::SubmitFailed;

        let mut folded = 0;
        let mut unattached = Vec::new();
        if let Some(fields) = error.field_errors() {
            for (name, field_message) in fields {
                let internal = self.spec.mapping.internal_name(name).or_else(|| {
                    self.spec.schema.rule(name).map(|r| r.field)
                });
                match internal {
                    Some(field) => {
                        self.errors.insert(field.to_string(), field_message.clone());
                        self.server_errors.insert(field.to_string());
                        folded += 1;
                    }
                    None => unattached.push(field_message.clone()),
                }
            }
        }

        self.form_error = if folded == 0 {
            Some(message.to_string())
        } else if !unattached.is_empty() {
            Some(unattached.join("; "))
        } else {
            None
        };

        tracing::warn!(
            form = self.spec.name,
            session = %self.session_id,
            "Submission failed: {message} ({folded} field error(s))"
        );
    }

    /// Submit through the gateway. `operation` receives the payload and
    /// performs the create or update call.
    pub async fn submit<F, Fut>(&mut self, gateway: &AsyncCallGateway, operation: F) -> SubmitOutcome
    where
        F: FnOnce(SubmissionPayload) -> Fut,
        Fut: Future<Output = Result<Value, ServiceError>>,
    {
        if gateway.is_loading() {
            return SubmitOutcome::Busy;
        }
        let payload = match self.begin_submit() {
            Ok(payload) => payload,
            Err(blocked) => return SubmitOutcome::Blocked(blocked),
        };

        let mut pending = PendingSubmit { form: self };
        match gateway.execute(operation(payload)).await {
            CallOutcome::Completed(record) => {
                pending.form.finish_submit();
                SubmitOutcome::Succeeded(record)
            }
            CallOutcome::Failed(failure) => {
                pending.form.fail_submit(&failure.error, &failure.message);
                SubmitOutcome::Failed {
                    message: failure.message,
                }
            }
            CallOutcome::Busy => SubmitOutcome::Busy,
            CallOutcome::Stale => SubmitOutcome::Discarded,
        }
    }

    /// Replace values wholesale and take them as the new snapshot
    pub fn load_values(&mut self, values: FormValues) {
        tracing::debug!(form = self.spec.name, session = %self.session_id, "Values loaded");
        self.initial = values.clone();
        self.values = values;
        self.touched.clear();
        self.errors.clear();
        self.server_errors.clear();
        self.auto_filled.clear();
        self.active_step = 0;
        self.phase = FormPhase::Pristine;
        self.submit_attempted = false;
        self.form_error = None;
    }

    /// Discard pending changes
    pub fn reset_form(&mut self) {
        let initial = self.initial.clone();
        self.load_values(initial);
    }

    /// Load a fetched backend record for editing
    pub fn load_record(&mut self, record: Option<&Value>) -> LoadOutcome {
        match record {
            Some(record) => {
                let values = self.spec.mapping.from_record(record);
                self.load_values(values);
                LoadOutcome::Loaded
            }
            None => LoadOutcome::NotFound,
        }
    }

    /// Whether leaving now needs a discard confirmation
    pub fn request_cancel(&self) -> CancelGate {
        if self.is_dirty() && self.phase != FormPhase::SubmitSucceeded {
            CancelGate::ConfirmDiscard
        } else {
            CancelGate::Leave
        }
    }
}

/// Returns the form to editing if a submission ends without a result,
/// including when the `submit` future is dropped mid-call
struct PendingSubmit<'a> {
    form: &'a mut StepFormController,
}

impl Drop for PendingSubmit<'_> {
    fn drop(&mut self) {
        if self.form.phase == FormPhase::Submitting {
            tracing::debug!(
                form = self.form.spec.name,
                session = %self.form.session_id,
                "Submission ended without a result"
            );
            self.form.phase = FormPhase::Editing;
        }
    }
}
