//! Per-domain form configuration
//!
//! Each domain module builds the [`FormSpec`] for one kind of record: its
//! steps, validation rules, derived fields and the mapping to the backend's
//! field names.

mod birth;
mod death;
mod family_planning;
mod patient;
mod user;

use crate::state::FormSpec;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use birth::birth_form;
pub use death::death_form;
pub use family_planning::family_planning_form;
pub use patient::patient_form;
pub use user::registration_form;

/// Kind of record managed by a form screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    Patient,
    Birth,
    Death,
    FamilyPlanning,
    User,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Patient,
        Domain::Birth,
        Domain::Death,
        Domain::FamilyPlanning,
        Domain::User,
    ];

    /// REST resource path segment
    pub fn resource(&self) -> &'static str {
        match self {
            Domain::Patient => "patients",
            Domain::Birth => "births",
            Domain::Death => "deaths",
            Domain::FamilyPlanning => "family-planning",
            Domain::User => "users",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Domain::Patient => "patient",
            Domain::Birth => "birth",
            Domain::Death => "death",
            Domain::FamilyPlanning => "family-planning",
            Domain::User => "user",
        }
    }

    /// Form for this domain. `today` is the reference date for age and
    /// not-in-the-future checks.
    pub fn form_spec(&self, today: NaiveDate) -> FormSpec {
        match self {
            Domain::Patient => patient_form(today),
            Domain::Birth => birth_form(today),
            Domain::Death => death_form(today),
            Domain::FamilyPlanning => family_planning_form(today),
            Domain::User => registration_form(),
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown domain '{0}' (expected patient, birth, death, family-planning or user)")]
pub struct UnknownDomain(pub String);

impl FromStr for Domain {
    type Err = UnknownDomain;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "patient" | "patients" => Ok(Domain::Patient),
            "birth" | "births" => Ok(Domain::Birth),
            "death" | "deaths" => Ok(Domain::Death),
            "family-planning" | "fp" => Ok(Domain::FamilyPlanning),
            "user" | "users" | "registration" => Ok(Domain::User),
            _ => Err(UnknownDomain(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{AsyncCallGateway, MockRecordService, RecordService, ServiceError};
    use crate::state::{
        FieldValue, FormValues, LoadOutcome, StepFormController, SubmitOutcome,
    };
    use mockall::predicate::eq;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    mod domain {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn test_parse_domain_names() {
            assert_eq!("patient".parse::<Domain>(), Ok(Domain::Patient));
            assert_eq!("Births".parse::<Domain>(), Ok(Domain::Birth));
            assert_eq!("family_planning".parse::<Domain>(), Ok(Domain::FamilyPlanning));
            assert_eq!("registration".parse::<Domain>(), Ok(Domain::User));
            assert!("disease".parse::<Domain>().is_err());
        }

        #[test]
        fn test_display_parses_back() {
            for domain in Domain::ALL {
                assert_eq!(domain.to_string().parse::<Domain>(), Ok(domain));
            }
        }

        #[test]
        fn test_every_form_is_consistent() {
            for domain in Domain::ALL {
                let spec = domain.form_spec(today());
                assert!(!spec.steps.is_empty(), "{domain} has no steps");
                for rule in spec.schema.rules() {
                    assert!(
                        spec.step_of(rule.field).is_some(),
                        "{domain}: {} is validated but on no step",
                        rule.field
                    );
                }
                for derived in &spec.derived {
                    for output in derived.outputs {
                        assert!(
                            spec.step_of(output).is_some(),
                            "{domain}: derived {output} is on no step"
                        );
                    }
                }
            }
        }

        #[test]
        fn test_validation_is_deterministic() {
            let values = FormValues::new()
                .with("date_of_birth", "2030-01-01")
                .with("email", "x@")
                .with("phone", "123");
            for domain in Domain::ALL {
                let spec = domain.form_spec(today());
                let first = spec.schema.validate_all(&values);
                for _ in 0..5 {
                    assert_eq!(spec.schema.validate_all(&values), first);
                }
            }
        }
    }

    mod service_flow {
        use super::*;
        use pretty_assertions::assert_eq;

        fn registration() -> StepFormController {
            let mut form = StepFormController::new(Domain::User.form_spec(today()));
            form.set_field_value("full_name", "Jane Doe");
            form.set_field_value("email", "jane.doe@example.com");
            form.set_field_value("role", "Nurse");
            form.set_field_value("password", "s3cure-pass");
            form.set_field_value("confirm_password", "s3cure-pass");
            form
        }

        #[tokio::test]
        async fn test_create_through_service() {
            let mut service = MockRecordService::new();
            service
                .expect_create()
                .withf(|domain, payload| {
                    *domain == Domain::User
                        && payload.get("username") == Some(&json!("jane.doe"))
                        && !payload.contains_key("confirmPassword")
                })
                .times(1)
                .returning(|_, _| Ok(json!({"id": "u-1", "username": "jane.doe"})));

            let mut form = registration();
            let gateway = AsyncCallGateway::new();
            let outcome = form
                .submit(&gateway, |payload| async move {
                    service.create(Domain::User, &payload).await
                })
                .await;

            assert_eq!(
                outcome,
                SubmitOutcome::Succeeded(json!({"id": "u-1", "username": "jane.doe"}))
            );
            assert!(!gateway.is_loading());
            assert_eq!(gateway.error(), None);
        }

        #[tokio::test]
        async fn test_rejected_email_blocks_resubmit() {
            let mut service = MockRecordService::new();
            service.expect_create().times(1).returning(|_, _| {
                Err(ServiceError::Rejected {
                    status: Some(422),
                    message: Some("Validation failed".to_string()),
                    field_errors: BTreeMap::from([(
                        "email".to_string(),
                        "already taken".to_string(),
                    )]),
                })
            });

            let mut form = registration();
            let gateway = AsyncCallGateway::new();
            let outcome = form
                .submit(&gateway, |payload| async move {
                    service.create(Domain::User, &payload).await
                })
                .await;

            assert!(matches!(outcome, SubmitOutcome::Failed { .. }));
            assert_eq!(form.error("email"), Some("already taken"));
            assert!(!form.can_submit());
            assert_eq!(
                form.value("email"),
                &FieldValue::text("jane.doe@example.com")
            );
        }

        #[tokio::test]
        async fn test_fetch_into_edit_mode() {
            let mut service = MockRecordService::new();
            service
                .expect_get()
                .with(eq(Domain::Death), eq("d-1"))
                .returning(|_, _| {
                    Ok(Some(json!({
                        "deceasedName": "Ibrahim Musa",
                        "dateOfDeath": "2024-02-01",
                    })))
                });
            service
                .expect_get()
                .with(eq(Domain::Death), eq("missing"))
                .returning(|_, _| Ok(None));

            let mut form = StepFormController::new(Domain::Death.form_spec(today()));
            let record = service.get(Domain::Death, "d-1").await.unwrap();
            assert_eq!(form.load_record(record.as_ref()), LoadOutcome::Loaded);
            assert_eq!(form.value("deceased_name"), &FieldValue::text("Ibrahim Musa"));
            assert!(!form.is_dirty());

            let missing = service.get(Domain::Death, "missing").await.unwrap();
            assert_eq!(form.load_record(missing.as_ref()), LoadOutcome::NotFound);
            assert_eq!(form.value("deceased_name"), &FieldValue::text("Ibrahim Musa"));
        }
    }
}
