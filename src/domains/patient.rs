//! Patient registration form

use crate::state::{
    age_rule, Coercion, Condition, FieldMapping, FieldRule, FormSpec, Format, PayloadMapping,
    StepDefinition,
};
use chrono::NaiveDate;

const GENDERS: &[&str] = &["Male", "Female"];
const BLOOD_GROUPS: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];
const MARITAL_STATUSES: &[&str] = &["Single", "Married", "Divorced", "Widowed"];

pub fn patient_form(today: NaiveDate) -> FormSpec {
    FormSpec::new("patient")
        .step(StepDefinition::new(
            "Personal information",
            &[
                "first_name",
                "last_name",
                "other_names",
                "gender",
                "date_of_birth",
                "age",
                "marital_status",
            ],
        ))
        .step(StepDefinition::new(
            "Contact",
            &["phone", "email", "address", "state", "lga"],
        ))
        .step(StepDefinition::new(
            "Medical & next of kin",
            &[
                "blood_group",
                "genotype",
                "allergies",
                "next_of_kin_name",
                "next_of_kin_phone",
                "next_of_kin_relationship",
            ],
        ))
        .rules(vec![
            FieldRule::required("first_name", "First name").format(Format::MinLength(2)),
            FieldRule::required("last_name", "Last name").format(Format::MinLength(2)),
            FieldRule::optional("other_names", "Other names"),
            FieldRule::required("gender", "Gender").format(Format::OneOf(GENDERS)),
            FieldRule::required("date_of_birth", "Date of birth").format(Format::PastDate(today)),
            FieldRule::optional("age", "Age").format(Format::Integer { min: 0, max: 150 }),
            FieldRule::optional("marital_status", "Marital status")
                .format(Format::OneOf(MARITAL_STATUSES)),
            FieldRule::required("phone", "Phone number").format(Format::Phone),
            FieldRule::optional("email", "Email").format(Format::Email),
            FieldRule::required("address", "Address"),
            FieldRule::required("state", "State"),
            FieldRule::required_when("lga", "LGA", "state", Condition::NotEmpty),
            FieldRule::optional("blood_group", "Blood group").format(Format::OneOf(BLOOD_GROUPS)),
            FieldRule::optional("genotype", "Genotype")
                .format(Format::OneOf(&["AA", "AS", "AC", "SS", "SC"])),
            FieldRule::optional("allergies", "Allergies"),
            FieldRule::required("next_of_kin_name", "Next of kin name"),
            FieldRule::required("next_of_kin_phone", "Next of kin phone").format(Format::Phone),
            FieldRule::optional("next_of_kin_relationship", "Relationship"),
        ])
        .derive(age_rule(today))
        .mapping(PayloadMapping::new(vec![
            FieldMapping::camel("first_name", Coercion::Text),
            FieldMapping::camel("last_name", Coercion::Text),
            FieldMapping::camel("other_names", Coercion::Text),
            FieldMapping::camel("gender", Coercion::Text),
            FieldMapping::camel("date_of_birth", Coercion::Date),
            FieldMapping::camel("age", Coercion::Integer),
            FieldMapping::camel("marital_status", Coercion::Text),
            FieldMapping::new("phone", "phoneNumber", Coercion::Text),
            FieldMapping::camel("email", Coercion::Text),
            FieldMapping::camel("address", Coercion::Text),
            FieldMapping::camel("state", Coercion::Text),
            FieldMapping::camel("lga", Coercion::Text),
            FieldMapping::camel("blood_group", Coercion::Text),
            FieldMapping::camel("genotype", Coercion::Text),
            FieldMapping::camel("allergies", Coercion::Text),
            FieldMapping::camel("next_of_kin_name", Coercion::Text),
            FieldMapping::camel("next_of_kin_phone", Coercion::Text),
            FieldMapping::camel("next_of_kin_relationship", Coercion::Text),
        ]))
}
