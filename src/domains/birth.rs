//! Birth registration form

use crate::state::{
    Coercion, Condition, FieldMapping, FieldRule, FormSpec, Format, PayloadMapping,
    StepDefinition,
};
use chrono::NaiveDate;

const GENDERS: &[&str] = &["Male", "Female"];
const PLACES_OF_BIRTH: &[&str] = &["Hospital", "Home", "Other"];
const BIRTH_TYPES: &[&str] = &["Single", "Twins", "Triplets", "Other"];

pub fn birth_form(today: NaiveDate) -> FormSpec {
    FormSpec::new("birth")
        .step(StepDefinition::new(
            "Child details",
            &[
                "child_name",
                "gender",
                "date_of_birth",
                "place_of_birth",
                "birth_weight",
            ],
        ))
        .step(StepDefinition::new(
            "Birth circumstances",
            &["time_of_birth", "hospital_name", "birth_type", "attendant"],
        ))
        .step(StepDefinition::new(
            "Parents",
            &[
                "mother_name",
                "mother_age",
                "mother_phone",
                "father_name",
                "father_phone",
            ],
        ))
        .step(StepDefinition::new(
            "Registration",
            &["informant_name", "informant_relationship", "registration_date"],
        ))
        .rules(vec![
            FieldRule::required("child_name", "Child's name"),
            FieldRule::required("gender", "Gender").format(Format::OneOf(GENDERS)),
            FieldRule::required("date_of_birth", "Date of birth").format(Format::PastDate(today)),
            FieldRule::required("place_of_birth", "Place of birth")
                .format(Format::OneOf(PLACES_OF_BIRTH)),
            FieldRule::required("birth_weight", "Birth weight (kg)")
                .format(Format::Decimal { min: 0.3, max: 7.0 }),
            FieldRule::optional("time_of_birth", "Time of birth").format(Format::Time),
            FieldRule::required_when(
                "hospital_name",
                "Hospital name",
                "place_of_birth",
                Condition::Equals("Hospital"),
            ),
            FieldRule::optional("birth_type", "Type of birth").format(Format::OneOf(BIRTH_TYPES)),
            FieldRule::optional("attendant", "Birth attendant"),
            FieldRule::required("mother_name", "Mother's name"),
            FieldRule::required("mother_age", "Mother's age")
                .format(Format::Integer { min: 10, max: 70 }),
            FieldRule::optional("mother_phone", "Mother's phone").format(Format::Phone),
            FieldRule::optional("father_name", "Father's name"),
            FieldRule::optional("father_phone", "Father's phone").format(Format::Phone),
            FieldRule::required("informant_name", "Informant's name"),
            FieldRule::optional("informant_relationship", "Relationship to child"),
            FieldRule::required("registration_date", "Registration date")
                .format(Format::PastDate(today))
                .not_before(
                    "date_of_birth",
                    "Registration date cannot be before the date of birth",
                ),
        ])
        .mapping(PayloadMapping::new(vec![
            FieldMapping::camel("child_name", Coercion::Text),
            FieldMapping::camel("gender", Coercion::Text),
            FieldMapping::camel("date_of_birth", Coercion::Date),
            FieldMapping::camel("place_of_birth", Coercion::Text),
            FieldMapping::camel("birth_weight", Coercion::Decimal),
            FieldMapping::camel("time_of_birth", Coercion::Text),
            FieldMapping::camel("hospital_name", Coercion::Text),
            FieldMapping::camel("birth_type", Coercion::Text),
            FieldMapping::camel("attendant", Coercion::Text),
            FieldMapping::camel("mother_name", Coercion::Text),
            FieldMapping::camel("mother_age", Coercion::Integer),
            FieldMapping::camel("mother_phone", Coercion::Text),
            FieldMapping::camel("father_name", Coercion::Text),
            FieldMapping::camel("father_phone", Coercion::Text),
            FieldMapping::camel("informant_name", Coercion::Text),
            FieldMapping::camel("informant_relationship", Coercion::Text),
            FieldMapping::camel("registration_date", Coercion::Date),
        ]))
}
