//! Death registration form

use crate::state::{
    age_at_death_rule, Coercion, Condition, FieldMapping, FieldRule, FormSpec, Format,
    PayloadMapping, StepDefinition,
};
use chrono::NaiveDate;

const GENDERS: &[&str] = &["Male", "Female"];
const PLACES_OF_DEATH: &[&str] = &["Hospital", "Home", "Other"];
const MANNERS_OF_DEATH: &[&str] = &["Natural", "Accident", "Homicide", "Suicide", "Undetermined"];

pub fn death_form(today: NaiveDate) -> FormSpec {
    FormSpec::new("death")
        .step(StepDefinition::new(
            "Deceased",
            &[
                "deceased_name",
                "gender",
                "date_of_birth",
                "date_of_death",
                "age_at_death",
            ],
        ))
        .step(StepDefinition::new(
            "Circumstances",
            &[
                "place_of_death",
                "hospital_name",
                "cause_of_death",
                "manner_of_death",
            ],
        ))
        .step(StepDefinition::new(
            "Informant",
            &["informant_name", "informant_phone", "informant_relationship"],
        ))
        .rules(vec![
            FieldRule::required("deceased_name", "Name of deceased"),
            FieldRule::required("gender", "Gender").format(Format::OneOf(GENDERS)),
            FieldRule::required("date_of_birth", "Date of birth").format(Format::PastDate(today)),
            FieldRule::required("date_of_death", "Date of death")
                .format(Format::PastDate(today))
                .not_before(
                    "date_of_birth",
                    "Date of death cannot be before the date of birth",
                ),
            FieldRule::required("age_at_death", "Age at death")
                .format(Format::Integer { min: 0, max: 150 }),
            FieldRule::required("place_of_death", "Place of death")
                .format(Format::OneOf(PLACES_OF_DEATH)),
            FieldRule::required_when(
                "hospital_name",
                "Hospital name",
                "place_of_death",
                Condition::Equals("Hospital"),
            ),
            FieldRule::required("cause_of_death", "Cause of death"),
            FieldRule::optional("manner_of_death", "Manner of death")
                .format(Format::OneOf(MANNERS_OF_DEATH)),
            FieldRule::required("informant_name", "Informant's name"),
            FieldRule::required("informant_phone", "Informant's phone").format(Format::Phone),
            FieldRule::optional("informant_relationship", "Relationship to deceased"),
        ])
        .derive(age_at_death_rule())
        .mapping(PayloadMapping::new(vec![
            FieldMapping::camel("deceased_name", Coercion::Text),
            FieldMapping::camel("gender", Coercion::Text),
            FieldMapping::camel("date_of_birth", Coercion::Date),
            FieldMapping::camel("date_of_death", Coercion::Date),
            FieldMapping::camel("age_at_death", Coercion::Integer),
            FieldMapping::camel("place_of_death", Coercion::Text),
            FieldMapping::camel("hospital_name", Coercion::Text),
            FieldMapping::camel("cause_of_death", Coercion::Text),
            FieldMapping::camel("manner_of_death", Coercion::Text),
            FieldMapping::camel("informant_name", Coercion::Text),
            FieldMapping::camel("informant_phone", Coercion::Text),
            FieldMapping::camel("informant_relationship", Coercion::Text),
        ]))
}
