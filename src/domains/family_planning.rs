//! Family-planning client visit form

use crate::state::{
    age_rule, next_visit_rule, Coercion, Condition, FieldMapping, FieldRule, FormSpec, Format,
    PayloadMapping, StepDefinition,
};
use chrono::NaiveDate;

const METHODS: &[&str] = &["Pills", "Injectable", "Implant", "IUD", "Condoms", "Natural"];
const CLIENT_TYPES: &[&str] = &["New", "Revisit"];

pub fn family_planning_form(today: NaiveDate) -> FormSpec {
    FormSpec::new("family-planning")
        .step(StepDefinition::new(
            "Client",
            &[
                "client_name",
                "date_of_birth",
                "age",
                "phone",
                "client_type",
                "number_of_children",
            ],
        ))
        .step(StepDefinition::new(
            "Method & visit",
            &["method", "visit_date", "next_visit_date", "provider_name"],
        ))
        .step(StepDefinition::new(
            "Follow-up",
            &["has_side_effects", "side_effects_description", "notes"],
        ))
        .rules(vec![
            FieldRule::required("client_name", "Client name"),
            FieldRule::required("date_of_birth", "Date of birth").format(Format::PastDate(today)),
            FieldRule::optional("age", "Age").format(Format::Integer { min: 10, max: 60 }),
            FieldRule::required("phone", "Phone number").format(Format::Phone),
            FieldRule::optional("client_type", "Client type").format(Format::OneOf(CLIENT_TYPES)),
            FieldRule::optional("number_of_children", "Number of children")
                .format(Format::Integer { min: 0, max: 30 }),
            FieldRule::required("method", "Method").format(Format::OneOf(METHODS)),
            FieldRule::required("visit_date", "Visit date").format(Format::Date),
            FieldRule::required("next_visit_date", "Next visit date")
                .format(Format::Date)
                .not_before("visit_date", "Next visit must be after the visit date"),
            FieldRule::optional("provider_name", "Provider"),
            FieldRule::optional("has_side_effects", "Side effects reported"),
            FieldRule::required_when(
                "side_effects_description",
                "Side effects description",
                "has_side_effects",
                Condition::IsTrue,
            ),
            FieldRule::optional("notes", "Notes"),
        ])
        .derive(age_rule(today))
        .derive(next_visit_rule())
        .mapping(PayloadMapping::new(vec![
            FieldMapping::camel("client_name", Coercion::Text),
            FieldMapping::camel("date_of_birth", Coercion::Date),
            FieldMapping::camel("age", Coercion::Integer),
            FieldMapping::new("phone", "phoneNumber", Coercion::Text),
            FieldMapping::camel("client_type", Coercion::Text),
            FieldMapping::camel("number_of_children", Coercion::Integer),
            FieldMapping::camel("method", Coercion::Text),
            FieldMapping::camel("visit_date", Coercion::Date),
            FieldMapping::camel("next_visit_date", Coercion::Date),
            FieldMapping::camel("provider_name", Coercion::Text),
            FieldMapping::camel("has_side_effects", Coercion::Bool),
            FieldMapping::camel("side_effects_description", Coercion::Text),
            FieldMapping::camel("notes", Coercion::Text),
        ]))
}
