//! User registration form

use crate::state::{
    username_suggestion_rule, Coercion, FieldMapping, FieldRule, FormSpec, Format,
    PayloadMapping, StepDefinition,
};
use regex::Regex;
use std::sync::LazyLock;

const ROLES: &[&str] = &["Admin", "Doctor", "Nurse", "Records Officer"];

static USERNAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9._-]{3,30}$").expect("username pattern is valid"));

pub fn registration_form() -> FormSpec {
    FormSpec::new("registration")
        .step(StepDefinition::new(
            "Account",
            &["full_name", "email", "username", "role", "phone"],
        ))
        .step(StepDefinition::new(
            "Password",
            &["password", "confirm_password"],
        ))
        .rules(vec![
            FieldRule::required("full_name", "Full name"),
            FieldRule::required("email", "Email").format(Format::Email),
            FieldRule::required("username", "Username").format(Format::Pattern {
                regex: &USERNAME_RE,
                message: "Use 3-30 lowercase letters, digits, '.', '_' or '-'",
            }),
            FieldRule::required("role", "Role").format(Format::OneOf(ROLES)),
            FieldRule::optional("phone", "Phone number").format(Format::Phone),
            FieldRule::required("password", "Password").format(Format::MinLength(8)),
            FieldRule::required("confirm_password", "Confirm password")
                .matches("password", "Passwords do not match"),
        ])
        .derive(username_suggestion_rule())
        .mapping(PayloadMapping::new(vec![
            FieldMapping::camel("full_name", Coercion::Text),
            FieldMapping::camel("email", Coercion::Text),
            FieldMapping::camel("username", Coercion::Text),
            FieldMapping::camel("role", Coercion::Text),
            FieldMapping::new("phone", "phoneNumber", Coercion::Text),
            FieldMapping::camel("password", Coercion::Text),
        ]))
}
