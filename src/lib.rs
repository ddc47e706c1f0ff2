//! health-forms - multi-step form engine for health-records administration
//!
//! Patient, birth, death and family-planning registration (plus user
//! registration) share one data-driven wizard controller. Each domain supplies
//! its steps, validation rules, derived fields and backend field mapping; the
//! controller keeps values, errors and step state consistent and submits
//! through a single-flight call gateway.

pub mod config;
pub mod domains;
pub mod service;
pub mod state;
