//! Trait abstraction for the records service to enable mocking in tests

use super::error::ServiceError;
use crate::domains::Domain;
use crate::state::SubmissionPayload;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Paging and search parameters for list calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    pub page: u32,
    pub per_page: u32,
    pub search: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: 20,
            search: None,
        }
    }
}

/// Operations the form screens call on the backend, one per CRUD action
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecordService: Send + Sync {
    /// List records of a domain
    async fn list(&self, domain: Domain, query: &ListQuery) -> Result<Vec<Value>, ServiceError>;

    /// Fetch one record. A missing record is `Ok(None)`.
    async fn get(&self, domain: Domain, id: &str) -> Result<Option<Value>, ServiceError>;

    /// Create a record, returning it as stored
    async fn create(
        &self,
        domain: Domain,
        payload: &SubmissionPayload,
    ) -> Result<Value, ServiceError>;

    /// Update a record, returning it as stored
    async fn update(
        &self,
        domain: Domain,
        id: &str,
        payload: &SubmissionPayload,
    ) -> Result<Value, ServiceError>;

    /// Delete a record
    async fn delete(&self, domain: Domain, id: &str) -> Result<(), ServiceError>;
}
