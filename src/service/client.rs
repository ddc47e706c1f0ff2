//! REST client for the health-records backend
//!
//! This module implements [`RecordService`] over HTTP. The bearer token comes
//! from the injected [`SessionContext`]; a 401 response signs the session out.

use super::error::ServiceError;
use super::session::SessionContext;
use super::traits::{ListQuery, RecordService};
use crate::config::ClientConfig;
use crate::domains::Domain;
use crate::state::SubmissionPayload;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Client for the records REST API
pub struct HttpRecordService {
    /// The HTTP client
    client: reqwest::Client,
    /// API base URL without trailing slash
    base_url: String,
    /// Token source and sign-out hook
    session: Arc<dyn SessionContext>,
}

impl HttpRecordService {
    /// Create a new client
    pub fn new(
        base_url: &str,
        timeout: Duration,
        session: Arc<dyn SessionContext>,
    ) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, session))
    }

    /// Wrap an already configured `reqwest` client
    pub fn with_client(
        client: reqwest::Client,
        base_url: &str,
        session: Arc<dyn SessionContext>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Create a client from the loaded configuration
    pub fn from_config(
        config: &ClientConfig,
        session: Arc<dyn SessionContext>,
    ) -> Result<Self, ServiceError> {
        Self::new(&config.api_base_url(), config.request_timeout(), session)
    }

    fn url(&self, domain: Domain, id: Option<&str>) -> String {
        match id {
            Some(id) => format!("{}/{}/{}", self.base_url, domain.resource(), id),
            None => format!("{}/{}", self.base_url, domain.resource()),
        }
    }

    /// Send a request and decode the JSON body, unwrapping `{"data": ...}`
    async fn send(&self, request: RequestBuilder) -> Result<Value, ServiceError> {
        let request = match self.session.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            self.session.on_unauthorized();
            return Err(ServiceError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound);
        }

        let text = response.text().await?;
        if !status.is_success() {
            let body = serde_json::from_str(&text).unwrap_or(Value::Null);
            tracing::warn!("Backend rejected request with status {status}");
            return Err(ServiceError::from_response_body(Some(status.as_u16()), &body));
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        let body: Value = serde_json::from_str(&text)
            .map_err(|e| ServiceError::UnexpectedResponse(format!("invalid JSON: {e}")))?;
        Ok(unwrap_data(body))
    }
}

#[async_trait]
impl RecordService for HttpRecordService {
    async fn list(&self, domain: Domain, query: &ListQuery) -> Result<Vec<Value>, ServiceError> {
        let url = self.url(domain, None);
        tracing::debug!("GET {url} page={} search={:?}", query.page, query.search);

        let mut params = vec![
            ("page", query.page.to_string()),
            ("per_page", query.per_page.to_string()),
        ];
        if let Some(search) = query.search.as_ref().filter(|s| !s.trim().is_empty()) {
            params.push(("search", search.trim().to_string()));
        }

        let body = self.send(self.client.get(&url).query(&params)).await?;
        into_list(body)
    }

    async fn get(&self, domain: Domain, id: &str) -> Result<Option<Value>, ServiceError> {
        let url = self.url(domain, Some(id));
        tracing::debug!("GET {url}");

        match self.send(self.client.get(&url)).await {
            Ok(Value::Null) => Ok(None),
            Ok(record) => Ok(Some(record)),
            Err(ServiceError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(
        &self,
        domain: Domain,
        payload: &SubmissionPayload,
    ) -> Result<Value, ServiceError> {
        let url = self.url(domain, None);
        tracing::debug!("POST {url} ({} fields)", payload.len());
        self.send(self.client.post(&url).json(payload)).await
    }

    async fn update(
        &self,
        domain: Domain,
        id: &str,
        payload: &SubmissionPayload,
    ) -> Result<Value, ServiceError> {
        let url = self.url(domain, Some(id));
        tracing::debug!("PUT {url} ({} fields)", payload.len());
        self.send(self.client.put(&url).json(payload)).await
    }

    async fn delete(&self, domain: Domain, id: &str) -> Result<(), ServiceError> {
        let url = self.url(domain, Some(id));
        tracing::debug!("DELETE {url}");
        self.send(self.client.delete(&url)).await?;
        Ok(())
    }
}

/// Unwrap the conventional `{"data": ...}` envelope
fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Interpret a list response body
fn into_list(body: Value) -> Result<Vec<Value>, ServiceError> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(ServiceError::UnexpectedResponse(format!(
            "expected a list, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
