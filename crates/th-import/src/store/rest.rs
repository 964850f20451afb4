//! PostgREST client for the hosted backend
//!
//! Inserts go to `POST {url}/rest/v1/{table}` with a one-element array body.
//! Listings page through `GET {url}/rest/v1/{table}?select=..&order=id.asc`
//! because the backend caps a single response at 1000 rows.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;
use th_common::types::Pagination;
use th_common::RecordKind;
use tracing::debug;

use super::{DestinationStore, StoreError};
use crate::config::StoreConfig;
use crate::models::NormalizedRecord;

/// Paged listings need a total order or pages may overlap
const PAGE_ORDER: &str = "id.asc";

/// Error body returned by PostgREST
#[derive(Debug, Default, Deserialize)]
struct BackendError {
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
    code: Option<String>,
}

impl BackendError {
    fn describe(self) -> Option<String> {
        let mut text = self.message?;
        if let Some(details) = self.details {
            text.push_str(&format!(" ({details})"));
        }
        if let Some(hint) = self.hint {
            text.push_str(&format!(" hint: {hint}"));
        }
        if let Some(code) = self.code {
            text.push_str(&format!(" [{code}]"));
        }
        Some(text)
    }
}

/// Hosted backend client
pub struct RestStore {
    client: Client,
    config: StoreConfig,
}

impl RestStore {
    pub fn new(config: StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.config.service_role_key)
            .bearer_auth(&self.config.service_role_key)
    }

    async fn check(response: Response) -> Result<Response, StoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<BackendError>(&body)
            .ok()
            .and_then(BackendError::describe)
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        Err(StoreError::rejected(status.as_u16(), message))
    }
}

#[async_trait]
impl DestinationStore for RestStore {
    async fn insert(&self, kind: RecordKind, record: &NormalizedRecord) -> Result<(), StoreError> {
        let url = self.config.table_url(kind.table());

        let response = self
            .authorized(self.client.post(&url))
            .header("Prefer", "return=minimal")
            .json(&[record.to_json()])
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn select_all(&self, kind: RecordKind, columns: &[&str]) -> Result<Vec<Value>, StoreError> {
        let url = self.config.table_url(kind.table());
        let select = columns.join(",");
        let mut page = Pagination::first(self.config.page_size);
        let mut rows = Vec::new();

        loop {
            let response = self
                .authorized(self.client.get(&url))
                .query(&[
                    ("select", select.clone()),
                    ("order", PAGE_ORDER.to_string()),
                    ("limit", page.limit.to_string()),
                    ("offset", page.offset.to_string()),
                ])
                .send()
                .await?;

            let batch: Vec<Value> = Self::check(response)
                .await?
                .json()
                .await
                .map_err(|e| StoreError::decode(e.to_string()))?;

            debug!(table = kind.table(), offset = page.offset, rows = batch.len(), "Fetched page");

            let last = page.is_last(batch.len());
            rows.extend(batch);
            if last {
                break;
            }
            page = page.next();
        }

        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_error_description() {
        let error: BackendError = serde_json::from_str(
            r#"{"message":"duplicate key","details":"Key (email)=(a@x) already exists.","code":"23505"}"#,
        )
        .unwrap();
        assert_eq!(
            error.describe().unwrap(),
            "duplicate key (Key (email)=(a@x) already exists.) [23505]"
        );
        assert!(BackendError::default().describe().is_none());
    }
}
