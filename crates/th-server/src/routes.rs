//! HTTP handlers

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use th_common::ImportTally;
use th_import::config::{IdentifierPolicy, ImportConfig, PrimaryImagePolicy};
use th_import::ImportOrchestrator;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::AppState;

pub const IMPORT_SUCCESS_MESSAGE: &str = "Data import completed successfully!";

/// Per-request overrides of the server's default import options
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOptions {
    pub offset_member_ids: Option<bool>,
    pub email_suffix: Option<String>,
    pub primary_image: Option<PrimaryImagePolicy>,
    pub sample_size: Option<usize>,
}

impl ImportOptions {
    pub fn apply(self, mut config: ImportConfig) -> ImportConfig {
        if let Some(offset) = self.offset_member_ids {
            config = config.with_identifier_policy(if offset {
                IdentifierPolicy::Offset
            } else {
                IdentifierPolicy::Preserve
            });
        }
        if let Some(suffix) = self.email_suffix {
            config = config.with_email_suffix(suffix);
        }
        if let Some(policy) = self.primary_image {
            config = config.with_primary_image(policy);
        }
        if let Some(n) = self.sample_size {
            config = config.with_parse_limit(n);
        }
        config
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub sql_content: String,
    #[serde(default)]
    pub options: Option<ImportOptions>,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub results: ImportTally,
    pub message: &'static str,
}

/// `POST /functions/v1/import-data`
pub async fn import_data(
    State(state): State<AppState>,
    payload: Result<Json<ImportRequest>, JsonRejection>,
) -> AppResult<Json<ImportResponse>> {
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;

    let config = request
        .options
        .unwrap_or_default()
        .apply(state.import_defaults.clone());

    info!(bytes = request.sql_content.len(), "Starting import request");

    let orchestrator = ImportOrchestrator::new(state.store.clone(), config);
    let results = tokio::spawn(async move { orchestrator.run(&request.sql_content).await })
        .await
        .map_err(|e| AppError::Internal(format!("Import task failed: {e}")))?;

    Ok(Json(ImportResponse {
        success: true,
        results,
        message: IMPORT_SUCCESS_MESSAGE,
    }))
}

/// `GET /health`
pub async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
