use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::Html;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::domain::{LabQuery, LabResult, QueryMode};
use crate::fhir::{entry_resource, normalize};
use crate::infra::error_chain;
use crate::llm::degraded_summary;
use crate::prompts;

const LANDING_PAGE: &str = include_str!("../../assets/index.html");

#[derive(Debug, Default, Deserialize)]
pub struct LabsParams {
    pub patient_id: Option<String>,
}

pub async fn landing() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

pub async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

/// `GET /labs`: fetch, normalize and explain each observation.
pub async fn list_labs(
    State(state): State<Arc<AppState>>,
    params: Result<Query<LabsParams>, QueryRejection>,
) -> Result<Json<Vec<LabResult>>, ApiError> {
    let span = tracing::info_span!("labs", request_id = %Uuid::new_v4());
    explain_labs(&state, params).instrument(span).await.map(Json)
}

async fn explain_labs(
    state: &AppState,
    params: Result<Query<LabsParams>, QueryRejection>,
) -> Result<Vec<LabResult>, ApiError> {
    let query = resolve_query(state, params)?;

    let entries = state
        .fetcher
        .fetch(&query)
        .await
        .map_err(|e| ApiError::internal(&e, state.expose_error_details))?;

    if entries.is_empty() {
        let message = match &query {
            LabQuery::Patient(id) => prompts::no_results_for_patient(id),
            LabQuery::Code(_) => prompts::ERROR_NO_LAB_RESULTS.to_string(),
        };
        tracing::info!(patient_scoped = query.is_patient_scoped(), "no observations found");
        return Err(ApiError::NotFound(message));
    }

    tracing::info!(count = entries.len(), "explaining observations");

    let mut results = Vec::with_capacity(entries.len());
    for entry in &entries {
        let observation = entry_resource(entry);
        let summary = match state.summarizer.summarize(observation).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!(
                    error = %error_chain(&e),
                    backend = state.summarizer.backend_name(),
                    "summary generation failed"
                );
                degraded_summary(&e)
            }
        };
        results.push(normalize(observation).with_summary(summary));
    }

    Ok(results)
}

/// Code mode ignores the query string entirely, malformed or not.
fn resolve_query(
    state: &AppState,
    params: Result<Query<LabsParams>, QueryRejection>,
) -> Result<LabQuery, ApiError> {
    if state.mode == QueryMode::Code {
        return Ok(LabQuery::Code(state.lab_code.clone()));
    }

    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    match params.patient_id {
        Some(id) if !id.trim().is_empty() => Ok(LabQuery::Patient(id.trim().to_string())),
        _ => Err(ApiError::BadRequest(
            prompts::ERROR_MISSING_PATIENT_ID.to_string(),
        )),
    }
}
