//! Document processing endpoints

use axum::{body::Bytes, extract::State, Json};
use serde_json::json;

use crate::context::ProcessStage;
use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{IndexStats, ProcessReport, ProcessRequest};

/// POST /api/process - Rebuild the index from a document.
///
/// The body is optional; without one the configured document is used.
pub async fn process_document(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ProcessReport>> {
    let request: ProcessRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ProcessRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| Error::Validation(format!("Invalid process request: {}", e)))?
    };
    let path = request
        .path
        .unwrap_or_else(|| state.context().config().document_path.0.clone());
    let (token, guard) = state.begin_build()?;

    // Run detached so a dropped connection cannot abort a build mid-swap
    let context = state.context().clone();
    let handle = tokio::spawn(async move {
        let _guard = guard;
        context
            .process_document(&path, &token, &|stage: ProcessStage| {
                tracing::debug!("Build stage: {:?}", stage)
            })
            .await
    });

    let report = handle
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;

    Ok(Json(report))
}

/// POST /api/process/cancel - Cancel the running build
pub async fn cancel_processing(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cancelled = state.cancel_build();
    if cancelled {
        tracing::info!("Build cancellation requested");
    }
    Json(json!({ "cancelled": cancelled }))
}

/// GET /api/status - Index status
pub async fn index_status(State(state): State<AppState>) -> Json<IndexStats> {
    Json(state.context().stats())
}
