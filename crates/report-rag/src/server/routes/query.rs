//! Query endpoint and conversation history

use axum::{extract::State, Json};
use std::time::Instant;

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatMessage, QueryRequest, QueryResponse};

/// POST /api/query - Answer a question from the indexed report
pub async fn query_report(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>> {
    let start = Instant::now();
    tracing::info!("Query: \"{}\"", request.question);

    let answer = state.context().ask(&request.question).await?;

    let processing_time_ms = start.elapsed().as_millis() as u64;
    Ok(Json(QueryResponse::from_answer(&answer, processing_time_ms)))
}

/// GET /api/messages - Conversation history
pub async fn list_messages(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.context().history())
}
