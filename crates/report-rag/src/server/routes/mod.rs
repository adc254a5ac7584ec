//! API routes for the report server

pub mod process;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_body_size: usize) -> Router<AppState> {
    Router::new()
        // Document processing
        .route("/process", post(process::process_document))
        .route("/process/cancel", post(process::cancel_processing))
        .route("/status", get(process::index_status))
        // Questions and conversation
        .route("/query", post(query::query_report))
        .route("/messages", get(query::list_messages))
        // Info
        .route("/info", get(info))
        .layer(DefaultBodyLimit::max(max_body_size))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "report-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over a financial report with summary-indexed table retrieval",
        "endpoints": {
            "POST /api/process": "Extract, summarize, and index the report",
            "POST /api/process/cancel": "Cancel the running build",
            "GET /api/status": "Index status and record counts",
            "POST /api/query": "Ask a question grounded in the report",
            "GET /api/messages": "Conversation history"
        }
    }))
}
