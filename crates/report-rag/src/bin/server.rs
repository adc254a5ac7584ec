//! Report RAG server binary
//!
//! Run with: cargo run -p report-rag --bin report-rag-server

use std::sync::Arc;

use report_rag::{config::Credentials, server::RagServer, AppContext, RagConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_rag=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                     Report RAG Server                     ║
║       Financial report Q&A with table-aware retrieval     ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config_path = std::env::args().nth(1).map(std::path::PathBuf::from);
    let config = RagConfig::load(config_path.as_deref())?;
    let credentials = Credentials::from_env();

    tracing::info!("Configuration loaded");
    tracing::info!("  - Document: {}", config.document_path.0.display());
    tracing::info!("  - Extractor: {:?}", config.extractor.provider);
    tracing::info!("  - LLM: {:?}", config.llm.provider);
    tracing::info!("  - Embeddings: {:?} ({} dims)", config.embeddings.provider, config.embeddings.dimensions);
    tracing::info!("  - Top k: {}", config.retrieval.top_k);

    // Missing credentials are fatal here rather than on first use
    let context = match AppContext::from_config(config, &credentials) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            tracing::error!("Refusing to start: {}", e);
            return Err(e.into());
        }
    };

    if !context.llm().health_check().await.unwrap_or(false) {
        tracing::warn!(
            "{} ({}) is not reachable; summaries and answers will fail until it is",
            context.llm().name(),
            context.llm().model()
        );
    }

    let server = RagServer::new(context.clone());

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/process - Process the report");
    println!("  POST /api/query   - Ask questions");
    println!("  GET  /api/status  - Index status");
    if context.binding().is_ready() {
        println!("\nLoaded existing index ({} records)", context.stats().search_records);
    }
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
