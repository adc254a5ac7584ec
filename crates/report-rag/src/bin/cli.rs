//! Command line front end: process the report, then ask questions
//!
//! Run with: cargo run -p report-rag --features cli --bin report-rag -- --help

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use report_rag::{AppContext, Credentials, ElementKind, ProcessStage, RagConfig};

const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

#[derive(Parser, Debug)]
#[command(name = "report-rag", version, about = "Ask questions about a financial report")]
struct Cli {
    /// Configuration file (defaults to ./report-rag.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract, summarize, and index the report
    Process {
        /// Document to process (defaults to the configured document)
        path: Option<PathBuf>,
    },
    /// Ask a question about the processed report
    Ask {
        question: String,
        /// Print the retrieved elements the answer was grounded on
        #[arg(long)]
        show_sources: bool,
    },
    /// Show index status
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_rag=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = RagConfig::load(cli.config.as_deref())?;
    let credentials = Credentials::from_env();

    let context = match AppContext::from_config(config, &credentials) {
        Ok(context) => context,
        Err(e) => {
            eprintln!("{} {}", style("error:").red().bold(), e);
            std::process::exit(2);
        }
    };

    match cli.command {
        Command::Process { path } => process(&context, path).await,
        Command::Ask {
            question,
            show_sources,
        } => ask(&context, &question, show_sources).await,
        Command::Status => {
            status(&context);
            Ok(())
        }
    }
}

async fn process(context: &AppContext, path: Option<PathBuf>) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(|| context.config().document_path.0.clone());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let pb = ProgressBar::new_spinner();
    pb.enable_steady_tick(Duration::from_millis(120));
    pb.set_message(format!("Parsing {}", path.display()));

    let on_stage = |stage: ProcessStage| match stage {
        ProcessStage::Extracting => {}
        ProcessStage::Summarizing { completed, total } => {
            if pb.length() != Some(total as u64) {
                if let Ok(bar) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                    pb.set_style(bar.progress_chars("#>-"));
                }
                pb.set_length(total as u64);
                pb.set_message("Summarizing tables");
            }
            pb.set_position(completed as u64);
        }
        ProcessStage::Indexing => {
            pb.set_style(ProgressStyle::default_spinner());
            pb.set_message("Embedding and indexing");
        }
    };

    let result = context.process_document(&path, &cancel, &on_stage).await;
    pb.finish_and_clear();

    let report = result?;
    println!(
        "{} Found {} text chunks and {} tables.",
        style("✓").green().bold(),
        report.text_elements,
        report.table_elements
    );
    println!(
        "{} System ready: {} records indexed in {:.1}s",
        style("✓").green().bold(),
        report.records,
        report.elapsed_ms as f64 / 1000.0
    );
    Ok(())
}

async fn ask(context: &AppContext, question: &str, show_sources: bool) -> anyhow::Result<()> {
    let answer = match context.ask(question).await {
        Ok(answer) => answer,
        Err(report_rag::Error::NotReady) => {
            eprintln!("{}", style("Please process the document first!").yellow());
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };

    println!("{}", answer.answer);

    if show_sources {
        println!("\n{}", style("Source elements").bold().underlined());
        for (rank, source) in answer.sources.iter().enumerate() {
            let kind = match source.element.kind {
                ElementKind::Table => style("table").cyan(),
                ElementKind::Text => style("text").dim(),
            };
            println!(
                "\n{} {} (similarity {:.3})",
                style(format!("[{}]", rank + 1)).bold(),
                kind,
                source.similarity
            );
            println!("{}", source.element.content);
        }
    }
    Ok(())
}

fn status(context: &AppContext) {
    let stats = context.stats();
    if !stats.ready {
        println!("{}", style("No index. Run `report-rag process` first.").yellow());
        return;
    }
    println!("{} {}", style("Document:").bold(), stats.document.unwrap_or_default());
    if let Some(built_at) = stats.built_at {
        println!("{} {}", style("Built:").bold(), built_at.to_rfc3339());
    }
    println!(
        "{} {} ({} text, {} table)",
        style("Records:").bold(),
        stats.search_records,
        stats.text_records,
        stats.table_records
    );
}
