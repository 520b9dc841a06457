//! paperdigest - research-paper PDF summarizer
//!
//! Scans a folder of PDFs, summarizes each paper with a language model and
//! writes one CSV row per paper.
//!
//! ## Usage
//! ```bash
//! paperdigest                      # reads ./config.yaml
//! paperdigest --config run.yaml --debug
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use paperdigest::{
    batch::{self, BatchOutcome},
    config::{Settings, DEFAULT_CONFIG_PATH},
    llm,
    partition::UnstructuredPartitioner,
    pipeline::PaperPipeline,
};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Summarize a folder of research papers into a single CSV
#[derive(Parser)]
#[command(name = "paperdigest")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Settings file (YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .init();

    // Secrets such as HF_TOKEN may live in a .env file
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            warn!(error = %e, "Failed to read .env file");
        }
    }

    let settings = Settings::load(&cli.config)
        .with_context(|| format!("Failed to load settings from {}", cli.config.display()))?;

    info!("Load model and partitioner");
    let model = llm::load_model(&settings).context("Failed to load model")?;
    let client = llm::http_client(settings.request_timeout)?;
    let partitioner = UnstructuredPartitioner::new(client, &settings.partition);
    let pipeline = PaperPipeline::new(model, Box::new(partitioner))
        .with_map_concurrency(settings.map_concurrency);
    info!("Model loaded, prompts prepared");

    let outcome = batch::run_batch(&pipeline, &settings.pdf_folder, &settings.output_csv)
        .await
        .context("Batch run failed")?;

    match outcome {
        BatchOutcome::FolderCreated | BatchOutcome::NoPdfs => {
            info!("Terminated early: no input");
        }
        BatchOutcome::Completed { written } => {
            info!(records = written, "Completed");
        }
    }

    Ok(())
}
