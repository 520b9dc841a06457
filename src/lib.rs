//! # paperdigest
//!
//! Map-reduce LLM summarization of research-paper PDFs into one CSV table.
//!
//! ## Modules
//!
//! - [`config`] - Settings file and environment overrides
//! - [`metadata`] - PDF info-dictionary properties
//! - [`partition`] - Section chunking via an Unstructured partition service
//! - [`llm`] - Ollama, Hugging Face and OpenAI-compatible backends
//! - [`prompts`] - Map and extraction prompt templates
//! - [`summarize`] - Map (per-chunk summary) and reduce (field extraction) steps
//! - [`pipeline`] - Per-paper orchestration
//! - [`record`] - Paper records and CSV export
//! - [`batch`] - Folder-level driver
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paperdigest::{batch, config::Settings, llm, partition::UnstructuredPartitioner, pipeline::PaperPipeline};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load(Path::new("config.yaml"))?;
//!     let model = llm::load_model(&settings)?;
//!     let client = llm::http_client(settings.request_timeout)?;
//!     let partitioner = UnstructuredPartitioner::new(client, &settings.partition);
//!     let pipeline = PaperPipeline::new(model, Box::new(partitioner));
//!     let outcome = batch::run_batch(&pipeline, &settings.pdf_folder, &settings.output_csv).await?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod llm;
pub mod metadata;
pub mod partition;
pub mod pipeline;
pub mod prompts;
pub mod record;
pub mod summarize;

pub use error::{DigestError, Result};
