//! Per-paper orchestration: metadata, partition, map, reduce, merge.

use crate::error::Result;
use crate::llm::LanguageModel;
use crate::metadata::{self, extract_metadata};
use crate::partition::{composite_chunks, Partitioner};
use crate::record::PaperRecord;
use crate::summarize::{combine_summaries, extract_fields, summarize_chunks};
use std::path::Path;
use tracing::{error, info};

/// Default bound on concurrent map-step requests
pub const DEFAULT_MAP_CONCURRENCY: usize = 4;

/// The model and partitioner one run works with.
pub struct PaperPipeline {
    model: Box<dyn LanguageModel>,
    partitioner: Box<dyn Partitioner>,
    map_concurrency: usize,
}

impl PaperPipeline {
    pub fn new(model: Box<dyn LanguageModel>, partitioner: Box<dyn Partitioner>) -> Self {
        Self {
            model,
            partitioner,
            map_concurrency: DEFAULT_MAP_CONCURRENCY,
        }
    }

    pub fn with_map_concurrency(mut self, map_concurrency: usize) -> Self {
        self.map_concurrency = map_concurrency.max(1);
        self
    }

    /// Process one PDF into a record.
    ///
    /// Metadata problems and empty partitions are absorbed here; partitioner,
    /// model and decoding errors propagate to the caller.
    pub async fn process_paper(&self, path: &Path) -> Result<PaperRecord> {
        let filename = metadata::file_name(path);
        info!(file = %filename, "Processing PDF");

        info!("Extracting metadata");
        let record = PaperRecord::from_metadata(extract_metadata(path));

        info!("Parsing PDF content");
        let elements = self.partitioner.partition(path).await?;
        let chunks = composite_chunks(elements);
        if chunks.is_empty() {
            error!(
                file = %filename,
                "PDF text extraction produced no content, skipping summarization"
            );
            return Ok(record);
        }

        let summaries = summarize_chunks(self.model.as_ref(), &chunks, self.map_concurrency).await?;
        let combined = combine_summaries(&summaries);
        let extracted = extract_fields(self.model.as_ref(), &combined).await?;

        Ok(record.with_extracted(extracted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DigestError;
    use crate::partition::{CompositeElement, Element};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    struct FakePartitioner(Vec<Element>);

    #[async_trait]
    impl Partitioner for FakePartitioner {
        async fn partition(&self, _path: &Path) -> Result<Vec<Element>> {
            Ok(self.0.clone())
        }
    }

    /// Records every prompt; answers map prompts with a summary (or an error
    /// for `failing_chunk`) and the extraction prompt with `extraction`.
    struct ScriptedModel {
        prompts: Arc<Mutex<Vec<String>>>,
        extraction: std::result::Result<String, String>,
        failing_chunk: Option<&'static str>,
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn invoke(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().expect("lock").push(prompt.to_string());
            if let Some(text) = prompt.split("Table or text chunk: ").nth(1) {
                if self.failing_chunk == Some(text) {
                    return Err(DigestError::Api {
                        code: 500,
                        message: "map request failed".to_string(),
                    });
                }
                return Ok(format!("S({})", text));
            }
            self.extraction.clone().map_err(|message| DigestError::Api {
                code: 503,
                message,
            })
        }

        fn model_id(&self) -> &str {
            "scripted"
        }
    }

    fn composite(text: &str) -> Element {
        Element::Composite(CompositeElement {
            text: text.to_string(),
        })
    }

    fn build_pipeline(
        elements: Vec<Element>,
        extraction: std::result::Result<String, String>,
    ) -> (PaperPipeline, Arc<Mutex<Vec<String>>>) {
        build_pipeline_failing_on(elements, extraction, None)
    }

    fn build_pipeline_failing_on(
        elements: Vec<Element>,
        extraction: std::result::Result<String, String>,
        failing_chunk: Option<&'static str>,
    ) -> (PaperPipeline, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let model = ScriptedModel {
            prompts: Arc::clone(&prompts),
            extraction,
            failing_chunk,
        };
        let pipeline = PaperPipeline::new(Box::new(model), Box::new(FakePartitioner(elements)))
            .with_map_concurrency(2);
        (pipeline, prompts)
    }

    #[tokio::test]
    async fn test_two_chunks_map_twice_reduce_once() -> Result<()> {
        let (pipeline, prompts) = build_pipeline(
            vec![
                composite("intro"),
                Element::Other { kind: "Image".to_string() },
                composite("methods"),
            ],
            Ok(r#"{"Overall_Summary": "A paper", "Results": "Good"}"#.to_string()),
        );

        let record = pipeline
            .process_paper(&PathBuf::from("/nonexistent/paper.pdf"))
            .await?;

        let prompts = prompts.lock().expect("lock").clone();
        assert_eq!(prompts.len(), 3);
        let map_prompts: Vec<&String> = prompts
            .iter()
            .filter(|p| p.contains("Table or text chunk: "))
            .collect();
        assert_eq!(map_prompts.len(), 2);
        assert!(prompts[2].ends_with("S(intro)\n\n---\n\nS(methods)"));

        assert_eq!(record.get("filename"), Some("paper.pdf"));
        assert_eq!(record.get("title"), Some(""));
        assert_eq!(record.get("overall_summary"), Some("A paper"));
        assert_eq!(record.get("results"), Some("Good"));
        Ok(())
    }

    #[tokio::test]
    async fn test_no_text_chunks_returns_metadata_only() -> Result<()> {
        let (pipeline, prompts) = build_pipeline(
            vec![Element::Table { text: "a | b".to_string() }],
            Ok("{}".to_string()),
        );

        let record = pipeline
            .process_paper(&PathBuf::from("/nonexistent/scan.pdf"))
            .await?;

        assert!(prompts.lock().expect("lock").is_empty());
        assert_eq!(
            record,
            PaperRecord::from_metadata(crate::metadata::DocumentMetadata::empty("scan.pdf"))
        );
        assert!(!record.contains("overall_summary"));
        Ok(())
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let (pipeline, _) = build_pipeline(
            vec![composite("intro")],
            Err("provider down".to_string()),
        );

        let result = pipeline
            .process_paper(&PathBuf::from("/nonexistent/paper.pdf"))
            .await;
        assert!(matches!(result, Err(DigestError::Api { code: 503, .. })));
    }

    #[tokio::test]
    async fn test_map_failure_propagates_without_reduce() {
        let (pipeline, prompts) = build_pipeline_failing_on(
            vec![composite("intro"), composite("methods"), composite("results")],
            Ok("{}".to_string()),
            Some("methods"),
        );

        let result = pipeline
            .process_paper(&PathBuf::from("/nonexistent/paper.pdf"))
            .await;
        assert!(matches!(result, Err(DigestError::Api { code: 500, .. })));

        let prompts = prompts.lock().expect("lock").clone();
        assert!(!prompts.is_empty());
        assert!(prompts.iter().all(|p| p.contains("Table or text chunk: ")));
    }

    #[tokio::test]
    async fn test_malformed_extraction_propagates() {
        let (pipeline, _) = build_pipeline(
            vec![composite("intro")],
            Ok("not json at all".to_string()),
        );

        let result = pipeline
            .process_paper(&PathBuf::from("/nonexistent/paper.pdf"))
            .await;
        assert!(matches!(result, Err(DigestError::MalformedResponse(_))));
    }
}
