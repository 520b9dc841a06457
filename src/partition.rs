//! PDF content partitioning.
//!
//! Layout analysis, OCR and section chunking are delegated to an Unstructured
//! partition service. This module sends the PDF with the chunking policy and
//! decodes the returned element list into typed [`Element`]s.

use crate::config::PartitionSettings;
use crate::error::{DigestError, Result};
use crate::llm::ensure_success;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

/// Partition endpoint path on the Unstructured API
const PARTITION_ENDPOINT: &str = "/general/v0/general";

/// Header carrying the API key for hosted deployments
const API_KEY_HEADER: &str = "unstructured-api-key";

/// Size policy for by-title chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    /// Hard ceiling on characters per chunk
    pub max_characters: usize,
    /// Sections shorter than this are merged with their neighbour
    pub combine_under_n_chars: usize,
    /// Soft ceiling: start a new chunk once this many characters accumulate
    pub new_after_n_chars: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            max_characters: 8000,
            combine_under_n_chars: 1000,
            new_after_n_chars: 1800,
        }
    }
}

/// Text assembled from several smaller layout elements of one section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeElement {
    pub text: String,
}

/// One unit returned by the partitioner
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Merged section text; the only kind that gets summarized
    Composite(CompositeElement),
    /// Table or table fragment
    Table { text: String },
    /// Images, page breaks and anything else
    Other { kind: String },
}

impl Element {
    pub fn into_composite(self) -> Option<CompositeElement> {
        match self {
            Element::Composite(c) => Some(c),
            _ => None,
        }
    }
}

/// Element as serialized by the partition service
#[derive(Debug, Deserialize)]
struct RawElement {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl From<RawElement> for Element {
    fn from(raw: RawElement) -> Self {
        match raw.kind.as_str() {
            "CompositeElement" => Element::Composite(CompositeElement { text: raw.text }),
            "Table" | "TableChunk" => Element::Table { text: raw.text },
            _ => Element::Other { kind: raw.kind },
        }
    }
}

/// Decode a partition response body
pub fn parse_elements(body: &str) -> Result<Vec<Element>> {
    let raw: Vec<RawElement> = serde_json::from_str(body)
        .map_err(|e| DigestError::Partition(format!("unexpected element list: {}", e)))?;
    Ok(raw.into_iter().map(Element::from).collect())
}

/// Keep only the composite text elements, in order.
pub fn composite_chunks(elements: Vec<Element>) -> Vec<CompositeElement> {
    elements.into_iter().filter_map(Element::into_composite).collect()
}

/// Anything that can split a PDF into ordered elements.
#[async_trait]
pub trait Partitioner: Send + Sync {
    async fn partition(&self, path: &Path) -> Result<Vec<Element>>;
}

/// Client for the Unstructured partition API
pub struct UnstructuredPartitioner {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
    strategy: String,
    chunking: ChunkingParams,
}

impl UnstructuredPartitioner {
    pub fn new(client: reqwest::Client, settings: &PartitionSettings) -> Self {
        Self {
            client,
            api_url: format!("{}{}", settings.api_url.trim_end_matches('/'), PARTITION_ENDPOINT),
            api_key: settings.api_key.clone(),
            strategy: settings.strategy.clone(),
            chunking: ChunkingParams::default(),
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkingParams) -> Self {
        self.chunking = chunking;
        self
    }

    /// Text fields of the multipart form, besides the file itself
    fn form_fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("strategy", self.strategy.clone()),
            ("chunking_strategy", "by_title".to_string()),
            ("max_characters", self.chunking.max_characters.to_string()),
            ("combine_under_n_chars", self.chunking.combine_under_n_chars.to_string()),
            ("new_after_n_chars", self.chunking.new_after_n_chars.to_string()),
            ("pdf_infer_table_structure", "false".to_string()),
        ]
    }
}

#[async_trait]
impl Partitioner for UnstructuredPartitioner {
    async fn partition(&self, path: &Path) -> Result<Vec<Element>> {
        let file_bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("document.pdf")
            .to_string();

        let part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(filename)
            .mime_str("application/pdf")?;

        let mut form = reqwest::multipart::Form::new().part("files", part);
        for (name, value) in self.form_fields() {
            form = form.text(name, value);
        }

        debug!(url = %self.api_url, strategy = %self.strategy, "Partitioning PDF");

        let mut request = self
            .client
            .post(&self.api_url)
            .header("Accept", "application/json")
            .multipart(form);
        if let Some(ref key) = self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = ensure_success(request.send().await?).await?;
        let body = response.text().await?;
        parse_elements(&body)
    }
}
