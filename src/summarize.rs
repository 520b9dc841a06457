//! Map-reduce summarization.
//!
//! The map step asks the model for one summary per text chunk; the reduce
//! step joins those summaries and asks for a single JSON object holding the
//! analytical fields.

use crate::error::{DigestError, Result};
use crate::llm::LanguageModel;
use crate::partition::CompositeElement;
use crate::prompts::{build_extraction_prompt, build_summarize_prompt};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info};

/// Separator placed between chunk summaries in the combined document
pub const SUMMARY_SEPARATOR: &str = "\n\n---\n\n";

/// Field name (lowercase) -> value, as returned by the reduce step
pub type ExtractedFields = HashMap<String, String>;

/// Summarize every chunk, at most `concurrency` requests in flight.
///
/// The returned summaries line up with `chunks` index for index, whatever
/// order the requests complete in. The first failed request fails the call.
pub async fn summarize_chunks(
    model: &dyn LanguageModel,
    chunks: &[CompositeElement],
    concurrency: usize,
) -> Result<Vec<String>> {
    info!(
        count = chunks.len(),
        model = %model.model_id(),
        concurrency = concurrency,
        "Summarizing text chunks"
    );

    stream::iter(chunks.iter().enumerate())
        .map(|(idx, chunk)| async move {
            debug!(chunk = idx, chars = chunk.text.len(), "Summarizing chunk");
            let prompt = build_summarize_prompt(&chunk.text);
            model
                .invoke(&prompt)
                .await
                .map(|summary| summary.trim().to_string())
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await
}

/// Join chunk summaries in order
pub fn combine_summaries(summaries: &[String]) -> String {
    summaries.join(SUMMARY_SEPARATOR)
}

/// Run the reduce step over the combined summaries.
pub async fn extract_fields(model: &dyn LanguageModel, combined: &str) -> Result<ExtractedFields> {
    info!(chars = combined.len(), "Synthesizing and extracting final data");
    let prompt = build_extraction_prompt(combined);
    let content = model.invoke(&prompt).await?;
    parse_extraction(&content)
}

/// Decode the reduce response: a JSON object, keys lowercased.
///
/// A surrounding Markdown code fence is tolerated; nothing else is repaired.
/// Keys are read in document order, so of two keys differing only by case
/// the later one wins.
pub fn parse_extraction(content: &str) -> Result<ExtractedFields> {
    let json_str = strip_code_fence(content);

    let value: Value = serde_json::from_str(json_str).map_err(|e| {
        let preview: String = content.chars().take(200).collect();
        debug!(content_preview = %preview, "Extraction output is not JSON");
        DigestError::MalformedResponse(format!("extraction is not valid JSON: {}", e))
    })?;

    let Value::Object(map) = value else {
        return Err(DigestError::MalformedResponse(
            "extraction is not a JSON object".to_string(),
        ));
    };

    Ok(map
        .into_iter()
        .map(|(key, value)| (key.to_lowercase(), value_to_string(value)))
        .collect())
}

/// Strip a ```json ... ``` wrapper if the model added one
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();

    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Flatten a field value to cell text
fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Array(items) => items
            .into_iter()
            .map(value_to_string)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
