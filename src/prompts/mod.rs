//! Prompt module for LLM-based operations.
//!
//! One template per pipeline step: chunk summarization (map) and
//! structured field extraction (reduce).

pub mod extraction;
pub mod summarize;

pub use extraction::{build_extraction_prompt, SUMMARY_FIELDS};
pub use summarize::build_summarize_prompt;
