//! Chunk summarization prompt (map step).

/// Template for summarizing a single text or table chunk.
/// Placeholder: {element}
pub const SUMMARIZE_PROMPT_TEMPLATE: &str = r#"You are an assistant tasked with summarizing tables and text.
Give a concise summary of the table or text chunk.

Respond only with the summary, no additional comment.
Do not start your message by saying "Here is a summary" or anything like that.
Just give the summary as it is.

Table or text chunk: {element}"#;

/// Build the map prompt for one chunk
pub fn build_summarize_prompt(chunk_text: &str) -> String {
    SUMMARIZE_PROMPT_TEMPLATE.replace("{element}", chunk_text)
}
