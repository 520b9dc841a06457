//! Structured extraction prompt (reduce step).
//!
//! The field list here is the canonical output schema: the same keys, in the
//! same order, become the summary columns of the exported table.

/// Extracted field names with the instruction given to the model for each.
pub const FIELD_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "overall_summary",
        "A comprehensive summary of the paper's purpose, key findings, and conclusions.",
    ),
    (
        "methodology",
        "A description of the methodology, techniques, and experiments used in the research.",
    ),
    ("algorithms", "Give only names of algorithms tested in the paper."),
    (
        "type_of_task",
        "Give only naming of the approach used based on the task, write 'classification' or 'regression'.",
    ),
    (
        "type_of_learning",
        "Based on algorithm and paper methodology, answer if it is 'supervised learning', 'unsupervised learning', 'semi-supervised learning', 'Reinforcement learning'.",
    ),
    (
        "data_pre_processing_methods",
        "Give description on specific methods when pre-processing data in this research paper.",
    ),
    ("results", "A concise short description on results."),
    (
        "conclusion",
        "What is the main paper's conclusion and its contribution.",
    ),
    (
        "dataset",
        "Concise answer 'yes' if the dataset used is publicly available, 'no' if the dataset isn't available or not mentioned.",
    ),
    (
        "future_recommendations",
        "Any future work, open questions, or recommendations for further research mentioned in the paper.",
    ),
];

/// Summary columns in output order
pub const SUMMARY_FIELDS: &[&str] = &[
    "overall_summary",
    "methodology",
    "algorithms",
    "type_of_task",
    "type_of_learning",
    "data_pre_processing_methods",
    "results",
    "conclusion",
    "dataset",
    "future_recommendations",
];

/// Template for synthesizing chunk summaries into structured fields.
/// Placeholders: {field_keys}, {field_descriptions}, {chunk_summaries}
pub const EXTRACTION_PROMPT_TEMPLATE: &str = r#"You are an expert analyst specializing in scientific research papers.
You have been provided with a series of summaries from different sections of a single research paper.
Your task is to synthesize this information and extract the following key points.
Respond with a JSON object containing exactly the following keys: {field_keys}.

{field_descriptions}

If a particular piece of information is not present, return an empty string for that key.
Never omit a key and never use null.
Output strict JSON only (no markdown code blocks, no extra text).

Here are the summaries of the paper's sections:
{chunk_summaries}"#;

/// Build the reduce prompt over the combined chunk summaries
pub fn build_extraction_prompt(chunk_summaries: &str) -> String {
    let field_keys = FIELD_DESCRIPTIONS
        .iter()
        .map(|(name, _)| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ");
    let field_descriptions = FIELD_DESCRIPTIONS
        .iter()
        .map(|(name, description)| format!("- '{}': {}", name, description))
        .collect::<Vec<_>>()
        .join("\n");

    // Summaries go in last so braces inside them are never treated as placeholders.
    EXTRACTION_PROMPT_TEMPLATE
        .replace("{field_keys}", &field_keys)
        .replace("{field_descriptions}", &field_descriptions)
        .replace("{chunk_summaries}", chunk_summaries)
}
