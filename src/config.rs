//! Run configuration.
//!
//! Settings come from a flat YAML file of `KEY: value` pairs (by default
//! `config.yaml` in the working directory). Any key can be overridden by an
//! environment variable of the same name. Only presence of the required keys
//! is checked; values are passed through to the components that use them.

use crate::error::{DigestError, Result};
use crate::pipeline::DEFAULT_MAP_CONCURRENCY;
use serde_yaml::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Settings file read when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

pub const PDF_FOLDER: &str = "PDF_FOLDER";
pub const OUTPUT_CSV: &str = "OUTPUT_CSV";
pub const MODEL_PROVIDER: &str = "MODEL_PROVIDER";
pub const PARTITION_PDF_STRATEGY: &str = "PARTITION_PDF_STRATEGY";

const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";
const OLLAMA_MODEL: &str = "OLLAMA_MODEL";
const HF_BASE_URL: &str = "HF_BASE_URL";
const HF_MODEL: &str = "HF_MODEL";
const HF_TOKEN: &str = "HF_TOKEN";
const LLM_BASE_URL: &str = "LLM_BASE_URL";
const LLM_MODEL: &str = "LLM_MODEL";
const LLM_API_KEY: &str = "LLM_API_KEY";
const UNSTRUCTURED_API_URL: &str = "UNSTRUCTURED_API_URL";
const UNSTRUCTURED_API_KEY: &str = "UNSTRUCTURED_API_KEY";
const MAP_CONCURRENCY: &str = "MAP_CONCURRENCY";
const REQUEST_TIMEOUT_SECS: &str = "REQUEST_TIMEOUT_SECS";

/// Every key the environment may override
const KNOWN_KEYS: &[&str] = &[
    PDF_FOLDER,
    OUTPUT_CSV,
    MODEL_PROVIDER,
    PARTITION_PDF_STRATEGY,
    OLLAMA_BASE_URL,
    OLLAMA_MODEL,
    HF_BASE_URL,
    HF_MODEL,
    HF_TOKEN,
    LLM_BASE_URL,
    LLM_MODEL,
    LLM_API_KEY,
    UNSTRUCTURED_API_URL,
    UNSTRUCTURED_API_KEY,
    MAP_CONCURRENCY,
    REQUEST_TIMEOUT_SECS,
];

const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434";
const DEFAULT_OLLAMA_MODEL: &str = "llama3:8b";
const DEFAULT_HF_BASE_URL: &str = "https://router.huggingface.co/v1";
const DEFAULT_HF_MODEL: &str = "mistralai/Mistral-7B-Instruct-v0.3";
const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
const DEFAULT_UNSTRUCTURED_API_URL: &str = "http://localhost:8000";

/// Raw key/value pairs before any key is required.
#[derive(Debug, Clone, Default)]
pub struct SettingsSource {
    values: HashMap<String, String>,
}

impl SettingsSource {
    /// Parse a flat YAML mapping. Scalars are kept as their string form.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let parsed: Option<HashMap<String, Value>> = serde_yaml::from_str(content)?;

        let mut values = HashMap::new();
        for (key, value) in parsed.unwrap_or_default() {
            let text = match value {
                Value::Null => continue,
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                _ => {
                    return Err(DigestError::Config(format!(
                        "{} must be a scalar value",
                        key
                    )))
                }
            };
            values.insert(key, text);
        }

        Ok(Self { values })
    }

    /// Read a settings file. A file that does not exist yields an empty
    /// source so the environment alone can configure the run.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using environment only");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Override known keys with whatever `lookup` returns for them.
    pub fn overlay<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in KNOWN_KEYS {
            if let Some(value) = lookup(key) {
                self.values.insert((*key).to_string(), value);
            }
        }
        self
    }

    /// Override known keys from the process environment.
    pub fn overlay_env(self) -> Self {
        self.overlay(|key| std::env::var(key).ok())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn require(&self, key: &'static str) -> Result<String> {
        self.get(key)
            .map(str::to_string)
            .ok_or(DigestError::MissingSetting(key))
    }

    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    fn get_parsed<T: std::str::FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| DigestError::Config(format!("{} has an invalid value: {}", key, raw))),
        }
    }
}

/// Ollama server settings
#[derive(Debug, Clone)]
pub struct OllamaSettings {
    pub base_url: String,
    pub model: String,
}

/// Settings for an OpenAI-compatible chat-completions endpoint
#[derive(Debug, Clone)]
pub struct ChatEndpointSettings {
    pub base_url: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
}

/// Partitioner service settings
#[derive(Debug, Clone)]
pub struct PartitionSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    /// Passed to the partitioner as-is (e.g. `ocr_only`, `hi_res`, `fast`)
    pub strategy: String,
}

/// Process-wide settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    pub pdf_folder: PathBuf,
    pub output_csv: PathBuf,
    pub model_provider: String,
    pub partition: PartitionSettings,
    pub ollama: OllamaSettings,
    pub huggingface: ChatEndpointSettings,
    pub openai: ChatEndpointSettings,
    pub map_concurrency: usize,
    /// `None` means model and partitioner calls never time out
    pub request_timeout: Option<Duration>,
}

impl Settings {
    /// Load `path`, apply environment overrides and require the core keys.
    pub fn load(path: &Path) -> Result<Self> {
        let source = SettingsSource::from_file(path)?.overlay_env();
        Self::from_source(&source)
    }

    pub fn from_source(source: &SettingsSource) -> Result<Self> {
        let map_concurrency = source
            .get_parsed::<usize>(MAP_CONCURRENCY)?
            .unwrap_or(DEFAULT_MAP_CONCURRENCY)
            .max(1);

        Ok(Self {
            pdf_folder: PathBuf::from(source.require(PDF_FOLDER)?),
            output_csv: PathBuf::from(source.require(OUTPUT_CSV)?),
            model_provider: source.require(MODEL_PROVIDER)?,
            partition: PartitionSettings {
                api_url: source.get_or(UNSTRUCTURED_API_URL, DEFAULT_UNSTRUCTURED_API_URL),
                api_key: source.get(UNSTRUCTURED_API_KEY).map(str::to_string),
                strategy: source.require(PARTITION_PDF_STRATEGY)?,
            },
            ollama: OllamaSettings {
                base_url: source.get_or(OLLAMA_BASE_URL, DEFAULT_OLLAMA_BASE_URL),
                model: source.get_or(OLLAMA_MODEL, DEFAULT_OLLAMA_MODEL),
            },
            huggingface: ChatEndpointSettings {
                base_url: Some(source.get_or(HF_BASE_URL, DEFAULT_HF_BASE_URL)),
                model: source.get_or(HF_MODEL, DEFAULT_HF_MODEL),
                api_key: source.get(HF_TOKEN).map(str::to_string),
            },
            openai: ChatEndpointSettings {
                base_url: source.get(LLM_BASE_URL).map(str::to_string),
                model: source.get_or(LLM_MODEL, DEFAULT_LLM_MODEL),
                api_key: source.get(LLM_API_KEY).map(str::to_string),
            },
            map_concurrency,
            request_timeout: source
                .get_parsed::<u64>(REQUEST_TIMEOUT_SECS)?
                .map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
PDF_FOLDER: papers
OUTPUT_CSV: out/summary.csv
MODEL_PROVIDER: OLLAMA
PARTITION_PDF_STRATEGY: ocr_only
"#;

    #[test]
    fn test_minimal_file_uses_defaults() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(MINIMAL.as_bytes())?;

        let source = SettingsSource::from_file(file.path())?;
        let settings = Settings::from_source(&source)?;

        assert_eq!(settings.pdf_folder, PathBuf::from("papers"));
        assert_eq!(settings.output_csv, PathBuf::from("out/summary.csv"));
        assert_eq!(settings.model_provider, "OLLAMA");
        assert_eq!(settings.partition.strategy, "ocr_only");
        assert_eq!(settings.partition.api_url, DEFAULT_UNSTRUCTURED_API_URL);
        assert_eq!(settings.ollama.model, "llama3:8b");
        assert_eq!(settings.map_concurrency, DEFAULT_MAP_CONCURRENCY);
        assert!(settings.request_timeout.is_none());
        assert!(settings.huggingface.api_key.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_key_is_named() -> Result<()> {
        let source = SettingsSource::from_yaml_str("PDF_FOLDER: papers\nOUTPUT_CSV: out.csv\n")?;
        match Settings::from_source(&source) {
            Err(DigestError::MissingSetting(key)) => assert_eq!(key, MODEL_PROVIDER),
            other => panic!("expected missing MODEL_PROVIDER, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn test_overlay_wins_over_file() -> Result<()> {
        let source = SettingsSource::from_yaml_str(MINIMAL)?.overlay(|key| match key {
            "MODEL_PROVIDER" => Some("HF_API".to_string()),
            "HF_TOKEN" => Some("hf_secret".to_string()),
            "MAP_CONCURRENCY" => Some("2".to_string()),
            _ => None,
        });
        let settings = Settings::from_source(&source)?;

        assert_eq!(settings.model_provider, "HF_API");
        assert_eq!(settings.huggingface.api_key.as_deref(), Some("hf_secret"));
        assert_eq!(settings.map_concurrency, 2);
        assert_eq!(settings.pdf_folder, PathBuf::from("papers"));
        Ok(())
    }

    #[test]
    fn test_numeric_scalars_and_invalid_numbers() -> Result<()> {
        let yaml = format!("{}MAP_CONCURRENCY: 0\nREQUEST_TIMEOUT_SECS: 90\n", MINIMAL);
        let settings = Settings::from_source(&SettingsSource::from_yaml_str(&yaml)?)?;
        assert_eq!(settings.map_concurrency, 1);
        assert_eq!(settings.request_timeout, Some(Duration::from_secs(90)));

        let bad = format!("{}MAP_CONCURRENCY: lots\n", MINIMAL);
        let result = Settings::from_source(&SettingsSource::from_yaml_str(&bad)?);
        assert!(matches!(result, Err(DigestError::Config(_))));
        Ok(())
    }

    #[test]
    fn test_missing_file_is_empty_source() -> Result<()> {
        let source = SettingsSource::from_file(Path::new("/nonexistent/config.yaml"))?;
        assert!(source.get(PDF_FOLDER).is_none());
        Ok(())
    }

    #[test]
    fn test_nested_value_rejected() {
        let result = SettingsSource::from_yaml_str("PDF_FOLDER:\n  - a\n  - b\n");
        assert!(matches!(result, Err(DigestError::Config(_))));
    }
}
