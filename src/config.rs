//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.revlens.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report output path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "review_report.md".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Default model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Transport attempts per call before failing closed.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    120
}

fn default_retries() -> u32 {
    3
}

/// Review dataset settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// Default dataset path when `--input` is not given.
    ///
    /// A `.json`/`.jsonl` file, or a directory to search for them.
    #[serde(default)]
    pub input: Option<String>,

    /// Directory where per-product memory snapshots are persisted.
    ///
    /// When set, existing snapshots are loaded before folding so signal
    /// accumulates across runs. Unset means no persistence.
    #[serde(default)]
    pub memory_dir: Option<String>,
}

/// Analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Months of history the trend analysis covers.
    ///
    /// One of: historical, year, halfyear, quarter, month.
    #[serde(default = "default_trend_span")]
    pub trend_span: String,

    /// Run feature extraction when the quality gate authorizes it.
    #[serde(default = "default_true")]
    pub run_features: bool,

    /// Run the narrative summary when the quality gate authorizes it.
    #[serde(default = "default_true")]
    pub run_summary: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_span: default_trend_span(),
            run_features: true,
            run_summary: true,
        }
    }
}

fn default_trend_span() -> String {
    "historical".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(".revlens.toml");

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Try to load configuration shipped next to the dataset.
    ///
    /// For a dataset directory this looks inside it; for a dataset file,
    /// in its parent directory.
    pub fn load_near(dataset_path: &Path) -> Result<Option<Self>> {
        let dir = if dataset_path.is_dir() {
            dataset_path
        } else {
            dataset_path.parent().unwrap_or_else(|| Path::new("."))
        };
        let config_path = dir.join(".revlens.toml");

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref ollama_url) = args.ollama_url {
            self.model.ollama_url = ollama_url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref input) = args.input {
            self.dataset.input = Some(input.display().to_string());
        }
        if let Some(ref memory_dir) = args.memory_dir {
            self.dataset.memory_dir = Some(memory_dir.display().to_string());
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }
        if let Some(ref span) = args.trend_span {
            self.analysis.trend_span = span.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.model.name, "llama3.2:latest");
        assert_eq!(config.model.timeout_seconds, 120);
        assert_eq!(config.analysis.trend_span, "historical");
        assert!(config.dataset.input.is_none());
        assert!(config.analysis.run_features);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "custom_report.md"
verbose = true

[model]
name = "qwen2.5:14b"
temperature = 0.2

[dataset]
input = "reviews/kettles.jsonl"
memory_dir = "memories"

[analysis]
trend_span = "quarter"
run_summary = false
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output, "custom_report.md");
        assert!(config.general.verbose);
        assert_eq!(config.model.name, "qwen2.5:14b");
        assert_eq!(config.model.temperature, 0.2);
        assert_eq!(config.dataset.input.as_deref(), Some("reviews/kettles.jsonl"));
        assert_eq!(config.dataset.memory_dir.as_deref(), Some("memories"));
        assert_eq!(config.analysis.trend_span, "quarter");
        assert!(!config.analysis.run_summary);
        assert!(config.analysis.run_features);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[model]"));
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[analysis]"));
    }
}
