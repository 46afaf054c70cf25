//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

const TREND_SPANS: [&str; 5] = ["historical", "year", "halfyear", "quarter", "month"];

/// revlens - LLM-powered customer review analyzer
///
/// Fold product reviews into a running per-product memory using local
/// AI, gate analyses on dataset quality, and write Markdown/JSON
/// reports. Built in Rust.
///
/// Examples:
///   revlens --input reviews/kettles.jsonl
///   revlens --input reviews/ --model llama3.2:latest --format json
///   revlens --input reviews/kettles.jsonl --memory-dir memories
///   revlens --input reviews/kettles.jsonl --dry-run
///   revlens --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Review dataset to analyze
    ///
    /// A `.json` file (array of rows), a `.jsonl` file (one row per
    /// line), or a directory searched for such files. Falls back to
    /// `[dataset] input` in .revlens.toml when omitted.
    #[arg(short, long, value_name = "PATH", env = "REVLENS_INPUT")]
    pub input: Option<PathBuf>,

    /// Ollama model to use for analysis
    ///
    /// Recommended models: llama3.2:latest, qwen2.5:14b, mistral:7b.
    /// Falls back to `[model] name` in .revlens.toml.
    #[arg(short, long, env = "REVLENS_MODEL")]
    pub model: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .revlens.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for per-product memory snapshots
    ///
    /// Existing snapshots are loaded before folding, so signal
    /// accumulates across runs.
    #[arg(long, value_name = "DIR")]
    pub memory_dir: Option<PathBuf>,

    /// Months of history the trend analysis covers
    ///
    /// Values: historical, year, halfyear, quarter, month
    #[arg(long, value_name = "SPAN")]
    pub trend_span: Option<String>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Temperature for LLM responses (0.0 - 1.0)
    ///
    /// Lower values produce more consistent/deterministic output
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Request timeout in seconds
    ///
    /// How long to wait for the LLM to respond per call.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output, no progress bars)
    #[arg(short, long)]
    pub quiet: bool,

    /// Dry run: load the dataset and print the quality gate's decision
    /// per product without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .revlens.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Validate Ollama URL format if provided
        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        // Validate temperature range if provided
        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        // Validate timeout if provided
        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        // Validate trend span if provided
        if let Some(ref span) = self.trend_span {
            if !TREND_SPANS.contains(&span.to_lowercase().as_str()) {
                return Err(format!(
                    "Unknown trend span '{}'. Values: {}",
                    span,
                    TREND_SPANS.join(", ")
                ));
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        // Validate input path if provided
        if let Some(ref input) = self.input {
            if !input.exists() {
                return Err(format!("Input path does not exist: {}", input.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
