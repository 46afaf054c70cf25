//! Ollama chat client.
//!
//! Non-streaming calls against the `/api/chat` endpoint with a bounded
//! per-call timeout and a bounded number of transport retries. When
//! every attempt fails the client fails closed to an empty response.

use crate::oracle::Oracle;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Configuration for the Ollama oracle.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    /// Transport attempts per call before failing closed.
    pub max_retries: u32,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.1,
            timeout_seconds: 120,
            max_retries: 3,
        }
    }
}

impl From<&crate::config::ModelConfig> for OracleConfig {
    fn from(config: &crate::config::ModelConfig) -> Self {
        Self {
            ollama_url: config.ollama_url.clone(),
            model_name: config.name.clone(),
            temperature: config.temperature,
            timeout_seconds: config.timeout_seconds,
            max_retries: config.max_retries,
        }
    }
}

/// Message in the chat request.
#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Oracle backed by a local Ollama server.
pub struct OllamaOracle {
    config: OracleConfig,
    http_client: reqwest::Client,
}

impl OllamaOracle {
    /// Create a new oracle from its configuration.
    pub fn new(config: OracleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let request = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: ANALYST_SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    anyhow::anyhow!("Request timed out after {}s", self.config.timeout_seconds)
                } else if e.is_connect() {
                    anyhow::anyhow!(
                        "Cannot connect to Ollama at {}. Is Ollama running?",
                        self.config.ollama_url
                    )
                } else {
                    anyhow::anyhow!("Failed to send request: {}", e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Ollama API error {}: {}", status, body));
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(chat_response.message.content)
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn generate(&self, prompt: &str) -> (String, f64) {
        let started = Instant::now();

        for attempt in 1..=self.config.max_retries {
            match self.chat(prompt).await {
                Ok(content) => {
                    let secs = started.elapsed().as_secs_f64();
                    debug!("Model responded in {:.1}s (attempt {})", secs, attempt);
                    return (content, secs);
                }
                Err(e) => {
                    warn!(
                        "Model call failed (attempt {}/{}): {}",
                        attempt, self.config.max_retries, e
                    );
                }
            }
        }

        // Fail closed; decoders treat the empty string as malformed.
        (String::new(), 0.0)
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}

/// System prompt shared by every analysis call.
const ANALYST_SYSTEM_PROMPT: &str = r#"You are a meticulous customer-review analyst.
You always answer with a single valid JSON object matching the schema you were given.
Only output JSON, no explanations or markdown."#;
