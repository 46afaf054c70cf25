//! Model oracle seam.
//!
//! The pipeline talks to its language model through the [`Oracle`]
//! trait so analyses stay testable without a live server. The Ollama
//! client lives in [`client`]; strict response decoding in [`parse`].

pub mod client;
pub mod parse;

pub use client::{OllamaOracle, OracleConfig};
pub use parse::{decode_payload, extract_json_block};

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while decoding oracle output.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("response contains no JSON object")]
    MissingPayload,
    #[error("response payload failed to decode")]
    Decode(#[from] serde_json::Error),
}

/// An opaque language-model oracle.
///
/// `generate` returns the raw response text plus the call's execution
/// time in seconds. Transport failures surface as an empty response
/// with zero time, never as an error; downstream decoding treats the
/// empty string like any other malformed payload.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn generate(&self, prompt: &str) -> (String, f64);

    /// Model name for report metadata.
    fn model_name(&self) -> &str;
}
