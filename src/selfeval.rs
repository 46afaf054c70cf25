//! Response self-evaluation.
//!
//! Before a model response is trusted, it is scored from its own
//! declared confidence, how long the call took, and whether it carries
//! a well-formed JSON object. Responses scoring below the retry
//! threshold earn exactly one more attempt at the call site.

use crate::oracle::extract_json_block;
use serde_json::Value;

/// Execution time under which a response earns a speed bonus.
const FAST_SECS: f64 = 10.0;

/// Execution time over which a response is penalized.
const SLOW_SECS: f64 = 30.0;

/// Confidence adjustment for execution time.
const TIME_ADJUST: f64 = 0.1;

/// Confidence adjustment for response structure.
const STRUCTURE_ADJUST: f64 = 0.2;

/// Final confidence below which a retry is requested.
const RETRY_THRESHOLD: f64 = 0.75;

/// Outcome of evaluating one model response.
#[derive(Debug, Clone, Copy)]
pub struct SelfEvaluation {
    /// Final confidence in [0.0, 1.0].
    pub confidence: f64,
    /// Whether the caller should retry the call once.
    pub retry: bool,
}

/// Scores a raw model response.
///
/// The baseline is the confidence the response declares about itself
/// (0.0 when absent); execution under 10s adds 0.1 and over 30s costs
/// 0.1; a well-formed JSON object adds 0.2 and its absence costs 0.2.
/// The result is clamped to [0.0, 1.0].
pub fn evaluate(response: &str, execution_secs: f64) -> SelfEvaluation {
    let payload = extract_json_block(response)
        .and_then(|block| serde_json::from_str::<Value>(&block).ok())
        .filter(Value::is_object);

    let mut confidence = payload
        .as_ref()
        .and_then(|value| {
            value
                .get("model_confidence")
                .or_else(|| value.get("confidence"))
                .and_then(Value::as_f64)
        })
        .unwrap_or(0.0);

    if execution_secs < FAST_SECS {
        confidence += TIME_ADJUST;
    } else if execution_secs > SLOW_SECS {
        confidence -= TIME_ADJUST;
    }

    if payload.is_some() {
        confidence += STRUCTURE_ADJUST;
    } else {
        confidence -= STRUCTURE_ADJUST;
    }

    let confidence = confidence.clamp(0.0, 1.0);
    SelfEvaluation {
        confidence,
        retry: confidence < RETRY_THRESHOLD,
    }
}
