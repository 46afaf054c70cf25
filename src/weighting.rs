//! Confidence weighting and the overall sentiment rollup.
//!
//! Weighting turns a decoded result into a binary accept/reject
//! decision; the rollup collapses a product's history into one
//! time-decayed scalar and label.

use crate::memory::ProductMemory;
use crate::models::{OverallLabel, SentimentRecord, SentimentResult};
use chrono::NaiveDate;
use thiserror::Error;
use tracing::warn;

/// Bonus granted per satisfied weighting heuristic.
const HEURISTIC_BONUS: f64 = 0.1;

/// Bias term keeping the adjusted-confidence denominator away from zero.
const CONFIDENCE_BIAS: f64 = 0.4;

/// Adjusted confidence a result must exceed to be accepted.
const ACCEPT_THRESHOLD: f64 = 0.7;

/// Purchase age in days beyond which a contribution is decayed.
const DECAY_AFTER_DAYS: i64 = 365;

/// Factor applied to contributions older than the decay horizon.
const DECAY_FACTOR: f64 = 0.5;

/// Errors raised by the overall rollup.
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("cannot roll up overall sentiment for {product}: history is empty")]
    EmptyHistory { product: String },
}

/// Scores a decoded result and stamps its binary weightage.
///
/// Four heuristics add 0.1 each: persona instructions were applied, no
/// conflicting phrases, at least one key driver, no mixed signals. The
/// result is accepted only when the adjusted confidence clears 0.7.
pub fn weigh(result: SentimentResult) -> SentimentRecord {
    let mut bonus = 0.0;
    if result.persona_adjusted {
        bonus += HEURISTIC_BONUS;
    }
    if result.conflicting_phrases.is_empty() {
        bonus += HEURISTIC_BONUS;
    }
    if !result.key_drivers.is_empty() {
        bonus += HEURISTIC_BONUS;
    }
    if !result.mixed_signals {
        bonus += HEURISTIC_BONUS;
    }

    let adjusted_confidence =
        (bonus + result.model_confidence) / (result.model_confidence + CONFIDENCE_BIAS);
    let weightage = if adjusted_confidence > ACCEPT_THRESHOLD {
        1.0
    } else {
        0.0
    };

    SentimentRecord {
        result,
        adjusted_confidence,
        weightage,
    }
}

/// Collapses history into a time-decayed overall scalar and label.
///
/// Each entry contributes `weightage * sentiment_score`, halved when
/// the purchase is more than a year old as of `as_of`. Rejected entries
/// contribute nothing but stay in the denominator. The outcome is
/// written back onto the memory before it is returned.
pub fn rollup_overall(
    memory: &mut ProductMemory,
    as_of: NaiveDate,
) -> Result<(OverallLabel, f64), RollupError> {
    if memory.sentiment_history.is_empty() {
        return Err(RollupError::EmptyHistory {
            product: memory.product_name.clone(),
        });
    }

    let mut total = 0.0;
    for entry in &memory.sentiment_history {
        let mut contribution = entry.record.weightage * entry.record.result.sentiment_score;
        match purchase_age_days(&entry.context.purchase_date, as_of) {
            Some(age) if age > DECAY_AFTER_DAYS => contribution *= DECAY_FACTOR,
            Some(_) => {}
            None => warn!(
                "No decay applied for unparseable purchase date '{}'",
                entry.context.purchase_date
            ),
        }
        total += contribution;
    }

    let score = total / memory.sentiment_history.len() as f64;
    let label = OverallLabel::from_score(score);

    memory.overall_sentiment = label;
    memory.overall_sentiment_score = score;
    Ok((label, score))
}

fn purchase_age_days(purchase_date: &str, as_of: NaiveDate) -> Option<i64> {
    NaiveDate::parse_from_str(purchase_date, "%Y-%m-%d")
        .ok()
        .map(|date| (as_of - date).num_days())
}
