//! Point-in-time review context.
//!
//! Each review is analyzed against a context assembled from the row
//! itself plus the memory accumulated from the reviews before it. A
//! context is immutable once built; review N never sees review N's
//! own effect on memory.

use crate::dataset::ReviewRecord;
use crate::memory::ProductMemory;
use crate::models::{Persona, TrendLabel};
use serde::{Deserialize, Serialize};

/// Everything the model is told about one review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewContext {
    /// Whether the purchase was verified.
    pub verified_purchase: bool,
    /// Star rating from the row.
    pub rating: u8,
    /// Character count of the review text.
    pub review_length: usize,
    /// Helpful votes over total votes, 0.0 when nobody voted.
    pub helpfulness_ratio: f64,
    /// Composite quality score in [0.0, 1.0].
    pub quality_score: f64,
    /// Analyst persona for this review.
    pub persona: Persona,
    /// Confidence prior before any model output.
    pub base_confidence: f64,
    /// Trend label at the time this review is analyzed.
    pub current_trend: TrendLabel,
    /// Up to three most mentioned complaints so far.
    pub recent_issues: Vec<String>,
    /// Up to three most praised features so far.
    pub recent_usps: Vec<String>,
    /// Review date, ISO 8601 `YYYY-MM-DD`.
    pub review_date: String,
    /// Purchase date, ISO 8601 `YYYY-MM-DD`.
    pub purchase_date: String,
    /// Reviewer display name.
    pub reviewer_name: String,
}

/// Builds the context for one review from the row and the memory
/// accumulated so far.
pub fn build_context(record: &ReviewRecord, memory: &ProductMemory) -> ReviewContext {
    let helpfulness_ratio = record.helpfulness_ratio();
    let review_length = record.review_length();
    let quality_score = quality_score(record.verified_purchase, helpfulness_ratio, review_length);
    let current_trend = memory.sentiment_trend();

    ReviewContext {
        verified_purchase: record.verified_purchase,
        rating: record.rating,
        review_length,
        helpfulness_ratio,
        quality_score,
        persona: choose_persona(current_trend, quality_score),
        base_confidence: if record.verified_purchase { 0.8 } else { 0.6 },
        current_trend,
        recent_issues: top_phrases(memory.top_issues(3)),
        recent_usps: top_phrases(memory.top_usps(3)),
        review_date: record.review_date.clone(),
        purchase_date: record.purchase_date.clone(),
        reviewer_name: record.reviewer_name.clone(),
    }
}

/// Composite quality score: 0.2 base, +0.3 verified, +0.2 helpfulness
/// at or above 0.6, +0.3 length above 150 chars, capped at 1.0.
fn quality_score(verified: bool, helpfulness_ratio: f64, review_length: usize) -> f64 {
    let mut score: f64 = 0.2;
    if verified {
        score += 0.3;
    }
    if helpfulness_ratio >= 0.6 {
        score += 0.2;
    }
    if review_length > 150 {
        score += 0.3;
    }
    score.min(1.0)
}

fn choose_persona(trend: TrendLabel, quality_score: f64) -> Persona {
    match trend {
        TrendLabel::Negative if quality_score > 0.6 => Persona::Critical,
        TrendLabel::Positive if quality_score > 0.6 => Persona::Optimistic,
        _ => Persona::Balanced,
    }
}

fn top_phrases(ranked: Vec<(String, u64)>) -> Vec<String> {
    ranked.into_iter().map(|(phrase, _)| phrase).collect()
}
