//! Data models for the review analyzer.
//!
//! This module contains the core data structures shared across the
//! pipeline: sentiment results, weighted records, analysis digests,
//! and the final report envelope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Sentiment category assigned to a single review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SentimentCategory {
    /// Clearly favorable review.
    Positive,
    /// Clearly unfavorable review.
    Negative,
    /// No strong signal either way.
    Neutral,
    /// Strong signals in both directions.
    Mixed,
}

impl SentimentCategory {
    /// All categories in canonical order, used wherever iteration order
    /// must be deterministic (trend dominance, report tables).
    pub const ALL: [SentimentCategory; 4] = [
        SentimentCategory::Positive,
        SentimentCategory::Negative,
        SentimentCategory::Neutral,
        SentimentCategory::Mixed,
    ];

    /// Returns the stats-table key for this category.
    pub fn key(&self) -> &'static str {
        match self {
            SentimentCategory::Positive => "positive",
            SentimentCategory::Negative => "negative",
            SentimentCategory::Neutral => "neutral",
            SentimentCategory::Mixed => "mixed",
        }
    }

    /// Returns the stats-table key for verified-purchase counts.
    pub fn verified_key(&self) -> &'static str {
        match self {
            SentimentCategory::Positive => "verified_positive",
            SentimentCategory::Negative => "verified_negative",
            SentimentCategory::Neutral => "verified_neutral",
            SentimentCategory::Mixed => "verified_mixed",
        }
    }
}

impl fmt::Display for SentimentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl Default for SentimentCategory {
    fn default() -> Self {
        SentimentCategory::Neutral
    }
}

impl From<String> for SentimentCategory {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "positive" => SentimentCategory::Positive,
            "negative" => SentimentCategory::Negative,
            "mixed" => SentimentCategory::Mixed,
            // Unknown labels from the model decode as neutral.
            _ => SentimentCategory::Neutral,
        }
    }
}

/// Dominant-sentiment trend derived from accumulated category counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendLabel {
    Positive,
    Negative,
    Neutral,
    Mixed,
    /// Not enough accepted reviews to call a trend.
    Unknown,
}

impl Default for TrendLabel {
    fn default() -> Self {
        TrendLabel::Unknown
    }
}

impl From<SentimentCategory> for TrendLabel {
    fn from(category: SentimentCategory) -> Self {
        match category {
            SentimentCategory::Positive => TrendLabel::Positive,
            SentimentCategory::Negative => TrendLabel::Negative,
            SentimentCategory::Neutral => TrendLabel::Neutral,
            SentimentCategory::Mixed => TrendLabel::Mixed,
        }
    }
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendLabel::Positive => "positive",
            TrendLabel::Negative => "negative",
            TrendLabel::Neutral => "neutral",
            TrendLabel::Mixed => "mixed",
            TrendLabel::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Coarse label for the time-decayed overall sentiment rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallLabel {
    HighlyPositive,
    Positive,
    Neutral,
    Negative,
    HighlyNegative,
    /// No rollup has been computed yet.
    Unknown,
}

impl OverallLabel {
    /// Maps a rollup scalar to its label.
    pub fn from_score(score: f64) -> Self {
        if score > 0.75 {
            OverallLabel::HighlyPositive
        } else if score > 0.55 {
            OverallLabel::Positive
        } else if score > 0.45 {
            OverallLabel::Neutral
        } else if score > 0.25 {
            OverallLabel::Negative
        } else {
            OverallLabel::HighlyNegative
        }
    }

    /// Returns an emoji representation of the label.
    pub fn emoji(&self) -> &'static str {
        match self {
            OverallLabel::HighlyPositive => "🌟",
            OverallLabel::Positive => "🙂",
            OverallLabel::Neutral => "😐",
            OverallLabel::Negative => "🙁",
            OverallLabel::HighlyNegative => "😠",
            OverallLabel::Unknown => "❔",
        }
    }
}

impl Default for OverallLabel {
    fn default() -> Self {
        OverallLabel::Unknown
    }
}

impl fmt::Display for OverallLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallLabel::HighlyPositive => "Highly Positive",
            OverallLabel::Positive => "Positive",
            OverallLabel::Neutral => "Neutral",
            OverallLabel::Negative => "Negative",
            OverallLabel::HighlyNegative => "Highly Negative",
            OverallLabel::Unknown => "Unknown",
        };
        write!(f, "{}", label)
    }
}

/// Analyst persona chosen for a review from history and quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    /// Skeptical reading for negative-trending, high-quality reviews.
    Critical,
    /// Receptive reading for positive-trending, high-quality reviews.
    Optimistic,
    /// Default even-handed reading.
    Balanced,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Persona::Critical => "critical",
            Persona::Optimistic => "optimistic",
            Persona::Balanced => "balanced",
        };
        write!(f, "{}", label)
    }
}

/// Downstream analysis authorized by the task selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisTask {
    Sentiment,
    Summary,
    TrendAnalysis,
    Usps,
    Issues,
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AnalysisTask::Sentiment => "sentiment",
            AnalysisTask::Summary => "summary",
            AnalysisTask::TrendAnalysis => "trend_analysis",
            AnalysisTask::Usps => "usps",
            AnalysisTask::Issues => "issues",
        };
        write!(f, "{}", label)
    }
}

/// Structured sentiment payload decoded from a model response.
///
/// Every field is defaulted so a sparse but well-formed payload still
/// decodes; unknown sentiment labels fall back to neutral.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentResult {
    /// Sentiment category called by the model.
    pub sentiment: SentimentCategory,
    /// Polarity score in [-1.0, 1.0].
    pub sentiment_score: f64,
    /// The model's own confidence in [0.0, 1.0].
    #[serde(alias = "confidence")]
    pub model_confidence: f64,
    /// Short phrases that drove the call.
    pub key_drivers: Vec<String>,
    /// Emotional intensity in [0.0, 1.0].
    pub emotional_intensity: f64,
    /// Whether the review pulls in both directions.
    pub mixed_signals: bool,
    /// Phrases contradicting the overall call.
    pub conflicting_phrases: Vec<String>,
    /// One-sentence rationale for the call.
    pub justification: String,
    /// Trust tag echoed back from the prompt context.
    pub trust: String,
    /// Whether the persona instructions were applied.
    pub persona_adjusted: bool,
}

impl SentimentResult {
    /// Fallback result used when a response cannot be decoded.
    pub fn neutral_empty() -> Self {
        Self::default()
    }
}

/// A sentiment result after confidence weighting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentRecord {
    /// The decoded model output.
    pub result: SentimentResult,
    /// Confidence after heuristic adjustment.
    pub adjusted_confidence: f64,
    /// Binary acceptance flag: 1.0 counts, 0.0 is ignored by aggregates.
    pub weightage: f64,
}

impl SentimentRecord {
    /// Whether this record is allowed to touch aggregates.
    pub fn accepted(&self) -> bool {
        self.weightage > 0.0
    }
}

/// One ranked product feature extracted by the model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFinding {
    /// The feature phrase, as accumulated in memory.
    pub feature: String,
    /// How many accepted reviews mentioned it.
    pub mentions: u64,
    /// Model-provided rationale for ranking it.
    pub justification: String,
    /// Per-entry confidence in [0.0, 1.0].
    pub confidence: f64,
}

/// Ranked feature list decoded from a model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureDigest {
    /// Entries ranked by the model.
    pub top_features: Vec<FeatureFinding>,
    /// The model's confidence in the batch as a whole.
    pub model_confidence: f64,
}

impl FeatureDigest {
    /// An empty digest, used when no strong signal survives filtering.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Narrative trend report decoded from a model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrendDigest {
    /// Free-text trend analysis.
    pub report: String,
    /// The model's confidence in the report.
    pub model_confidence: f64,
}

/// Narrative product summary decoded from a model response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryDigest {
    /// Free-text product summary.
    pub summary: String,
    /// The model's confidence in the summary.
    pub model_confidence: f64,
}

/// Batch-level quality metrics computed before any model call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Mean review length over 100 chars, capped at 1.0.
    pub length_ratio: f64,
    /// Review date range over a year, capped at 1.0.
    pub temporal_spread: f64,
    /// Unique stemmed content words over total content words.
    pub vocabulary_richness: f64,
    /// Share of verified purchases.
    pub verified_ratio: f64,
    /// Mean star rating.
    pub rating_mean: f64,
    /// Sample standard deviation of star ratings.
    pub rating_std: f64,
    /// Share of cells present across required fields.
    pub completeness: f64,
}

/// Numeric trend descriptors computed over windowed monthly averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendMetrics {
    /// Difference between the best and worst monthly average.
    pub max_min_delta: f64,
    /// Population standard deviation of the monthly averages.
    pub volatility: f64,
    /// Least-squares slope of the monthly averages over time.
    pub slope: f64,
}

/// Point-in-time structured view over a product's accumulated memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySummary {
    /// Product the memory belongs to.
    pub product_name: String,
    /// Dominant-sentiment trend at summary time.
    pub overall_sentiment_trend: TrendLabel,
    /// Total reviews folded in, accepted or not.
    pub total_reviews_analyzed: usize,
    /// Accepted review counts per stats key.
    pub sentiment_distribution: BTreeMap<String, u64>,
    /// Most mentioned praised features with their counts.
    pub top_usps: Vec<(String, u64)>,
    /// Most mentioned complaints with their counts.
    pub top_issues: Vec<(String, u64)>,
    /// Distinct reviewer names seen in accepted reviews.
    pub unique_reviewers_count: usize,
    /// Per-month breakdown, keyed `YYYY-MM`.
    pub monthly_analysis: BTreeMap<String, MonthlySummary>,
}

/// One month's slice of a memory summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// Accepted review counts per sentiment category.
    pub sentiment_counts: BTreeMap<String, u64>,
    /// Mean sentiment score, rounded to three decimals.
    pub average_sentiment_score: f64,
    /// Key drivers cited that month, deduplicated in first-seen order.
    pub key_drivers: Vec<String>,
    /// Justifications recorded that month.
    pub justifications: Vec<String>,
}

/// One recently folded review, as shown in the report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentReview {
    /// Review date, ISO 8601 `YYYY-MM-DD`.
    pub review_date: String,
    /// Sentiment category called by the model.
    pub sentiment: SentimentCategory,
    /// Polarity score in [-1.0, 1.0].
    pub sentiment_score: f64,
    /// Whether the review passed confidence weighting.
    pub accepted: bool,
    /// Short phrases that drove the call.
    pub key_drivers: Vec<String>,
    /// One-sentence rationale for the call.
    pub justification: String,
}

/// Metadata about an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the analyzed dataset.
    pub dataset: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the LLM model used.
    pub model_used: String,
    /// Number of products analyzed.
    pub products_analyzed: usize,
    /// Total number of reviews folded into memory.
    pub reviews_total: usize,
    /// Number of reviews that passed confidence weighting.
    pub reviews_accepted: usize,
    /// Duration of the run in seconds.
    pub duration_seconds: f64,
}

/// Everything the pipeline produced for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAnalysis {
    /// Product the analyses belong to.
    pub product_name: String,
    /// Batch quality metrics, if the assessor could compute them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityMetrics>,
    /// Analyses the task selector authorized.
    pub authorized_tasks: Vec<AnalysisTask>,
    /// Structured view of the accumulated memory.
    pub memory: MemorySummary,
    /// Time-decayed overall sentiment label.
    pub overall_sentiment: OverallLabel,
    /// Time-decayed overall sentiment scalar.
    pub overall_sentiment_score: f64,
    /// Model-ranked praised features, empty when no strong signal.
    pub top_usps: Vec<FeatureFinding>,
    /// Model-ranked complaints, empty when no strong signal.
    pub top_issues: Vec<FeatureFinding>,
    /// The last few folded reviews, oldest first.
    pub recent_reviews: Vec<RecentReview>,
    /// Numeric trend descriptors, when trend analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_metrics: Option<TrendMetrics>,
    /// Narrative trend report, when trend analysis ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_report: Option<TrendDigest>,
    /// Narrative product summary, when authorized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative_summary: Option<SummaryDigest>,
}

/// The complete review-analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Metadata about the run.
    pub metadata: ReportMetadata,
    /// Per-product analyses, in product-name order.
    pub products: Vec<ProductAnalysis>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_string_fallback() {
        assert_eq!(
            SentimentCategory::from("Positive".to_string()),
            SentimentCategory::Positive
        );
        assert_eq!(
            SentimentCategory::from("MIXED".to_string()),
            SentimentCategory::Mixed
        );
        assert_eq!(
            SentimentCategory::from("ecstatic".to_string()),
            SentimentCategory::Neutral
        );
    }

    #[test]
    fn test_overall_label_thresholds() {
        assert_eq!(OverallLabel::from_score(0.8), OverallLabel::HighlyPositive);
        assert_eq!(OverallLabel::from_score(0.6), OverallLabel::Positive);
        assert_eq!(OverallLabel::from_score(0.5), OverallLabel::Neutral);
        assert_eq!(OverallLabel::from_score(0.3), OverallLabel::Negative);
        assert_eq!(OverallLabel::from_score(0.1), OverallLabel::HighlyNegative);
        // Boundaries are strict greater-than.
        assert_eq!(OverallLabel::from_score(0.75), OverallLabel::Positive);
        assert_eq!(OverallLabel::from_score(0.45), OverallLabel::Negative);
        assert_eq!(OverallLabel::from_score(0.25), OverallLabel::HighlyNegative);
    }

    #[test]
    fn test_sentiment_result_decode_defaults() {
        let result: SentimentResult =
            serde_json::from_str(r#"{"sentiment": "positive"}"#).unwrap();
        assert_eq!(result.sentiment, SentimentCategory::Positive);
        assert_eq!(result.model_confidence, 0.0);
        assert!(result.key_drivers.is_empty());
        assert!(!result.mixed_signals);
    }

    #[test]
    fn test_sentiment_result_confidence_alias() {
        let result: SentimentResult =
            serde_json::from_str(r#"{"sentiment": "negative", "confidence": 0.9}"#).unwrap();
        assert_eq!(result.model_confidence, 0.9);
    }

    #[test]
    fn test_record_accepted() {
        let record = SentimentRecord {
            result: SentimentResult::neutral_empty(),
            adjusted_confidence: 0.8,
            weightage: 1.0,
        };
        assert!(record.accepted());

        let rejected = SentimentRecord {
            weightage: 0.0,
            ..record
        };
        assert!(!rejected.accepted());
    }

    #[test]
    fn test_task_serialization() {
        let json = serde_json::to_string(&AnalysisTask::TrendAnalysis).unwrap();
        assert_eq!(json, "\"trend_analysis\"");
        assert_eq!(AnalysisTask::Usps.to_string(), "usps");
    }

    #[test]
    fn test_category_keys() {
        assert_eq!(SentimentCategory::Positive.key(), "positive");
        assert_eq!(
            SentimentCategory::Negative.verified_key(),
            "verified_negative"
        );
        assert_eq!(SentimentCategory::ALL.len(), 4);
    }
}
