//! Batch quality assessment and autonomous task selection.
//!
//! The assessor scores a product's review batch before any model call;
//! the selector decides which analyses the batch has earned. Poor data
//! closes the gate instead of feeding the model.

use crate::dataset::{RawReview, REQUIRED_FIELDS};
use crate::models::{AnalysisTask, QualityMetrics};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::warn;

/// Words ignored when measuring vocabulary richness.
const STOPWORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "then", "than", "so", "as", "of", "at", "by",
    "for", "with", "about", "into", "through", "to", "from", "in", "out", "on", "off", "over",
    "under", "again", "is", "are", "was", "were", "be", "been", "being", "am", "do", "does",
    "did", "have", "has", "had", "it", "its", "this", "that", "these", "those", "i", "you",
    "he", "she", "we", "they", "them", "his", "her", "my", "your", "our", "me", "not", "no",
    "very", "can", "will", "just", "too", "also", "only",
];

/// Scores a review batch. Returns `None` when the batch is unusable
/// (empty, or no parseable dates/ratings/texts), logged as a warning;
/// callers treat `None` as quality unknown.
pub fn assess(rows: &[RawReview]) -> Option<QualityMetrics> {
    if rows.is_empty() {
        warn!("Quality assessment skipped: empty batch");
        return None;
    }

    let lengths: Vec<f64> = rows
        .iter()
        .filter_map(|row| row.customer_review.as_deref())
        .map(|text| text.chars().count() as f64)
        .collect();

    let dates: Vec<NaiveDate> = rows
        .iter()
        .filter_map(|row| row.review_date.as_deref())
        .filter_map(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
        .collect();

    let ratings: Vec<f64> = rows.iter().filter_map(|row| row.rating).collect();

    let verified: Vec<bool> = rows.iter().filter_map(|row| row.verified_purchase).collect();

    if lengths.is_empty() || dates.is_empty() || ratings.is_empty() || verified.is_empty() {
        warn!("Quality assessment failed: batch has no usable text, date, rating, or verified cells");
        return None;
    }

    let length_ratio = (mean(&lengths) / 100.0).min(1.0);

    let earliest = dates.iter().min().copied()?;
    let latest = dates.iter().max().copied()?;
    let spread_days = (latest - earliest).num_days() as f64;
    let temporal_spread = (spread_days / 365.0).min(1.0);

    let verified_count = verified.iter().filter(|v| **v).count();
    let verified_ratio = verified_count as f64 / verified.len() as f64;

    let rating_mean = mean(&ratings);
    let rating_std = sample_std(&ratings);

    let total_cells = rows.len() * REQUIRED_FIELDS.len();
    let missing: usize = rows.iter().map(RawReview::missing_cells).sum();
    let completeness = 1.0 - missing as f64 / total_cells as f64;

    Some(QualityMetrics {
        length_ratio,
        temporal_spread,
        vocabulary_richness: vocabulary_richness(rows),
        verified_ratio,
        rating_mean,
        rating_std,
        completeness,
    })
}

/// Decides which analyses a batch has earned.
///
/// Unknown quality or any missing cell disqualifies the batch outright;
/// past that gate, sentiment and summary always run, while trend and
/// feature extraction need enough rows, spread, and vocabulary.
pub fn select_tasks(metrics: Option<&QualityMetrics>, row_count: usize) -> Vec<AnalysisTask> {
    let metrics = match metrics {
        Some(metrics) => metrics,
        None => return Vec::new(),
    };

    // Exactly 1.0 means zero missing cells, so the comparison is exact.
    if metrics.completeness != 1.0 {
        return Vec::new();
    }

    let mut tasks = vec![AnalysisTask::Sentiment, AnalysisTask::Summary];

    if row_count > 50 && metrics.temporal_spread >= 0.1 {
        tasks.push(AnalysisTask::TrendAnalysis);
    }

    if metrics.vocabulary_richness > 0.1
        && metrics.verified_ratio > 0.8
        && metrics.length_ratio > 0.7
    {
        tasks.push(AnalysisTask::Usps);
        tasks.push(AnalysisTask::Issues);
    }

    tasks
}

/// Unique stemmed content words over total content words.
fn vocabulary_richness(rows: &[RawReview]) -> f64 {
    let mut total = 0usize;
    let mut unique: BTreeSet<String> = BTreeSet::new();

    for row in rows {
        let text = match row.customer_review.as_deref() {
            Some(text) => text,
            None => continue,
        };
        for word in tokenize(text) {
            if STOPWORDS.contains(&word.as_str()) {
                continue;
            }
            total += 1;
            unique.insert(stem(&word));
        }
    }

    if total == 0 {
        return 0.0;
    }
    unique.len() as f64 / total as f64
}

/// Lowercased alphabetic runs of a text.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Strips one common inflection suffix so close variants count once.
fn stem(word: &str) -> String {
    for suffix in ["ing", "ies", "ed", "es", "ly", "s"] {
        if let Some(root) = word.strip_suffix(suffix) {
            if root.len() >= 3 {
                return root.to_string();
            }
        }
    }
    word.to_string()
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 for fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(review: &str, date: &str, rating: f64, verified: bool) -> RawReview {
        RawReview {
            product_name: Some("Aurora Kettle".to_string()),
            reviewer_name: Some("Dana".to_string()),
            customer_review: Some(review.to_string()),
            rating: Some(rating),
            verified_purchase: Some(verified),
            helpful_votes: Some(3),
            total_votes: Some(4),
            review_date: Some(date.to_string()),
            purchase_date: Some("2024-01-05".to_string()),
        }
    }

    fn complete_metrics() -> QualityMetrics {
        QualityMetrics {
            length_ratio: 0.8,
            temporal_spread: 0.5,
            vocabulary_richness: 0.4,
            verified_ratio: 0.9,
            rating_mean: 4.2,
            rating_std: 0.6,
            completeness: 1.0,
        }
    }

    #[test]
    fn test_assess_metric_arithmetic() {
        let rows = vec![
            make_row(
                "heats fast and looks great on the counter today",
                "2024-01-01",
                4.0,
                true,
            ),
            make_row(
                "lid rattles loudly and the handle gets warm",
                "2024-03-01",
                5.0,
                false,
            ),
        ];

        let metrics = assess(&rows).unwrap();
        // The reviews are 47 and 43 chars long.
        assert!((metrics.length_ratio - 45.0 / 100.0).abs() < 1e-9);
        assert!((metrics.temporal_spread - 60.0 / 365.0).abs() < 1e-9);
        assert!((metrics.verified_ratio - 0.5).abs() < 1e-9);
        assert!((metrics.rating_mean - 4.5).abs() < 1e-9);
        assert!((metrics.rating_std - 0.5f64.sqrt()).abs() < 1e-9);
        assert_eq!(metrics.completeness, 1.0);
    }

    #[test]
    fn test_assess_counts_missing_cells() {
        let mut incomplete = make_row("fine", "2024-01-01", 3.0, true);
        incomplete.purchase_date = None;
        let rows = vec![make_row("fine", "2024-01-02", 4.0, true), incomplete];

        let metrics = assess(&rows).unwrap();
        assert!((metrics.completeness - (1.0 - 1.0 / 18.0)).abs() < 1e-9);
    }

    #[test]
    fn test_assess_fails_soft_without_dates() {
        let mut row = make_row("fine product", "not a date", 4.0, true);
        row.review_date = Some("yesterday".to_string());
        assert!(assess(&[row]).is_none());
        assert!(assess(&[]).is_none());
    }

    #[test]
    fn test_selector_gates_on_completeness() {
        let mut metrics = complete_metrics();
        assert!(!select_tasks(Some(&metrics), 10).is_empty());

        metrics.completeness = 0.98;
        assert!(select_tasks(Some(&metrics), 10).is_empty());
        assert!(select_tasks(None, 10).is_empty());
    }

    #[test]
    fn test_selector_baseline_tasks() {
        let metrics = QualityMetrics {
            vocabulary_richness: 0.05,
            ..complete_metrics()
        };
        let tasks = select_tasks(Some(&metrics), 10);
        assert_eq!(tasks, vec![AnalysisTask::Sentiment, AnalysisTask::Summary]);
    }

    #[test]
    fn test_selector_trend_needs_rows_and_spread() {
        let metrics = QualityMetrics {
            vocabulary_richness: 0.05,
            ..complete_metrics()
        };
        assert!(select_tasks(Some(&metrics), 51).contains(&AnalysisTask::TrendAnalysis));
        assert!(!select_tasks(Some(&metrics), 50).contains(&AnalysisTask::TrendAnalysis));

        let narrow = QualityMetrics {
            temporal_spread: 0.05,
            ..metrics
        };
        assert!(!select_tasks(Some(&narrow), 51).contains(&AnalysisTask::TrendAnalysis));
    }

    #[test]
    fn test_selector_feature_extraction_guards() {
        let tasks = select_tasks(Some(&complete_metrics()), 10);
        assert!(tasks.contains(&AnalysisTask::Usps));
        assert!(tasks.contains(&AnalysisTask::Issues));

        let thin = QualityMetrics {
            verified_ratio: 0.8,
            ..complete_metrics()
        };
        let tasks = select_tasks(Some(&thin), 10);
        assert!(!tasks.contains(&AnalysisTask::Usps));
        assert!(!tasks.contains(&AnalysisTask::Issues));
    }

    #[test]
    fn test_vocabulary_richness_stems_variants() {
        let rows = vec![
            make_row("great kettle heats quickly", "2024-01-01", 4.0, true),
            make_row("great kettle heats slowly", "2024-01-02", 4.0, true),
        ];
        // 8 content words, 5 unique stems.
        let metrics = assess(&rows).unwrap();
        assert!((metrics.vocabulary_richness - 5.0 / 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_stem_keeps_short_roots() {
        assert_eq!(stem("heating"), "heat");
        assert_eq!(stem("handles"), "handl");
        assert_eq!(stem("is"), "is");
        assert_eq!(stem("quickly"), "quick");
    }
}
