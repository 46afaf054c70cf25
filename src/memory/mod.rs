//! Per-product review memory.
//!
//! `ProductMemory` is the aggregate root of the pipeline: every folded
//! review lands in its history, and accepted reviews feed the category
//! stats, feature tables, and monthly rollups that later analyses and
//! prompts read back. Snapshots round-trip through JSON.

use crate::context::ReviewContext;
use crate::models::{
    MemorySummary, MonthlySummary, OverallLabel, RecentReview, SentimentCategory, SentimentRecord,
    TrendLabel,
};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Maximum history entries retained per product.
pub const HISTORY_CAP: usize = 1000;

/// Minimum accepted reviews before a trend is called.
const TREND_MIN_REVIEWS: u64 = 10;

/// Emotional intensity a review must exceed before its key drivers
/// count as features.
const INTENSITY_THRESHOLD: f64 = 0.7;

/// One folded review: the weighted result plus the context it was
/// analyzed under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub record: SentimentRecord,
    pub context: ReviewContext,
}

impl From<&HistoryEntry> for RecentReview {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            review_date: entry.context.review_date.clone(),
            sentiment: entry.record.result.sentiment,
            sentiment_score: entry.record.result.sentiment_score,
            accepted: entry.record.accepted(),
            key_drivers: entry.record.result.key_drivers.clone(),
            justification: entry.record.result.justification.clone(),
        }
    }
}

/// Running aggregates for one calendar month of accepted reviews.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonthlyRollup {
    /// Accepted review counts per sentiment category.
    pub sentiment: BTreeMap<String, u64>,
    /// Sum of accepted sentiment scores.
    pub score_sum: f64,
    /// Number of scores behind `score_sum`.
    pub score_count: u64,
    /// `score_sum / score_count`, kept current on every update.
    pub average_sentiment_score: f64,
    /// Key drivers cited that month, in arrival order.
    pub key_drivers: Vec<String>,
    /// Justifications recorded that month, in arrival order.
    pub justification: Vec<String>,
}

/// Accumulated signal for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductMemory {
    /// Product the memory belongs to.
    pub product_name: String,
    /// Accepted review counts keyed by category and `verified_<category>`.
    pub stats: BTreeMap<String, u64>,
    /// Praised feature phrase, lower-cased, to mention count.
    pub usps: BTreeMap<String, u64>,
    /// Complaint phrase, lower-cased, to mention count.
    pub issues: BTreeMap<String, u64>,
    /// Justifications backing USP mentions.
    pub usp_justification: BTreeSet<String>,
    /// Justifications backing issue mentions.
    pub issue_justification: BTreeSet<String>,
    /// Rolling window of every folded review, accepted or not.
    pub sentiment_history: VecDeque<HistoryEntry>,
    /// Per-month rollups keyed `YYYY-MM`.
    pub monthly_report: BTreeMap<String, MonthlyRollup>,
    /// Time-decayed overall label, unknown until the first rollup.
    pub overall_sentiment: OverallLabel,
    /// Time-decayed overall scalar, 0.0 until the first rollup.
    pub overall_sentiment_score: f64,
    /// Distinct reviewer names from accepted reviews.
    pub reviewers: BTreeSet<String>,
}

impl ProductMemory {
    /// Creates an empty memory for a product.
    pub fn new(product_name: &str) -> Self {
        Self {
            product_name: product_name.to_string(),
            stats: BTreeMap::new(),
            usps: BTreeMap::new(),
            issues: BTreeMap::new(),
            usp_justification: BTreeSet::new(),
            issue_justification: BTreeSet::new(),
            sentiment_history: VecDeque::new(),
            monthly_report: BTreeMap::new(),
            overall_sentiment: OverallLabel::Unknown,
            overall_sentiment_score: 0.0,
            reviewers: BTreeSet::new(),
        }
    }

    /// Folds one weighted review into memory.
    ///
    /// Every review occupies a history slot; only accepted ones touch
    /// the aggregates. A review date that fails to parse skips just
    /// that review's monthly contribution.
    pub fn update(&mut self, record: SentimentRecord, context: ReviewContext) {
        if record.accepted() {
            self.absorb_accepted(&record, &context);
        }

        self.sentiment_history.push_back(HistoryEntry { record, context });
        if self.sentiment_history.len() > HISTORY_CAP {
            self.sentiment_history.pop_front();
        }
    }

    fn absorb_accepted(&mut self, record: &SentimentRecord, context: &ReviewContext) {
        let category = record.result.sentiment;

        *self.stats.entry(category.key().to_string()).or_insert(0) += 1;
        if context.verified_purchase {
            *self
                .stats
                .entry(category.verified_key().to_string())
                .or_insert(0) += 1;
        }

        match month_key(&context.review_date) {
            Some(month) => self.absorb_monthly(&month, record),
            None => warn!(
                "Skipping monthly rollup for {}: unparseable review date '{}'",
                self.product_name, context.review_date
            ),
        }

        if record.result.emotional_intensity > INTENSITY_THRESHOLD {
            match category {
                SentimentCategory::Positive => {
                    for driver in &record.result.key_drivers {
                        *self.usps.entry(driver.to_lowercase()).or_insert(0) += 1;
                    }
                    if !record.result.justification.is_empty() {
                        self.usp_justification
                            .insert(record.result.justification.clone());
                    }
                }
                SentimentCategory::Negative => {
                    for driver in &record.result.key_drivers {
                        *self.issues.entry(driver.to_lowercase()).or_insert(0) += 1;
                    }
                    if !record.result.justification.is_empty() {
                        self.issue_justification
                            .insert(record.result.justification.clone());
                    }
                }
                _ => {}
            }
        }

        if !context.reviewer_name.is_empty() {
            self.reviewers.insert(context.reviewer_name.clone());
        }
    }

    fn absorb_monthly(&mut self, month: &str, record: &SentimentRecord) {
        let rollup = self.monthly_report.entry(month.to_string()).or_default();
        *rollup
            .sentiment
            .entry(record.result.sentiment.key().to_string())
            .or_insert(0) += 1;
        rollup.score_sum += record.result.sentiment_score;
        rollup.score_count += 1;
        rollup.average_sentiment_score = rollup.score_sum / rollup.score_count as f64;
        rollup
            .key_drivers
            .extend(record.result.key_drivers.iter().cloned());
        if !record.result.justification.is_empty() {
            rollup.justification.push(record.result.justification.clone());
        }
    }

    /// Number of accepted reviews, counted over the base category keys.
    pub fn accepted_count(&self) -> u64 {
        SentimentCategory::ALL
            .iter()
            .map(|category| self.stats.get(category.key()).copied().unwrap_or(0))
            .sum()
    }

    /// Dominant-sentiment trend over accepted reviews.
    ///
    /// Unknown until at least ten accepted reviews exist; ties break in
    /// canonical category order.
    pub fn sentiment_trend(&self) -> TrendLabel {
        if self.accepted_count() < TREND_MIN_REVIEWS {
            return TrendLabel::Unknown;
        }

        let mut dominant = SentimentCategory::Positive;
        let mut best = 0u64;
        for category in SentimentCategory::ALL {
            let count = self.stats.get(category.key()).copied().unwrap_or(0);
            if count > best {
                best = count;
                dominant = category;
            }
        }
        TrendLabel::from(dominant)
    }

    /// Most mentioned praised features: count descending, then phrase.
    pub fn top_usps(&self, limit: usize) -> Vec<(String, u64)> {
        top_entries(&self.usps, limit)
    }

    /// Most mentioned complaints: count descending, then phrase.
    pub fn top_issues(&self, limit: usize) -> Vec<(String, u64)> {
        top_entries(&self.issues, limit)
    }

    /// Structured snapshot of everything accumulated so far.
    pub fn generate_summary(&self) -> MemorySummary {
        let monthly_analysis = self
            .monthly_report
            .iter()
            .map(|(month, rollup)| {
                (
                    month.clone(),
                    MonthlySummary {
                        sentiment_counts: rollup.sentiment.clone(),
                        average_sentiment_score: round3(rollup.average_sentiment_score),
                        key_drivers: dedup_preserving_order(&rollup.key_drivers),
                        justifications: rollup.justification.clone(),
                    },
                )
            })
            .collect();

        MemorySummary {
            product_name: self.product_name.clone(),
            overall_sentiment_trend: self.sentiment_trend(),
            total_reviews_analyzed: self.sentiment_history.len(),
            sentiment_distribution: self.stats.clone(),
            top_usps: self.top_usps(3),
            top_issues: self.top_issues(3),
            unique_reviewers_count: self.reviewers.len(),
            monthly_analysis,
        }
    }

    /// The most recent `n` folded reviews, oldest first.
    pub fn recent_reviews(&self, n: usize) -> Vec<&HistoryEntry> {
        let skip = self.sentiment_history.len().saturating_sub(n);
        self.sentiment_history.iter().skip(skip).collect()
    }

    /// History entries whose result matched the given category.
    pub fn filter_by_sentiment(&self, category: SentimentCategory) -> Vec<&HistoryEntry> {
        self.sentiment_history
            .iter()
            .filter(|entry| entry.record.result.sentiment == category)
            .collect()
    }

    /// Where a product's snapshot lives under `dir`.
    pub fn snapshot_path(dir: &Path, product_name: &str) -> PathBuf {
        dir.join(format!("{}.memory.json", slugify(product_name)))
    }

    /// Writes a JSON snapshot of this memory into `dir`.
    ///
    /// The write goes through a temp file in the same directory, so a
    /// crash never leaves a truncated snapshot behind.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = Self::snapshot_path(dir, &self.product_name);

        let json = serde_json::to_string_pretty(self)
            .with_context(|| format!("failed to serialize memory for {}", self.product_name))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
        tmp.write_all(json.as_bytes())
            .context("failed to write memory snapshot")?;
        tmp.persist(&path)
            .with_context(|| format!("failed to persist snapshot to {}", path.display()))?;

        debug!("Saved memory snapshot to {}", path.display());
        Ok(path)
    }

    /// Reads a memory snapshot back.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read memory snapshot {}", path.display()))?;
        let memory = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse memory snapshot {}", path.display()))?;
        Ok(memory)
    }
}

/// `YYYY-MM` key for an ISO `YYYY-MM-DD` date, if it parses.
fn month_key(date: &str) -> Option<String> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%Y-%m").to_string())
}

fn top_entries(table: &BTreeMap<String, u64>, limit: usize) -> Vec<(String, u64)> {
    let mut entries: Vec<(String, u64)> =
        table.iter().map(|(k, v)| (k.clone(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);
    entries
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn dedup_preserving_order(items: &[String]) -> Vec<String> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    items
        .iter()
        .filter(|item| seen.insert(item.as_str()))
        .cloned()
        .collect()
}

/// File-name-safe slug of a product name.
fn slugify(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    let slug = slug.trim_matches('_');
    if slug.is_empty() {
        "product".to_string()
    } else {
        slug.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Persona, SentimentResult};
    use tempfile::TempDir;

    fn make_context(reviewer: &str, review_date: &str, verified: bool) -> ReviewContext {
        ReviewContext {
            verified_purchase: verified,
            rating: 4,
            review_length: 20,
            helpfulness_ratio: 0.5,
            quality_score: 0.5,
            persona: Persona::Balanced,
            base_confidence: if verified { 0.8 } else { 0.6 },
            current_trend: TrendLabel::Unknown,
            recent_issues: Vec::new(),
            recent_usps: Vec::new(),
            review_date: review_date.to_string(),
            purchase_date: "2024-01-05".to_string(),
            reviewer_name: reviewer.to_string(),
        }
    }

    fn make_record(
        category: SentimentCategory,
        score: f64,
        intensity: f64,
        drivers: &[&str],
        weightage: f64,
    ) -> SentimentRecord {
        SentimentRecord {
            result: SentimentResult {
                sentiment: category,
                sentiment_score: score,
                model_confidence: 0.9,
                key_drivers: drivers.iter().map(|d| d.to_string()).collect(),
                emotional_intensity: intensity,
                justification: "clear signal in the text".to_string(),
                ..SentimentResult::default()
            },
            adjusted_confidence: 0.8,
            weightage,
        }
    }

    #[test]
    fn test_rejected_reviews_only_occupy_history() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.9, 0.9, &["Heats Fast"], 0.0),
            make_context("Dana", "2024-03-02", true),
        );

        assert_eq!(memory.sentiment_history.len(), 1);
        assert!(memory.stats.is_empty());
        assert!(memory.monthly_report.is_empty());
        assert!(memory.usps.is_empty());
        assert!(memory.reviewers.is_empty());
    }

    #[test]
    fn test_stats_sum_matches_accepted_count() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.5, &[], 1.0),
            make_context("Dana", "2024-03-02", true),
        );
        memory.update(
            make_record(SentimentCategory::Negative, -0.6, 0.5, &[], 1.0),
            make_context("Priya", "2024-03-03", false),
        );
        memory.update(
            make_record(SentimentCategory::Positive, 0.7, 0.5, &[], 0.0),
            make_context("Sam", "2024-03-04", true),
        );

        // Verified keys track separately and never inflate the count.
        assert_eq!(memory.stats.get("verified_positive"), Some(&1));
        assert_eq!(memory.accepted_count(), 2);
        assert_eq!(memory.sentiment_history.len(), 3);
    }

    #[test]
    fn test_monthly_average_stays_consistent() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.5, 0.5, &[], 1.0),
            make_context("Dana", "2024-03-02", true),
        );
        memory.update(
            make_record(SentimentCategory::Positive, 1.0, 0.5, &[], 1.0),
            make_context("Priya", "2024-03-20", true),
        );
        memory.update(
            make_record(SentimentCategory::Negative, -0.4, 0.5, &[], 1.0),
            make_context("Sam", "2024-04-01", false),
        );

        let march = &memory.monthly_report["2024-03"];
        assert_eq!(march.score_count, 2);
        assert!(
            (march.average_sentiment_score - march.score_sum / march.score_count as f64).abs()
                < 1e-9
        );
        assert!((march.average_sentiment_score - 0.75).abs() < 1e-9);

        let april = &memory.monthly_report["2024-04"];
        assert_eq!(april.sentiment.get("negative"), Some(&1));
    }

    #[test]
    fn test_history_caps_at_limit() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        for i in 0..=HISTORY_CAP {
            memory.update(
                make_record(SentimentCategory::Neutral, 0.0, 0.1, &[], 0.0),
                make_context(&format!("reviewer-{}", i), "2024-03-02", false),
            );
        }

        assert_eq!(memory.sentiment_history.len(), HISTORY_CAP);
        assert_eq!(
            memory.sentiment_history.front().unwrap().context.reviewer_name,
            "reviewer-1"
        );
        assert_eq!(
            memory.sentiment_history.back().unwrap().context.reviewer_name,
            format!("reviewer-{}", HISTORY_CAP)
        );
    }

    #[test]
    fn test_intensity_gate_for_features() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        // Exactly at the threshold earns nothing.
        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.7, &["Heats Fast"], 1.0),
            make_context("Dana", "2024-03-02", true),
        );
        assert!(memory.usps.is_empty());

        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.8, &["Heats Fast"], 1.0),
            make_context("Priya", "2024-03-03", true),
        );
        assert_eq!(memory.usps.get("heats fast"), Some(&1));
        assert_eq!(memory.usp_justification.len(), 1);

        memory.update(
            make_record(SentimentCategory::Negative, -0.7, 0.9, &["Lid Rattles"], 1.0),
            make_context("Sam", "2024-03-04", false),
        );
        assert_eq!(memory.issues.get("lid rattles"), Some(&1));
        assert!(memory.usps.get("lid rattles").is_none());
    }

    #[test]
    fn test_unparseable_date_skips_monthly_only() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.5, &[], 1.0),
            make_context("Dana", "last tuesday", true),
        );

        assert_eq!(memory.accepted_count(), 1);
        assert!(memory.monthly_report.is_empty());
        assert_eq!(memory.reviewers.len(), 1);
    }

    #[test]
    fn test_trend_needs_ten_accepted_reviews() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        for i in 0..9 {
            memory.update(
                make_record(SentimentCategory::Positive, 0.8, 0.5, &[], 1.0),
                make_context(&format!("reviewer-{}", i), "2024-03-02", true),
            );
        }
        assert_eq!(memory.sentiment_trend(), TrendLabel::Unknown);

        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.5, &[], 1.0),
            make_context("reviewer-9", "2024-03-02", true),
        );
        assert_eq!(memory.sentiment_trend(), TrendLabel::Positive);
    }

    #[test]
    fn test_trend_tie_breaks_in_canonical_order() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.stats.insert("positive".to_string(), 5);
        memory.stats.insert("negative".to_string(), 5);
        assert_eq!(memory.sentiment_trend(), TrendLabel::Positive);
    }

    #[test]
    fn test_top_entries_ordering() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.usps.insert("quiet boil".to_string(), 2);
        memory.usps.insert("heats fast".to_string(), 2);
        memory.usps.insert("looks great".to_string(), 5);

        let top = memory.top_usps(2);
        assert_eq!(
            top,
            vec![
                ("looks great".to_string(), 5),
                ("heats fast".to_string(), 2)
            ]
        );
    }

    #[test]
    fn test_summary_dedups_monthly_drivers() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(
                SentimentCategory::Positive,
                0.8,
                0.5,
                &["heats fast", "quiet boil"],
                1.0,
            ),
            make_context("Dana", "2024-03-02", true),
        );
        memory.update(
            make_record(SentimentCategory::Positive, 0.6, 0.5, &["heats fast"], 1.0),
            make_context("Priya", "2024-03-20", true),
        );

        let summary = memory.generate_summary();
        let march = &summary.monthly_analysis["2024-03"];
        assert_eq!(
            march.key_drivers,
            vec!["heats fast".to_string(), "quiet boil".to_string()]
        );
        assert!((march.average_sentiment_score - 0.7).abs() < 1e-9);
        assert_eq!(summary.unique_reviewers_count, 2);
        assert_eq!(summary.total_reviews_analyzed, 2);
    }

    #[test]
    fn test_recent_and_filter_accessors() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.5, &[], 1.0),
            make_context("Dana", "2024-03-02", true),
        );
        memory.update(
            make_record(SentimentCategory::Negative, -0.5, 0.5, &[], 1.0),
            make_context("Priya", "2024-03-03", true),
        );
        memory.update(
            make_record(SentimentCategory::Negative, -0.6, 0.5, &[], 0.0),
            make_context("Sam", "2024-03-04", false),
        );

        let recent = memory.recent_reviews(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].context.reviewer_name, "Priya");
        assert_eq!(recent[1].context.reviewer_name, "Sam");

        let negatives = memory.filter_by_sentiment(SentimentCategory::Negative);
        assert_eq!(negatives.len(), 2);
    }

    #[test]
    fn test_snapshot_round_trip() {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.update(
            make_record(SentimentCategory::Positive, 0.8, 0.9, &["heats fast"], 1.0),
            make_context("Dana", "2024-03-02", true),
        );
        memory.update(
            make_record(SentimentCategory::Negative, -0.5, 0.4, &[], 0.0),
            make_context("Priya", "2024-03-03", false),
        );
        memory.overall_sentiment = OverallLabel::Positive;
        memory.overall_sentiment_score = 0.62;

        let dir = TempDir::new().unwrap();
        let path = memory.save(dir.path()).unwrap();
        assert!(path.ends_with("aurora_kettle.memory.json"));

        let restored = ProductMemory::load(&path).unwrap();
        assert_eq!(
            serde_json::to_value(&restored).unwrap(),
            serde_json::to_value(&memory).unwrap()
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Aurora Kettle 2.0"), "aurora_kettle_2_0");
        assert_eq!(slugify("???"), "product");
    }
}
