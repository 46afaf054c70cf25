//! Markdown report generation.
//!
//! This module generates Markdown review reports from the per-product
//! analysis results.

use crate::models::{
    AnalysisTask, FeatureFinding, MemorySummary, ProductAnalysis, QualityMetrics, RecentReview,
    Report, ReportMetadata, SentimentCategory, TrendMetrics,
};
use anyhow::Result;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Review Signal Report\n\n");

    // Metadata section
    output.push_str(&generate_metadata_section(&report.metadata));

    // Table of contents
    output.push_str(&generate_table_of_contents(report));

    // Per-product sections
    output.push_str("## Products\n\n");
    if report.products.is_empty() {
        output.push_str("No products were found in the dataset.\n\n");
    }
    for product in &report.products {
        output.push_str(&generate_product_section(product));
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** {}\n", metadata.dataset));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!(
        "- **Products Analyzed:** {}\n",
        metadata.products_analyzed
    ));
    section.push_str(&format!(
        "- **Reviews Folded:** {}\n",
        metadata.reviews_total
    ));
    section.push_str(&format!(
        "- **Reviews Accepted:** {}\n",
        metadata.reviews_accepted
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push_str("\n");

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Products](#products)\n");

    for product in &report.products {
        let anchor = anchor_for(&product.product_name);
        toc.push_str(&format!("  - [{}](#{})\n", product.product_name, anchor));
    }

    toc.push_str("\n");

    toc
}

/// Generate the section for a single product.
fn generate_product_section(product: &ProductAnalysis) -> String {
    let mut section = String::new();

    let anchor = anchor_for(&product.product_name);
    section.push_str(&format!(
        "### {} {} {{#{}}}\n\n",
        product.overall_sentiment.emoji(),
        product.product_name,
        anchor
    ));

    // Standing line
    section.push_str(&format!(
        "*Overall: {} (score {:.2}) | Reviews folded: {} | Distinct reviewers: {}*\n\n",
        product.overall_sentiment,
        product.overall_sentiment_score,
        product.memory.total_reviews_analyzed,
        product.memory.unique_reviewers_count,
    ));

    if product.authorized_tasks.is_empty() {
        section.push_str(
            "> ⛔ **Quality gate closed.** The dataset was too incomplete for any analysis of this product.\n\n",
        );
        if let Some(ref quality) = product.quality {
            section.push_str(&generate_quality_table(quality));
        }
        section.push_str("---\n\n");
        return section;
    }

    let tasks = product
        .authorized_tasks
        .iter()
        .map(|task| format!("`{}`", task))
        .collect::<Vec<_>>()
        .join(", ");
    section.push_str(&format!("**Authorized analyses:** {}\n\n", tasks));

    if let Some(ref quality) = product.quality {
        section.push_str(&generate_quality_table(quality));
    }

    section.push_str(&generate_distribution_table(&product.memory));

    if product.authorized_tasks.contains(&AnalysisTask::Usps) {
        section.push_str(&generate_feature_block(
            "Praised Features",
            &product.top_usps,
        ));
    }
    if product.authorized_tasks.contains(&AnalysisTask::Issues) {
        section.push_str(&generate_feature_block("Complaints", &product.top_issues));
    }

    if let (Some(metrics), Some(digest)) = (&product.trend_metrics, &product.trend_report) {
        section.push_str(&generate_trend_section(metrics, &digest.report));
    }

    section.push_str(&generate_monthly_table(&product.memory));

    section.push_str(&generate_recent_reviews(&product.recent_reviews));

    if let Some(ref summary) = product.narrative_summary {
        section.push_str("#### Summary\n\n");
        section.push_str(&format!("> 💡 {}\n\n", summary.summary));
    }

    section.push_str("---\n\n");

    section
}

/// Generate the batch quality metrics table.
fn generate_quality_table(quality: &QualityMetrics) -> String {
    let mut table = String::new();

    table.push_str("#### Batch Quality\n\n");
    table.push_str("| Metric | Value |\n");
    table.push_str("|:---|:---:|\n");
    table.push_str(&format!("| Completeness | {:.3} |\n", quality.completeness));
    table.push_str(&format!("| Length ratio | {:.3} |\n", quality.length_ratio));
    table.push_str(&format!(
        "| Temporal spread | {:.3} |\n",
        quality.temporal_spread
    ));
    table.push_str(&format!(
        "| Vocabulary richness | {:.3} |\n",
        quality.vocabulary_richness
    ));
    table.push_str(&format!(
        "| Verified ratio | {:.3} |\n",
        quality.verified_ratio
    ));
    table.push_str(&format!("| Rating mean | {:.2} |\n", quality.rating_mean));
    table.push_str(&format!("| Rating std | {:.2} |\n", quality.rating_std));
    table.push_str("\n");

    table
}

/// Generate the accepted-sentiment distribution table.
fn generate_distribution_table(memory: &MemorySummary) -> String {
    let mut table = String::new();

    table.push_str("#### Sentiment Distribution\n\n");
    table.push_str("| Sentiment | Accepted | Verified |\n");
    table.push_str("|:---|:---:|:---:|\n");

    for category in SentimentCategory::ALL {
        let count = memory
            .sentiment_distribution
            .get(category.key())
            .copied()
            .unwrap_or(0);
        let verified = memory
            .sentiment_distribution
            .get(category.verified_key())
            .copied()
            .unwrap_or(0);
        table.push_str(&format!("| {} | {} | {} |\n", category, count, verified));
    }
    table.push_str("\n");

    table
}

/// Generate one ranked feature block.
fn generate_feature_block(title: &str, findings: &[FeatureFinding]) -> String {
    let mut block = String::new();

    block.push_str(&format!("#### {}\n\n", title));

    if findings.is_empty() {
        block.push_str("No strong signal.\n\n");
        return block;
    }

    for finding in findings {
        block.push_str(&format!(
            "- **{}** ({} mentions, confidence {:.2})\n",
            finding.feature, finding.mentions, finding.confidence
        ));
        if !finding.justification.is_empty() {
            block.push_str(&format!("  > {}\n", finding.justification));
        }
    }
    block.push_str("\n");

    block
}

/// Generate the trend section.
fn generate_trend_section(metrics: &TrendMetrics, report: &str) -> String {
    let mut section = String::new();

    section.push_str("#### Sentiment Trend\n\n");
    section.push_str(&format!(
        "*Max-min delta: {:.3} | Volatility: {:.3} | Slope per month: {:.3}*\n\n",
        metrics.max_min_delta, metrics.volatility, metrics.slope
    ));
    if !report.is_empty() {
        section.push_str(report);
        section.push_str("\n\n");
    }

    section
}

/// Generate the monthly breakdown table.
fn generate_monthly_table(memory: &MemorySummary) -> String {
    if memory.monthly_analysis.is_empty() {
        return String::new();
    }

    let mut table = String::new();

    table.push_str("#### Monthly Breakdown\n\n");
    table.push_str("| Month | Avg Score | Accepted |\n");
    table.push_str("|:---|:---:|:---:|\n");

    for (month, monthly) in &memory.monthly_analysis {
        let accepted: u64 = monthly.sentiment_counts.values().sum();
        table.push_str(&format!(
            "| {} | {:.3} | {} |\n",
            month, monthly.average_sentiment_score, accepted
        ));
    }
    table.push_str("\n");

    table
}

/// Generate the recent reviews block, oldest first.
fn generate_recent_reviews(reviews: &[RecentReview]) -> String {
    if reviews.is_empty() {
        return String::new();
    }

    let mut block = String::new();

    block.push_str("#### Recent Reviews\n\n");
    for review in reviews {
        let verdict = if review.accepted {
            "accepted"
        } else {
            "rejected"
        };
        block.push_str(&format!(
            "- **{}** {} (score {:.2}, {})\n",
            review.review_date, review.sentiment, review.sentiment_score, verdict
        ));
        if !review.key_drivers.is_empty() {
            block.push_str(&format!(
                "  Key drivers: {}\n",
                review.key_drivers.join(", ")
            ));
        }
        if !review.justification.is_empty() {
            block.push_str(&format!("  > {}\n", review.justification));
        }
    }
    block.push_str("\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by revlens*\n");

    footer
}

fn anchor_for(product_name: &str) -> String {
    product_name.replace(['/', '.', ' '], "-").to_lowercase()
}

/// Write the Markdown report to a file.
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_markdown_report(report);

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report to a file.
pub fn write_json_report(report: &Report, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;

    let mut file = std::fs::File::create(path)?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OverallLabel, SummaryDigest, TrendDigest, TrendLabel};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            dataset: "reviews/kettles.jsonl".to_string(),
            analysis_date: Utc::now(),
            model_used: "test-model".to_string(),
            products_analyzed: 1,
            reviews_total: 24,
            reviews_accepted: 20,
            duration_seconds: 30.0,
        };

        let mut sentiment_distribution = BTreeMap::new();
        sentiment_distribution.insert("positive".to_string(), 16);
        sentiment_distribution.insert("verified_positive".to_string(), 12);
        sentiment_distribution.insert("negative".to_string(), 4);

        let memory = MemorySummary {
            product_name: "Aurora Kettle".to_string(),
            overall_sentiment_trend: TrendLabel::Positive,
            total_reviews_analyzed: 24,
            sentiment_distribution,
            top_usps: vec![("fast heating".to_string(), 7)],
            top_issues: vec![("stiff lid".to_string(), 2)],
            unique_reviewers_count: 21,
            monthly_analysis: BTreeMap::new(),
        };

        Report {
            metadata,
            products: vec![ProductAnalysis {
                product_name: "Aurora Kettle".to_string(),
                quality: Some(QualityMetrics {
                    length_ratio: 0.8,
                    temporal_spread: 0.4,
                    vocabulary_richness: 0.3,
                    verified_ratio: 0.9,
                    rating_mean: 4.2,
                    rating_std: 0.8,
                    completeness: 1.0,
                }),
                authorized_tasks: vec![
                    AnalysisTask::Sentiment,
                    AnalysisTask::Summary,
                    AnalysisTask::Usps,
                    AnalysisTask::Issues,
                ],
                memory,
                overall_sentiment: OverallLabel::Positive,
                overall_sentiment_score: 0.62,
                top_usps: vec![FeatureFinding {
                    feature: "fast heating".to_string(),
                    mentions: 7,
                    justification: "Dominant praise across the batch.".to_string(),
                    confidence: 0.92,
                }],
                top_issues: vec![],
                recent_reviews: vec![
                    RecentReview {
                        review_date: "2024-05-18".to_string(),
                        sentiment: SentimentCategory::Positive,
                        sentiment_score: 0.8,
                        accepted: true,
                        key_drivers: vec!["fast heating".to_string()],
                        justification: "Praised the heating speed.".to_string(),
                    },
                    RecentReview {
                        review_date: "2024-05-20".to_string(),
                        sentiment: SentimentCategory::Neutral,
                        sentiment_score: 0.0,
                        accepted: false,
                        key_drivers: vec![],
                        justification: String::new(),
                    },
                ],
                trend_metrics: Some(TrendMetrics {
                    max_min_delta: 0.4,
                    volatility: 0.16,
                    slope: 0.2,
                }),
                trend_report: Some(TrendDigest {
                    report: "Sentiment climbed steadily.".to_string(),
                    model_confidence: 0.9,
                }),
                narrative_summary: Some(SummaryDigest {
                    summary: "Reception is warm, led by heating speed.".to_string(),
                    model_confidence: 0.88,
                }),
            }],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# Review Signal Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Products"));
        assert!(markdown.contains("Aurora Kettle"));
        assert!(markdown.contains("Praised Features"));
        assert!(markdown.contains("fast heating"));
        assert!(markdown.contains("Sentiment climbed steadily."));
        assert!(markdown.contains("Reception is warm"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("reviews/kettles.jsonl"));
        assert!(section.contains("test-model"));
        assert!(section.contains("**Reviews Folded:** 24"));
        assert!(section.contains("**Reviews Accepted:** 20"));
    }

    #[test]
    fn test_distribution_table_pairs_verified_counts() {
        let report = create_test_report();
        let table = generate_distribution_table(&report.products[0].memory);

        assert!(table.contains("| positive | 16 | 12 |"));
        assert!(table.contains("| negative | 4 | 0 |"));
        assert!(table.contains("| mixed | 0 | 0 |"));
    }

    #[test]
    fn test_recent_reviews_block_lists_both_verdicts() {
        let report = create_test_report();
        let block = generate_recent_reviews(&report.products[0].recent_reviews);

        assert!(block.contains("#### Recent Reviews"));
        assert!(block.contains("- **2024-05-18** positive (score 0.80, accepted)"));
        assert!(block.contains("  Key drivers: fast heating"));
        assert!(block.contains("  > Praised the heating speed."));
        assert!(block.contains("- **2024-05-20** neutral (score 0.00, rejected)"));
        assert!(generate_recent_reviews(&[]).is_empty());
    }

    #[test]
    fn test_gate_closed_product_renders_callout() {
        let mut report = create_test_report();
        report.products[0].authorized_tasks.clear();

        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("Quality gate closed"));
        assert!(!markdown.contains("Praised Features"));
    }

    #[test]
    fn test_empty_feature_block_states_no_signal() {
        let block = generate_feature_block("Complaints", &[]);

        assert!(block.contains("No strong signal."));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"dataset\""));
        assert!(json.contains("\"products\""));
        assert!(json.contains("\"top_usps\""));
    }
}
