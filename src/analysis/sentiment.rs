//! Per-review sentiment analysis.
//!
//! Reviews fold into product memory strictly in dataset order: each
//! review's prompt is built from the memory snapshot before its own
//! update, so review N sees exactly the signal of reviews 1..N-1.

use crate::analysis::generate_checked;
use crate::context::{build_context, ReviewContext};
use crate::dataset::ReviewRecord;
use crate::memory::ProductMemory;
use crate::models::{SentimentResult, TrendLabel};
use crate::oracle::{decode_payload, Oracle};
use crate::weighting::weigh;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::error;

const RESPONSE_SCHEMA: &str = r#"Respond with a single JSON object, nothing else:
{"sentiment": "positive" | "negative" | "neutral" | "mixed", "sentiment_score": <-1.0 to 1.0>, "model_confidence": <0.0 to 1.0>, "key_drivers": ["<short feature phrase>"], "emotional_intensity": <0.0 to 1.0>, "mixed_signals": <true | false>, "conflicting_phrases": ["<phrase>"], "justification": "<one sentence>", "trust": "<high | standard>", "persona_adjusted": <true | false>}"#;

const EXAMPLE_POSITIVE_TREND: &str = r#"Example for a product trending positive:
Review: "Still impressed after a month, the battery just keeps going."
{"sentiment": "positive", "sentiment_score": 0.8, "model_confidence": 0.9, "key_drivers": ["battery life"], "emotional_intensity": 0.75, "mixed_signals": false, "conflicting_phrases": [], "justification": "Sustained praise for battery endurance.", "trust": "high", "persona_adjusted": true}"#;

const EXAMPLE_NEGATIVE_TREND: &str = r#"Example for a product trending negative:
Review: "Another unit, same cracked hinge within two weeks."
{"sentiment": "negative", "sentiment_score": -0.85, "model_confidence": 0.9, "key_drivers": ["hinge durability"], "emotional_intensity": 0.8, "mixed_signals": false, "conflicting_phrases": [], "justification": "Repeat hardware failure echoing known complaints.", "trust": "high", "persona_adjusted": true}"#;

const EXAMPLE_NEUTRAL_TREND: &str = r#"Example for a product trending neutral:
Review: "Does what the box says. Nothing more to report."
{"sentiment": "neutral", "sentiment_score": 0.05, "model_confidence": 0.85, "key_drivers": ["meets expectations"], "emotional_intensity": 0.2, "mixed_signals": false, "conflicting_phrases": [], "justification": "Flat, factual review without praise or complaint.", "trust": "standard", "persona_adjusted": true}"#;

const EXAMPLE_MIXED_TREND: &str = r#"Example for a product with mixed reception:
Review: "Gorgeous screen, but the speakers buzz at any volume."
{"sentiment": "mixed", "sentiment_score": 0.1, "model_confidence": 0.85, "key_drivers": ["screen quality", "speaker buzz"], "emotional_intensity": 0.6, "mixed_signals": true, "conflicting_phrases": ["gorgeous screen", "speakers buzz"], "justification": "Strong praise and a concrete defect in one review.", "trust": "high", "persona_adjusted": true}"#;

const EXAMPLE_DEFAULT: &str = r#"Example:
Review: "Arrived on time and works as described so far."
{"sentiment": "positive", "sentiment_score": 0.4, "model_confidence": 0.8, "key_drivers": ["works as described"], "emotional_intensity": 0.3, "mixed_signals": false, "conflicting_phrases": [], "justification": "Mild early satisfaction without strong signal.", "trust": "standard", "persona_adjusted": false}"#;

/// Counts from one product's fold.
#[derive(Debug, Clone, Copy, Default)]
pub struct SentimentPassStats {
    /// Reviews folded into history, accepted or not.
    pub folded: usize,
    /// Reviews that cleared the acceptance threshold.
    pub accepted: usize,
}

/// Folds a product's reviews into its memory, one at a time.
pub async fn run_sentiment_pass(
    oracle: &dyn Oracle,
    records: &[ReviewRecord],
    memory: &mut ProductMemory,
    show_progress: bool,
) -> SentimentPassStats {
    let progress = if show_progress {
        let bar = ProgressBar::new(records.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                .unwrap()
                .progress_chars("#>-"),
        );
        Some(bar)
    } else {
        None
    };

    let mut stats = SentimentPassStats::default();
    for record in records {
        let context = build_context(record, memory);
        let prompt = sentiment_prompt(record, &context);
        let (response, _secs) = generate_checked(oracle, &prompt).await;

        let result = match decode_payload::<SentimentResult>(&response) {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "Sentiment decode failed for review by {}: {}",
                    record.reviewer_name, e
                );
                SentimentResult::neutral_empty()
            }
        };

        let weighted = weigh(result);
        stats.folded += 1;
        if weighted.accepted() {
            stats.accepted += 1;
        }
        memory.update(weighted, context);

        if let Some(ref bar) = progress {
            bar.inc(1);
        }
    }

    if let Some(bar) = progress {
        bar.finish_with_message(format!("{} reviews folded", stats.folded));
    }

    stats
}

/// Builds the per-review prompt from the record and its context.
pub fn sentiment_prompt(record: &ReviewRecord, context: &ReviewContext) -> String {
    format!(
        r#"Analyze one customer review of "{product}" as a {persona} reviewer analyst.

Product so far:
- Sentiment trend: {trend}
- Known strengths: {usps}
- Known complaints: {issues}

Review metadata:
- Reviewer: {reviewer}
- Rating: {rating}/5
- Verified purchase: {verified}
- Helpfulness ratio: {helpfulness:.2}
- Review quality score: {quality:.2}
- Trust level: {trust}
- Review date: {date}

Review text:
"""
{text}
"""

{example}

{schema}"#,
        product = record.product_name,
        persona = context.persona,
        trend = context.current_trend,
        usps = phrase_list(&context.recent_usps),
        issues = phrase_list(&context.recent_issues),
        reviewer = context.reviewer_name,
        rating = context.rating,
        verified = context.verified_purchase,
        helpfulness = context.helpfulness_ratio,
        quality = context.quality_score,
        trust = trust_tag(context),
        date = context.review_date,
        text = record.customer_review,
        example = few_shot_example(context.current_trend),
        schema = RESPONSE_SCHEMA,
    )
}

/// One worked example matching the product's current trend.
fn few_shot_example(trend: TrendLabel) -> &'static str {
    match trend {
        TrendLabel::Positive => EXAMPLE_POSITIVE_TREND,
        TrendLabel::Negative => EXAMPLE_NEGATIVE_TREND,
        TrendLabel::Neutral => EXAMPLE_NEUTRAL_TREND,
        TrendLabel::Mixed => EXAMPLE_MIXED_TREND,
        TrendLabel::Unknown => EXAMPLE_DEFAULT,
    }
}

fn trust_tag(context: &ReviewContext) -> &'static str {
    if context.verified_purchase {
        "high"
    } else {
        "standard"
    }
}

fn phrase_list(phrases: &[String]) -> String {
    if phrases.is_empty() {
        "none yet".to_string()
    } else {
        phrases.join(", ")
    }
}
