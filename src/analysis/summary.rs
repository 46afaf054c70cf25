//! Narrative product summary.
//!
//! The model writes prose over numbers the fold already produced. It
//! is handed the distribution, the strongest features, and the rolled
//! up overall standing, never raw review text.

use crate::analysis::generate_checked;
use crate::memory::ProductMemory;
use crate::models::{SentimentCategory, SummaryDigest};
use crate::oracle::{decode_payload, Oracle, OracleError};

/// How many features of each kind the summary cites.
const TOP_SIGNALS: usize = 5;

/// Asks the model for a short executive summary of one product.
pub async fn run_summary(
    oracle: &dyn Oracle,
    memory: &ProductMemory,
) -> Result<SummaryDigest, OracleError> {
    let prompt = summary_prompt(memory);
    let (response, _secs) = generate_checked(oracle, &prompt).await;
    decode_payload(&response)
}

fn summary_prompt(memory: &ProductMemory) -> String {
    let counts = SentimentCategory::ALL
        .iter()
        .map(|category| {
            format!(
                "{}: {}",
                category,
                memory.stats.get(category.key()).copied().unwrap_or(0)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        r#"Write an executive summary of customer reception for "{product}".

Accumulated signals:
- Reviews folded: {total} ({accepted} accepted)
- Sentiment counts: {counts}
- Sentiment trend: {trend}
- Overall standing: {label} (score {score:.2})
- Top strengths: {usps}
- Top complaints: {issues}
- Latest praise on record: {praise}
- Latest complaint on record: {complaint}
- Distinct reviewers: {reviewers}

Write three or four sentences for a product manager deciding what to fix next. Respond with a single JSON object, nothing else:
{{"summary": "<the summary>", "model_confidence": <0.0 to 1.0>}}"#,
        product = memory.product_name,
        total = memory.sentiment_history.len(),
        accepted = memory.accepted_count(),
        counts = counts,
        trend = memory.sentiment_trend(),
        label = memory.overall_sentiment,
        score = memory.overall_sentiment_score,
        usps = feature_line(&memory.top_usps(TOP_SIGNALS)),
        issues = feature_line(&memory.top_issues(TOP_SIGNALS)),
        praise = latest_justification(memory, SentimentCategory::Positive),
        complaint = latest_justification(memory, SentimentCategory::Negative),
        reviewers = memory.reviewers.len(),
    )
}

/// The analyst's rationale from the newest folded review in a category.
fn latest_justification(memory: &ProductMemory, category: SentimentCategory) -> String {
    memory
        .filter_by_sentiment(category)
        .last()
        .map(|entry| entry.record.result.justification.clone())
        .unwrap_or_else(|| "none recorded".to_string())
}

fn feature_line(entries: &[(String, u64)]) -> String {
    if entries.is_empty() {
        return "none recorded".to_string();
    }
    entries
        .iter()
        .map(|(phrase, count)| format!("\"{}\" ({})", phrase, count))
        .collect::<Vec<_>>()
        .join(", ")
}
