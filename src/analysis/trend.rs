//! Sentiment trend analysis over monthly rollups.
//!
//! Numeric descriptors come straight from the monthly averages; the
//! model only narrates them. A window the memory cannot fill is
//! skipped, not padded.

use crate::analysis::generate_checked;
use crate::memory::ProductMemory;
use crate::models::{TrendDigest, TrendMetrics};
use crate::oracle::{decode_payload, Oracle, OracleError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

/// Window of monthly history a trend analysis covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeSpan {
    /// Every month on record.
    Historical,
    /// Last twelve months on record.
    Year,
    /// Last six months on record.
    HalfYear,
    /// Last three months on record.
    Quarter,
    /// Last month on record.
    Month,
}

impl TimeSpan {
    fn window(&self) -> Option<usize> {
        match self {
            TimeSpan::Historical => None,
            TimeSpan::Year => Some(12),
            TimeSpan::HalfYear => Some(6),
            TimeSpan::Quarter => Some(3),
            TimeSpan::Month => Some(1),
        }
    }
}

impl From<&str> for TimeSpan {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "year" => TimeSpan::Year,
            "halfyear" => TimeSpan::HalfYear,
            "quarter" => TimeSpan::Quarter,
            "month" => TimeSpan::Month,
            _ => TimeSpan::Historical,
        }
    }
}

impl fmt::Display for TimeSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TimeSpan::Historical => "historical",
            TimeSpan::Year => "year",
            TimeSpan::HalfYear => "halfyear",
            TimeSpan::Quarter => "quarter",
            TimeSpan::Month => "month",
        };
        write!(f, "{}", label)
    }
}

/// Narrates the sentiment trajectory over a window of monthly history.
///
/// Returns `Ok(None)` when the span asks for more months than the
/// memory holds, or when fewer than two months exist to compare.
pub async fn run_trend_analysis(
    oracle: &dyn Oracle,
    memory: &ProductMemory,
    span: TimeSpan,
) -> Result<Option<(TrendDigest, TrendMetrics)>, OracleError> {
    let months = match windowed_months(memory, span) {
        Some(months) => months,
        None => {
            info!(
                "Trend span '{}' needs more months than {} has on record",
                span, memory.product_name
            );
            return Ok(None);
        }
    };

    let averages: Vec<f64> = months.iter().map(|(_, avg)| *avg).collect();
    let metrics = match compute_trend_metrics(&averages) {
        Some(metrics) => metrics,
        None => {
            info!(
                "Not enough monthly history to trend {} over '{}'",
                memory.product_name, span
            );
            return Ok(None);
        }
    };

    let prompt = trend_prompt(&memory.product_name, &months, &metrics);
    let (response, _secs) = generate_checked(oracle, &prompt).await;
    let digest: TrendDigest = decode_payload(&response)?;
    Ok(Some((digest, metrics)))
}

/// Numeric descriptors over at least two monthly averages.
pub fn compute_trend_metrics(averages: &[f64]) -> Option<TrendMetrics> {
    if averages.len() < 2 {
        return None;
    }

    let max = averages.iter().cloned().fold(f64::MIN, f64::max);
    let min = averages.iter().cloned().fold(f64::MAX, f64::min);
    let mean = averages.iter().sum::<f64>() / averages.len() as f64;
    let variance =
        averages.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / averages.len() as f64;

    Some(TrendMetrics {
        max_min_delta: max - min,
        volatility: variance.sqrt(),
        slope: least_squares_slope(averages),
    })
}

/// The last months of rollups covered by the span, oldest first.
///
/// `None` when the span asks for more months than exist. Rollup keys
/// are `YYYY-MM`, so map order is already chronological.
fn windowed_months(memory: &ProductMemory, span: TimeSpan) -> Option<Vec<(String, f64)>> {
    let months: Vec<(String, f64)> = memory
        .monthly_report
        .iter()
        .map(|(month, rollup)| (month.clone(), rollup.average_sentiment_score))
        .collect();

    match span.window() {
        None => Some(months),
        Some(window) if months.len() >= window => Some(months[months.len() - window..].to_vec()),
        Some(_) => None,
    }
}

/// Least-squares slope over equally spaced points, two or more.
fn least_squares_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;

    let mut numerator = 0.0;
    let mut denominator = 0.0;
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - mean_x;
        numerator += dx * (y - mean_y);
        denominator += dx * dx;
    }
    numerator / denominator
}

fn trend_prompt(product: &str, months: &[(String, f64)], metrics: &TrendMetrics) -> String {
    let series = months
        .iter()
        .map(|(month, avg)| format!("- {}: {:.3}", month, avg))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Describe how customer sentiment for "{product}" moved over these months.

Average sentiment score per month (-1.0 to 1.0):
{series}

Computed descriptors:
- Max-min delta: {delta:.3}
- Volatility: {volatility:.3}
- Slope per month: {slope:.3}

Explain the trajectory in two or three sentences grounded in the numbers. Respond with a single JSON object, nothing else:
{{"report": "<your explanation>", "model_confidence": <0.0 to 1.0>}}"#,
        product = product,
        series = series,
        delta = metrics.max_min_delta,
        volatility = metrics.volatility,
        slope = metrics.slope,
    )
}
