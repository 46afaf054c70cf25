//! Feature extraction over accumulated praise and complaint tables.
//!
//! The model ranks phrases the sentiment pass already collected; it
//! never introduces new ones. Low-confidence output is discarded
//! rather than surfaced.

use crate::analysis::generate_checked;
use crate::memory::ProductMemory;
use crate::models::{FeatureDigest, FeatureFinding};
use crate::oracle::{decode_payload, Oracle, OracleError};
use std::collections::BTreeSet;
use tracing::info;

/// Batch confidence below which a digest carries no usable signal.
const BATCH_CONFIDENCE_FLOOR: f64 = 0.8;
/// Confidence an individual entry must exceed to survive filtering.
const ENTRY_CONFIDENCE_FLOOR: f64 = 0.85;
/// How many entries the model is asked to rank.
const TOP_LIMIT: usize = 3;

/// Which accumulated table an extraction reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    Usps,
    Issues,
}

impl FeatureKind {
    fn label(&self) -> &'static str {
        match self {
            FeatureKind::Usps => "praised features",
            FeatureKind::Issues => "complaints",
        }
    }

    fn ask(&self) -> &'static str {
        match self {
            FeatureKind::Usps => "strongest selling points",
            FeatureKind::Issues => "most damaging problems",
        }
    }
}

/// Asks the model to rank one product's feature table.
///
/// An empty table short-circuits to an empty digest without an oracle
/// call. Decode failures are errors; weak output filters to empty.
pub async fn extract_features(
    oracle: &dyn Oracle,
    memory: &ProductMemory,
    kind: FeatureKind,
) -> Result<FeatureDigest, OracleError> {
    let (ranked, justifications) = match kind {
        FeatureKind::Usps => (
            memory.top_usps(memory.usps.len()),
            &memory.usp_justification,
        ),
        FeatureKind::Issues => (
            memory.top_issues(memory.issues.len()),
            &memory.issue_justification,
        ),
    };

    if ranked.is_empty() {
        info!(
            "No {} recorded for {}; skipping extraction",
            kind.label(),
            memory.product_name
        );
        return Ok(FeatureDigest::empty());
    }

    let prompt = feature_prompt(&memory.product_name, kind, &ranked, justifications);
    let (response, _secs) = generate_checked(oracle, &prompt).await;
    let digest: FeatureDigest = decode_payload(&response)?;
    Ok(filter_digest(digest))
}

/// Applies the acceptance policy to a decoded digest.
///
/// A batch confidence under 0.8 empties the digest. Surviving entries
/// must individually clear 0.85 and are ordered by mention count,
/// then phrase.
pub fn filter_digest(digest: FeatureDigest) -> FeatureDigest {
    if digest.model_confidence < BATCH_CONFIDENCE_FLOOR {
        info!(
            "Feature digest confidence {:.2} under floor; treating as no signal",
            digest.model_confidence
        );
        return FeatureDigest {
            top_features: Vec::new(),
            model_confidence: digest.model_confidence,
        };
    }

    let mut entries: Vec<FeatureFinding> = digest
        .top_features
        .into_iter()
        .filter(|entry| entry.confidence > ENTRY_CONFIDENCE_FLOOR)
        .collect();
    entries.sort_by(|a, b| {
        b.mentions
            .cmp(&a.mentions)
            .then_with(|| a.feature.cmp(&b.feature))
    });
    entries.truncate(TOP_LIMIT);

    FeatureDigest {
        top_features: entries,
        model_confidence: digest.model_confidence,
    }
}

fn feature_prompt(
    product: &str,
    kind: FeatureKind,
    ranked: &[(String, u64)],
    justifications: &BTreeSet<String>,
) -> String {
    let counts = ranked
        .iter()
        .map(|(phrase, count)| format!("- \"{}\": {} mentions", phrase, count))
        .collect::<Vec<_>>()
        .join("\n");
    let evidence = if justifications.is_empty() {
        "- none recorded".to_string()
    } else {
        justifications
            .iter()
            .map(|j| format!("- {}", j))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"Identify the {ask} of "{product}" from accumulated review evidence.

Mention counts:
{counts}

Supporting justifications:
{evidence}

Pick at most {limit} entries with the strongest evidence, using only phrases from the mention table. Respond with a single JSON object, nothing else:
{{"top_features": [{{"feature": "<phrase from the table>", "mentions": <count>, "justification": "<one sentence>", "confidence": <0.0 to 1.0>}}], "model_confidence": <0.0 to 1.0>}}"#,
        ask = kind.ask(),
        product = product,
        counts = counts,
        evidence = evidence,
        limit = TOP_LIMIT,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::testing::MockOracle;

    fn finding(feature: &str, mentions: u64, confidence: f64) -> FeatureFinding {
        FeatureFinding {
            feature: feature.to_string(),
            mentions,
            justification: "Backed by repeat mentions.".to_string(),
            confidence,
        }
    }

    fn seeded_memory() -> ProductMemory {
        let mut memory = ProductMemory::new("Aurora Kettle");
        memory.usps.insert("fast heating".to_string(), 7);
        memory.usps.insert("quiet boil".to_string(), 3);
        memory
            .usp_justification
            .insert("Praises heating speed.".to_string());
        memory
    }

    #[tokio::test]
    async fn test_empty_table_skips_oracle() {
        let oracle = MockOracle::new(vec![]);
        let memory = ProductMemory::new("Aurora Kettle");

        let digest = extract_features(&oracle, &memory, FeatureKind::Usps)
            .await
            .unwrap();

        assert!(digest.top_features.is_empty());
        assert_eq!(oracle.calls(), 0);
    }

    #[tokio::test]
    async fn test_extract_decodes_and_filters() {
        let response = r#"{"top_features": [{"feature": "fast heating", "mentions": 7, "justification": "Dominant praise.", "confidence": 0.92}, {"feature": "quiet boil", "mentions": 3, "justification": "Occasional praise.", "confidence": 0.6}], "model_confidence": 0.9}"#;
        let oracle = MockOracle::new(vec![(response, 15.0)]);
        let memory = seeded_memory();

        let digest = extract_features(&oracle, &memory, FeatureKind::Usps)
            .await
            .unwrap();

        assert_eq!(digest.top_features.len(), 1);
        assert_eq!(digest.top_features[0].feature, "fast heating");
        assert_eq!(oracle.calls(), 1);

        let prompts = oracle.prompts.lock().unwrap();
        assert!(prompts[0].contains("\"fast heating\": 7 mentions"));
        assert!(prompts[0].contains("Praises heating speed."));
    }

    #[tokio::test]
    async fn test_undecodable_response_is_an_error() {
        let oracle = MockOracle::new(vec![("no structure", 15.0), ("still none", 15.0)]);
        let memory = seeded_memory();

        let outcome = extract_features(&oracle, &memory, FeatureKind::Usps).await;

        assert!(outcome.is_err());
    }

    #[test]
    fn test_batch_floor_empties_digest() {
        let digest = FeatureDigest {
            top_features: vec![finding("fast heating", 7, 0.95)],
            model_confidence: 0.5,
        };

        let filtered = filter_digest(digest);

        assert!(filtered.top_features.is_empty());
        assert!((filtered.model_confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_entry_floor_is_strict() {
        let digest = FeatureDigest {
            top_features: vec![
                finding("at the floor", 9, 0.85),
                finding("above the floor", 2, 0.9),
            ],
            model_confidence: 0.9,
        };

        let filtered = filter_digest(digest);

        assert_eq!(filtered.top_features.len(), 1);
        assert_eq!(filtered.top_features[0].feature, "above the floor");
    }

    #[test]
    fn test_entries_ordered_by_mentions_then_phrase() {
        let digest = FeatureDigest {
            top_features: vec![
                finding("quiet boil", 3, 0.9),
                finding("cool handle", 7, 0.9),
                finding("auto shutoff", 7, 0.9),
            ],
            model_confidence: 0.9,
        };

        let filtered = filter_digest(digest);

        let order: Vec<&str> = filtered
            .top_features
            .iter()
            .map(|f| f.feature.as_str())
            .collect();
        assert_eq!(order, vec!["auto shutoff", "cool handle", "quiet boil"]);
    }

    #[test]
    fn test_no_more_than_limit_survives() {
        let digest = FeatureDigest {
            top_features: vec![
                finding("a", 9, 0.9),
                finding("b", 8, 0.9),
                finding("c", 7, 0.9),
                finding("d", 6, 0.9),
            ],
            model_confidence: 0.9,
        };

        let filtered = filter_digest(digest);

        assert_eq!(filtered.top_features.len(), 3);
    }
}
