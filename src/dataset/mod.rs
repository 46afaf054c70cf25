//! Review dataset loading and validation.
//!
//! Datasets are JSON arrays (`.json`) or JSON lines (`.jsonl`) of review
//! rows. Rows load permissively: missing cells stay `None` so the quality
//! assessor can account for them, and only a field absent from every row
//! fails the load outright.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// Fields a dataset must carry for the pipeline to run.
pub const REQUIRED_FIELDS: [&str; 9] = [
    "product_name",
    "reviewer_name",
    "customer_review",
    "rating",
    "verified_purchase",
    "helpful_votes",
    "total_votes",
    "review_date",
    "purchase_date",
];

/// Errors raised while loading or validating a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse dataset {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("dataset {path} contains no rows")]
    Empty { path: String },
    #[error("required field '{field}' is missing from every row")]
    MissingField { field: String },
    #[error("unsupported dataset format: {path} (expected .json or .jsonl)")]
    UnsupportedFormat { path: String },
}

/// A review row exactly as it appears in the dataset.
///
/// Every field is optional so completeness can be measured before the
/// row is converted for analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawReview {
    pub product_name: Option<String>,
    /// Reviewer display name; older datasets call this `customer_name`.
    #[serde(alias = "customer_name")]
    pub reviewer_name: Option<String>,
    pub customer_review: Option<String>,
    /// Star rating; accepted as integer or float.
    pub rating: Option<f64>,
    pub verified_purchase: Option<bool>,
    pub helpful_votes: Option<u64>,
    pub total_votes: Option<u64>,
    /// Review date, ISO 8601 `YYYY-MM-DD`.
    pub review_date: Option<String>,
    /// Purchase date, ISO 8601 `YYYY-MM-DD`.
    pub purchase_date: Option<String>,
}

impl RawReview {
    /// Number of required cells missing from this row.
    pub fn missing_cells(&self) -> usize {
        REQUIRED_FIELDS
            .iter()
            .filter(|field| !self.has_field(field))
            .count()
    }

    fn has_field(&self, field: &str) -> bool {
        match field {
            "product_name" => self.product_name.is_some(),
            "reviewer_name" => self.reviewer_name.is_some(),
            "customer_review" => self.customer_review.is_some(),
            "rating" => self.rating.is_some(),
            "verified_purchase" => self.verified_purchase.is_some(),
            "helpful_votes" => self.helpful_votes.is_some(),
            "total_votes" => self.total_votes.is_some(),
            "review_date" => self.review_date.is_some(),
            "purchase_date" => self.purchase_date.is_some(),
            _ => false,
        }
    }
}

/// A review row converted for analysis.
///
/// Missing cells take neutral defaults; rows only reach this form after
/// the completeness gate has passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub product_name: String,
    pub reviewer_name: String,
    pub customer_review: String,
    pub rating: u8,
    pub verified_purchase: bool,
    pub helpful_votes: u64,
    pub total_votes: u64,
    pub review_date: String,
    pub purchase_date: String,
}

impl ReviewRecord {
    /// Character count of the review text.
    pub fn review_length(&self) -> usize {
        self.customer_review.chars().count()
    }

    /// Helpful votes over total votes; exactly 0.0 when nobody voted.
    pub fn helpfulness_ratio(&self) -> f64 {
        if self.total_votes == 0 {
            0.0
        } else {
            self.helpful_votes as f64 / self.total_votes as f64
        }
    }
}

impl From<&RawReview> for ReviewRecord {
    fn from(raw: &RawReview) -> Self {
        Self {
            product_name: raw.product_name.clone().unwrap_or_default(),
            reviewer_name: raw.reviewer_name.clone().unwrap_or_default(),
            customer_review: raw.customer_review.clone().unwrap_or_default(),
            rating: raw
                .rating
                .map(|r| r.round().clamp(0.0, 5.0) as u8)
                .unwrap_or(0),
            verified_purchase: raw.verified_purchase.unwrap_or(false),
            helpful_votes: raw.helpful_votes.unwrap_or(0),
            total_votes: raw.total_votes.unwrap_or(0),
            review_date: raw.review_date.clone().unwrap_or_default(),
            purchase_date: raw.purchase_date.clone().unwrap_or_default(),
        }
    }
}

/// Loads review rows from a `.json` array or `.jsonl` file.
pub fn load_rows(path: &Path) -> Result<Vec<RawReview>, DatasetError> {
    let content = fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let rows = match ext {
        "json" => {
            serde_json::from_str::<Vec<RawReview>>(&content).map_err(|source| {
                DatasetError::Parse {
                    path: path.display().to_string(),
                    source,
                }
            })?
        }
        "jsonl" => parse_json_lines(&content, path)?,
        _ => {
            return Err(DatasetError::UnsupportedFormat {
                path: path.display().to_string(),
            })
        }
    };

    if rows.is_empty() {
        return Err(DatasetError::Empty {
            path: path.display().to_string(),
        });
    }

    validate_required_fields(&rows)?;
    debug!("Loaded {} rows from {}", rows.len(), path.display());
    Ok(rows)
}

/// Walks a directory for dataset files, sorted for a stable run order.
pub fn discover_datasets(dir: &Path) -> Vec<PathBuf> {
    let mut found: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("json") | Some("jsonl")
            )
        })
        .collect();
    found.sort();
    found
}

/// Groups rows per product name.
///
/// Rows with no product name land under a placeholder key so they still
/// count against their batch's completeness.
pub fn group_by_product(rows: Vec<RawReview>) -> BTreeMap<String, Vec<RawReview>> {
    let mut groups: BTreeMap<String, Vec<RawReview>> = BTreeMap::new();
    for row in rows {
        let product = row
            .product_name
            .clone()
            .unwrap_or_else(|| "(unnamed product)".to_string());
        groups.entry(product).or_default().push(row);
    }
    groups
}

fn parse_json_lines(content: &str, path: &Path) -> Result<Vec<RawReview>, DatasetError> {
    let mut rows = Vec::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = serde_json::from_str(line).map_err(|source| DatasetError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        rows.push(row);
    }
    Ok(rows)
}

fn validate_required_fields(rows: &[RawReview]) -> Result<(), DatasetError> {
    for field in REQUIRED_FIELDS {
        if rows.iter().all(|row| !row.has_field(field)) {
            return Err(DatasetError::MissingField {
                field: field.to_string(),
            });
        }
    }
    Ok(())
}
