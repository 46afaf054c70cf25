//! Model-backed analyses.
//!
//! Each analysis builds a prompt from accumulated product state, calls
//! the oracle through the self-evaluation gate, and strictly decodes
//! the response. The sentiment pass folds reviews into memory; the
//! feature, trend, and summary analyses read memory back out.

pub mod features;
pub mod sentiment;
pub mod summary;
pub mod trend;

use crate::oracle::Oracle;
use crate::selfeval;
use tracing::debug;

/// Calls the oracle, retrying once when the response self-evaluates
/// below the retry threshold. Whichever response scores higher wins.
pub async fn generate_checked(oracle: &dyn Oracle, prompt: &str) -> (String, f64) {
    let (response, secs) = oracle.generate(prompt).await;
    let first = selfeval::evaluate(&response, secs);
    if !first.retry {
        return (response, secs);
    }

    debug!(
        "Response self-evaluated at {:.2}; retrying once",
        first.confidence
    );
    let (retried, retried_secs) = oracle.generate(prompt).await;
    let second = selfeval::evaluate(&retried, retried_secs);
    if second.confidence >= first.confidence {
        (retried, retried_secs)
    } else {
        (response, secs)
    }
}
