//! Golden baselines: one blessed output hash per (model, provider).

use crate::model::Trace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// SHA-256 of the response text, lowercase hex.
pub fn output_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoldenRecord {
    pub model: String,
    pub provider: String,
    pub trace_id: String,
    pub output_hash: String,
    pub blessed_at: DateTime<Utc>,
}

impl GoldenRecord {
    pub fn bless(trace: &Trace, blessed_at: DateTime<Utc>) -> Self {
        Self {
            model: trace
                .request
                .model
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            provider: trace.request.provider.clone(),
            trace_id: trace.trace_id.clone(),
            output_hash: output_hash(&trace.response.text),
            blessed_at,
        }
    }

    /// Baseline key, `<model>:<provider>`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.model, self.provider)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GoldenOutcome {
    Match,
    Mismatch { expected: String, actual: String },
}

impl GoldenOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, GoldenOutcome::Match)
    }
}

pub fn compare_to_golden(golden: &GoldenRecord, candidate: &Trace) -> GoldenOutcome {
    let actual = output_hash(&candidate.response.text);
    if actual == golden.output_hash {
        GoldenOutcome::Match
    } else {
        GoldenOutcome::Mismatch {
            expected: golden.output_hash.clone(),
            actual,
        }
    }
}
