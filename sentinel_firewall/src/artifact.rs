//! Decision artifacts and their canonical byte form.
//!
//! The canonical form is compact JSON with object keys sorted at every depth.
//! Both the content hash and the signature are computed over these bytes, so
//! two builds from identical inputs must serialize identically.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use sentinel_core::{EscalationAttempt, Verdict};

use crate::error::{FirewallError, FirewallResult};

/// One validator's row in the artifact's audit summary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidatorRunSummary {
    pub redundancy_level: u32,
    pub validator_id: String,
    pub valid: bool,
    pub confidence_score: f64,
    pub overall_score: f64,
    pub risk_level: String,
    pub data_hash: String,
}

impl ValidatorRunSummary {
    /// Flatten an attempt into rows. Absent fields become "unknown" / 0.
    pub fn from_attempt(attempt: &EscalationAttempt) -> Vec<Self> {
        attempt
            .judgments
            .iter()
            .map(|j| Self {
                redundancy_level: attempt.redundancy_level,
                validator_id: j.validator_id.clone().unwrap_or_else(|| "unknown".into()),
                valid: j.valid.unwrap_or(false),
                confidence_score: j.confidence_score.unwrap_or(0.0),
                overall_score: j.overall_score.unwrap_or(0.0),
                risk_level: j.risk_level.clone().unwrap_or_else(|| "unknown".into()),
                data_hash: j.data_hash.clone().unwrap_or_else(|| "unknown".into()),
            })
            .collect()
    }
}

/// Immutable record of one completed evaluation. Holds hashes of the
/// objective and output, never the raw text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionArtifact {
    pub decision_id: String,
    pub schema_version: String,
    pub session_id: u32,
    pub delegate_task_id: String,
    pub completion_task_id: String,
    pub validation_task_ids: Vec<String>,
    pub objective_hash: String,
    pub output_hash: String,
    pub composite_confidence: f64,
    pub threshold_applied: f64,
    pub escalation_path: Vec<u32>,
    pub final_verdict: Verdict,
    pub created_at: String,
    pub validator_summary: Vec<ValidatorRunSummary>,
}

impl DecisionArtifact {
    pub fn canonical_bytes(&self) -> FirewallResult<Vec<u8>> {
        canonical_json(self)
    }

    pub fn canonical_hash(&self) -> FirewallResult<String> {
        canonical_hash(self)
    }
}

/// Everything a run produced that goes into an artifact.
#[derive(Clone, Debug)]
pub struct ArtifactInputs<'a> {
    pub schema_version: &'a str,
    pub session_id: u32,
    pub delegate_task_id: &'a str,
    pub completion_task_id: &'a str,
    pub validation_task_ids: &'a [String],
    pub objective: &'a str,
    pub output: &'a str,
    pub composite_confidence: f64,
    pub threshold: f64,
    pub escalation_path: &'a [u32],
    pub verdict: Verdict,
    pub validator_summary: &'a [ValidatorRunSummary],
}

pub struct ArtifactBuilder;

impl ArtifactBuilder {
    /// Build with a fresh decision id and the current UTC time.
    pub fn build(inputs: &ArtifactInputs<'_>) -> DecisionArtifact {
        Self::build_with(Uuid::new_v4().to_string(), Utc::now(), inputs)
    }

    /// Build with an explicit id and timestamp. Pure.
    pub fn build_with(
        decision_id: String,
        created_at: DateTime<Utc>,
        inputs: &ArtifactInputs<'_>,
    ) -> DecisionArtifact {
        DecisionArtifact {
            decision_id,
            schema_version: inputs.schema_version.to_string(),
            session_id: inputs.session_id,
            delegate_task_id: inputs.delegate_task_id.to_string(),
            completion_task_id: inputs.completion_task_id.to_string(),
            validation_task_ids: inputs.validation_task_ids.to_vec(),
            objective_hash: sha256_hex(inputs.objective.as_bytes()),
            output_hash: sha256_hex(inputs.output.as_bytes()),
            composite_confidence: inputs.composite_confidence,
            threshold_applied: inputs.threshold,
            escalation_path: inputs.escalation_path.to_vec(),
            final_verdict: inputs.verdict,
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            validator_summary: inputs.validator_summary.to_vec(),
        }
    }
}

/// Compact JSON with keys sorted at every depth.
pub fn canonical_json(v: &impl Serialize) -> FirewallResult<Vec<u8>> {
    let value =
        serde_json::to_value(v).map_err(|e| FirewallError::Canonicalization(e.to_string()))?;
    serde_json::to_vec(&sort_json(value)).map_err(|e| FirewallError::Canonicalization(e.to_string()))
}

fn sort_json(v: Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (k, val) in entries {
                sorted.insert(k, sort_json(val));
            }
            Value::Object(sorted)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(sort_json).collect()),
        other => other,
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(data);
    hex::encode(h.finalize())
}

/// Hex SHA-256 of the canonical serialization.
pub fn canonical_hash(v: &impl Serialize) -> FirewallResult<String> {
    Ok(sha256_hex(&canonical_json(v)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sentinel_core::{score_panel, ValidatorJudgment};

    fn inputs<'a>(
        task_ids: &'a [String],
        path: &'a [u32],
        runs: &'a [ValidatorRunSummary],
    ) -> ArtifactInputs<'a> {
        ArtifactInputs {
            schema_version: "sentinel.artifact.v1",
            session_id: 78,
            delegate_task_id: "d-1",
            completion_task_id: "c-1",
            validation_task_ids: task_ids,
            objective: "Approve $50,000 treasury allocation",
            output: "Approved with controls.",
            composite_confidence: 0.91,
            threshold: 0.85,
            escalation_path: path,
            verdict: Verdict::Accept,
            validator_summary: runs,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).single().expect("time")
    }

    #[test]
    fn identical_inputs_give_identical_bytes() {
        let ids = vec!["v-3".to_string(), "v-5".to_string()];
        let path = [3, 5];
        let a = ArtifactBuilder::build_with("dec-1".into(), fixed_time(), &inputs(&ids, &path, &[]));
        let b = ArtifactBuilder::build_with("dec-1".into(), fixed_time(), &inputs(&ids, &path, &[]));
        assert_eq!(a.canonical_bytes().expect("a"), b.canonical_bytes().expect("b"));
        assert_eq!(a.canonical_hash().expect("a"), b.canonical_hash().expect("b"));
        assert_eq!(a.created_at, "2026-01-02T03:04:05.000000Z");
    }

    #[test]
    fn raw_text_never_lands_in_the_artifact() {
        let a = ArtifactBuilder::build(&inputs(&[], &[1], &[]));
        let bytes = String::from_utf8(a.canonical_bytes().expect("bytes")).expect("utf8");
        assert!(!bytes.contains("treasury"));
        assert!(!bytes.contains("Approved with controls"));
        assert_eq!(a.objective_hash, sha256_hex("Approve $50,000 treasury allocation".as_bytes()));
        assert_eq!(a.objective_hash.len(), 64);
    }

    #[test]
    fn canonical_form_is_sorted_and_compact() {
        let v = serde_json::json!({"z": 1, "a": {"y": [ {"b": 1, "a": 2} ], "x": 0}});
        let bytes = canonical_json(&v).expect("json");
        assert_eq!(bytes, br#"{"a":{"x":0,"y":[{"a":2,"b":1}]},"z":1}"#.to_vec());
    }

    #[test]
    fn fresh_builds_get_distinct_ids() {
        let a = ArtifactBuilder::build(&inputs(&[], &[1], &[]));
        let b = ArtifactBuilder::build(&inputs(&[], &[1], &[]));
        assert_ne!(a.decision_id, b.decision_id);
    }

    #[test]
    fn summary_rows_fill_unknowns() {
        let judgments = vec![ValidatorJudgment::default(), ValidatorJudgment::scored(true, 0.7)];
        let score = score_panel(&judgments);
        let attempt = EscalationAttempt::new(3, judgments, score);
        let rows = ValidatorRunSummary::from_attempt(&attempt);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].validator_id, "unknown");
        assert!(!rows[0].valid);
        assert_eq!(rows[1].confidence_score, 0.7);
        assert!(rows.iter().all(|r| r.redundancy_level == 3));
    }
}
