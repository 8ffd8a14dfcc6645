//! Collaborator seams: the router (delegation, completion, validation) and
//! the decision store.
//!
//! The router speaks raw JSON; this module turns its responses into typed
//! values and is the only place that knows about alternate response shapes.
//! Scoring never sees a raw response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::artifact::ValidatorRunSummary;
use crate::error::{CollaboratorError, FirewallError, FirewallResult, StoreError};

/// The external generation/validation service.
///
/// One method per collaborator contract. Implementations own transport,
/// retries and timeouts; any `Err` is fatal for the current run.
#[async_trait]
pub trait RouterClient: Send + Sync {
    /// Ask for a risk-tiered execution plan for `objective`.
    async fn delegate(&self, session_id: u32, objective: &str) -> Result<Value, CollaboratorError>;

    /// Produce the candidate output for `objective`.
    async fn complete(&self, session_id: u32, objective: &str) -> Result<Value, CollaboratorError>;

    /// Run a validator panel of `level` validators over `output`.
    async fn validate(
        &self,
        session_id: u32,
        level: u32,
        objective: &str,
        output: &str,
    ) -> Result<Value, CollaboratorError>;
}

/// Row written for every completed, signed decision.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_id: String,
    pub schema_version: String,
    pub session_id: u32,
    pub delegate_task_id: String,
    pub completion_task_id: String,
    pub composite_confidence: f64,
    pub threshold_applied: f64,
    pub final_verdict: String,
    pub escalation_path: Vec<u32>,
    pub artifact_hash: String,
    pub signature: String,
    pub created_at: String,
}

/// Persistence collaborator. Writes happen only after signing.
#[async_trait]
pub trait DecisionStore: Send + Sync {
    async fn insert_decision(&self, record: &DecisionRecord) -> Result<(), StoreError>;

    async fn insert_validator_runs(
        &self,
        decision_id: &str,
        runs: &[ValidatorRunSummary],
    ) -> Result<(), StoreError>;

    async fn get_decision(&self, decision_id: &str) -> Result<Option<DecisionRecord>, StoreError>;

    /// Most recent first. `limit` above 100 is rejected.
    async fn list_recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, StoreError>;
}

fn is_empty_response(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Object(m) => m.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn task_id_of(v: &Value) -> String {
    match v.get("task_id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => Uuid::new_v4().to_string(),
    }
}

/// Task id reported by a validation response, or a fresh one.
pub fn validation_task_id(response: &Value) -> String {
    task_id_of(response)
}

/// Non-null value at `pointer`.
fn present<'a>(v: &'a Value, pointer: &str) -> Option<&'a Value> {
    v.pointer(pointer).filter(|x| !x.is_null())
}

/// Redundancy as a whole number; `5` and `5.0` are the same recommendation.
fn as_redundancy(v: &Value) -> Option<u32> {
    if let Some(n) = v.as_u64() {
        return u32::try_from(n).ok();
    }
    let f = v.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)?;
    Some(f as u32)
}

/// The delegate's plan for this objective.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelegatePlan {
    pub task_id: String,
    pub recommended_redundancy: u32,
    pub risk_level: Option<String>,
}

impl DelegatePlan {
    pub fn from_response(v: &Value) -> FirewallResult<Self> {
        if is_empty_response(v) || !v.is_object() {
            return Err(FirewallError::UpstreamEmpty("empty delegate response".into()));
        }

        let recommended_redundancy = present(v, "/recommended_redundancy")
            .and_then(as_redundancy)
            .or_else(|| present(v, "/cortensor_policy/redundancy").and_then(as_redundancy))
            .unwrap_or(1);

        let risk_level = ["/risk_level", "/risk_assessment/risk_level"]
            .iter()
            .find_map(|p| v.pointer(p).and_then(Value::as_str))
            .map(str::to_string);

        Ok(Self {
            task_id: task_id_of(v),
            recommended_redundancy,
            risk_level,
        })
    }
}

/// The candidate output to be validated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionOutput {
    pub task_id: String,
    pub output_text: String,
}

impl CompletionOutput {
    pub fn from_response(v: &Value) -> FirewallResult<Self> {
        let text = ["/output_text", "/output", "/choices/0/text", "/data"]
            .iter()
            .find_map(|p| {
                v.pointer(p)
                    .and_then(Value::as_str)
                    .filter(|s| !s.trim().is_empty())
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(FirewallError::UpstreamEmpty("empty completion output".into()));
        }

        Ok(Self {
            task_id: task_id_of(v),
            output_text: text.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{resolve_tier, RiskTier, SentinelCfg};
    use serde_json::json;

    #[test]
    fn delegate_reads_router_policy_block() {
        let p = DelegatePlan::from_response(&json!({
            "task_id": "d-1",
            "cortensor_policy": {"redundancy": 5},
            "risk_assessment": {"risk_level": "high"}
        }))
        .expect("plan");
        assert_eq!(p.task_id, "d-1");
        assert_eq!(p.recommended_redundancy, 5);
        assert_eq!(p.risk_level.as_deref(), Some("high"));
    }

    #[test]
    fn integral_float_redundancy_keeps_its_tier() {
        let high = DelegatePlan::from_response(&json!({"cortensor_policy": {"redundancy": 5.0}}))
            .expect("plan");
        assert_eq!(high.recommended_redundancy, 5);
        let policy = resolve_tier(high.recommended_redundancy, &SentinelCfg::default()).expect("tier");
        assert_eq!(policy.tier, RiskTier::High);
        assert_eq!(policy.threshold, 0.85);
        assert_eq!(policy.plan.levels(), &[3, 5]);

        let p = DelegatePlan::from_response(&json!({"recommended_redundancy": 3.0})).expect("plan");
        assert_eq!(p.recommended_redundancy, 3);
    }

    #[test]
    fn null_top_level_redundancy_falls_through_to_policy_block() {
        let p = DelegatePlan::from_response(&json!({
            "recommended_redundancy": null,
            "risk_level": null,
            "cortensor_policy": {"redundancy": 5},
            "risk_assessment": {"risk_level": "high"}
        }))
        .expect("plan");
        assert_eq!(p.recommended_redundancy, 5);
        assert_eq!(p.risk_level.as_deref(), Some("high"));
    }

    #[test]
    fn fractional_or_negative_redundancy_is_not_a_level() {
        for bad in [json!(4.5), json!(-5), json!("five")] {
            let p = DelegatePlan::from_response(&json!({"recommended_redundancy": bad}))
                .expect("plan");
            assert_eq!(p.recommended_redundancy, 1);
        }
    }

    #[test]
    fn delegate_defaults_to_redundancy_one() {
        let p = DelegatePlan::from_response(&json!({"status": "ok"})).expect("plan");
        assert_eq!(p.recommended_redundancy, 1);
        assert!(Uuid::parse_str(&p.task_id).is_ok());
    }

    #[test]
    fn empty_delegate_is_fatal() {
        for v in [json!(null), json!({}), json!([])] {
            assert!(matches!(
                DelegatePlan::from_response(&v),
                Err(FirewallError::UpstreamEmpty(_))
            ));
        }
    }

    #[test]
    fn completion_shapes() {
        let a = CompletionOutput::from_response(&json!({"task_id": 7, "output": "ok"})).expect("a");
        assert_eq!((a.task_id.as_str(), a.output_text.as_str()), ("7", "ok"));

        let b = CompletionOutput::from_response(&json!({"choices": [{"text": "from choices"}]}))
            .expect("b");
        assert_eq!(b.output_text, "from choices");

        let c = CompletionOutput::from_response(&json!({"data": "raw"})).expect("c");
        assert_eq!(c.output_text, "raw");

        let d = CompletionOutput::from_response(&json!({"output_text": "", "output": "real"}))
            .expect("d");
        assert_eq!(d.output_text, "real");
    }

    #[test]
    fn empty_completion_is_fatal() {
        for v in [json!({"output": "  "}), json!({"choices": []}), json!(null)] {
            assert!(matches!(
                CompletionOutput::from_response(&v),
                Err(FirewallError::UpstreamEmpty(_))
            ));
        }
    }
}
