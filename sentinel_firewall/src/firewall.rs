//! The `evaluate` entry point.
//!
//! objective -> delegate plan -> completion -> escalation/scoring -> artifact
//! -> signature -> persistence -> response. Each step runs after the previous
//! one finishes; no partial artifact is built when delegation or completion
//! fails.

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::Instrument;

use sentinel_core::{
    assess_objective, confidence_band, resolve_tier, ConfidenceBand, SentinelCfg, Verdict,
};

use crate::adapter::{CompletionOutput, DecisionRecord, DecisionStore, DelegatePlan, RouterClient};
use crate::artifact::{ArtifactBuilder, ArtifactInputs, ValidatorRunSummary};
use crate::controller::EscalationController;
use crate::error::{FirewallError, FirewallResult, StoreError};
use crate::run::RunState;
use crate::signing::{ArtifactSigner, SignedArtifact};

/// Result of one completed evaluation. FAIL and MANUAL_REVIEW are successful
/// runs with a negative outcome; they still carry a signed artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub output: String,
    pub final_verdict: Verdict,
    pub confidence: f64,
    pub band: ConfidenceBand,
    pub total_attempts: usize,
    pub escalation_path: Vec<u32>,
    pub total_latency_ms: f64,
    pub decision_reason: String,
    pub threshold: f64,
    pub risk_level: String,
    pub validator_runs: Vec<ValidatorRunSummary>,
    pub signed: SignedArtifact,
}

impl Evaluation {
    pub fn decision_id(&self) -> &str {
        &self.signed.artifact.decision_id
    }

    /// Run `action` only when the verdict is ACCEPT.
    pub async fn enforce<F, Fut, T>(&self, action: F) -> FirewallResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        match self.final_verdict {
            Verdict::Accept => Ok(action().await),
            Verdict::Fail | Verdict::Escalate | Verdict::ManualReview | Verdict::Block => {
                Err(FirewallError::Blocked {
                    verdict: self.final_verdict,
                    reason: self.decision_reason.clone(),
                })
            }
        }
    }
}

/// The trust firewall. Holds only read-only shared state, so one instance
/// can serve concurrent evaluations.
pub struct Firewall {
    cfg: SentinelCfg,
    router: Arc<dyn RouterClient>,
    store: Arc<dyn DecisionStore>,
    signer: Arc<ArtifactSigner>,
}

impl Firewall {
    pub fn new(
        cfg: SentinelCfg,
        router: Arc<dyn RouterClient>,
        store: Arc<dyn DecisionStore>,
        signer: Arc<ArtifactSigner>,
    ) -> FirewallResult<Self> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            router,
            store,
            signer,
        })
    }

    pub fn cfg(&self) -> &SentinelCfg {
        &self.cfg
    }

    pub fn public_key_hex(&self) -> String {
        self.signer.public_key_hex()
    }

    pub async fn evaluate(&self, objective: &str) -> FirewallResult<Evaluation> {
        let mut run = RunState::new(objective);
        let span = tracing::info_span!("evaluate", trace_id = %run.trace_id);
        self.evaluate_run(&mut run).instrument(span).await
    }

    async fn evaluate_run(&self, run: &mut RunState) -> FirewallResult<Evaluation> {
        // 1) Delegate first.
        let raw = self
            .router
            .delegate(self.cfg.delegate_session, &run.objective)
            .await?;
        let plan = DelegatePlan::from_response(&raw)?;
        tracing::info!(
            task_id = %plan.task_id,
            recommended_redundancy = plan.recommended_redundancy,
            "delegate plan received"
        );
        let recommendation = plan.recommended_redundancy;
        let delegate_task_id = plan.task_id.clone();
        let risk_level = plan
            .risk_level
            .clone()
            .unwrap_or_else(|| assess_objective(&run.objective).level.as_str().to_string());
        run.record_delegate(plan);

        // 2) Completion.
        let raw = self
            .router
            .complete(self.cfg.completion_session, &run.objective)
            .await?;
        let completion = CompletionOutput::from_response(&raw)?;
        tracing::info!(task_id = %completion.task_id, "completion received");
        let output = completion.output_text.clone();
        let completion_task_id = completion.task_id.clone();
        run.record_completion(completion);

        // 3) Escalation ladder.
        let policy = resolve_tier(recommendation, &self.cfg)?;
        run.policy = Some(policy.clone());
        let outcome = EscalationController::new(&self.cfg, self.router.as_ref())
            .run(run, policy, &output)
            .await?;
        tracing::info!(
            verdict = %outcome.verdict,
            confidence = outcome.composite,
            threshold = outcome.threshold,
            attempts = outcome.history.len(),
            "verdict reached"
        );

        // 4) Artifact + signature.
        let escalation_path = run.escalation_path();
        let artifact = ArtifactBuilder::build(&ArtifactInputs {
            schema_version: &self.cfg.schema_version,
            session_id: self.cfg.delegate_session,
            delegate_task_id: &delegate_task_id,
            completion_task_id: &completion_task_id,
            validation_task_ids: &run.validation_task_ids,
            objective: &run.objective,
            output: &output,
            composite_confidence: outcome.composite,
            threshold: outcome.threshold,
            escalation_path: &escalation_path,
            verdict: outcome.verdict,
            validator_summary: &run.validator_runs,
        });
        let signed = SignedArtifact::seal(artifact, &self.signer)?;
        tracing::info!(
            decision_id = %signed.artifact.decision_id,
            artifact_hash = %signed.artifact_hash,
            "artifact signed"
        );

        let evaluation = Evaluation {
            output,
            final_verdict: outcome.verdict,
            confidence: outcome.composite,
            band: confidence_band(outcome.composite),
            total_attempts: escalation_path.len(),
            escalation_path,
            total_latency_ms: run.elapsed_ms(),
            decision_reason: outcome.reason,
            threshold: outcome.threshold,
            risk_level,
            validator_runs: run.validator_runs.clone(),
            signed,
        };

        // 5) Persist. A failed write does not undo the verdict.
        if let Err(source) = self.persist(&evaluation).await {
            tracing::warn!(
                decision_id = %evaluation.decision_id(),
                error = %source,
                "persisting decision failed"
            );
            return Err(FirewallError::Persistence {
                source,
                evaluation: Box::new(evaluation),
            });
        }

        Ok(evaluation)
    }

    async fn persist(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let signed = &evaluation.signed;
        let a = &signed.artifact;
        let record = DecisionRecord {
            decision_id: a.decision_id.clone(),
            schema_version: a.schema_version.clone(),
            session_id: a.session_id,
            delegate_task_id: a.delegate_task_id.clone(),
            completion_task_id: a.completion_task_id.clone(),
            composite_confidence: a.composite_confidence,
            threshold_applied: a.threshold_applied,
            final_verdict: a.final_verdict.as_str().to_string(),
            escalation_path: a.escalation_path.clone(),
            artifact_hash: signed.artifact_hash.clone(),
            signature: signed.signature.clone(),
            created_at: a.created_at.clone(),
        };
        self.store.insert_decision(&record).await?;
        self.store
            .insert_validator_runs(&a.decision_id, &a.validator_summary)
            .await
    }
}
