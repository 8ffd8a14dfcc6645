//! Drives the escalation ladder against the validation collaborator.
//!
//! Levels run strictly one at a time in plan order: whether to continue
//! depends on the previous level's score.

use sentinel_core::{
    normalize_panel, sufficient_judgments, EscalationLadder, LadderOutcome, LadderStep,
    SentinelCfg, TierPolicy,
};

use crate::adapter::{validation_task_id, RouterClient};
use crate::error::FirewallResult;
use crate::run::RunState;

pub struct EscalationController<'a> {
    cfg: &'a SentinelCfg,
    router: &'a dyn RouterClient,
}

impl<'a> EscalationController<'a> {
    pub fn new(cfg: &'a SentinelCfg, router: &'a dyn RouterClient) -> Self {
        Self { cfg, router }
    }

    /// Walk `policy`'s plan until a level meets the threshold or the plan is
    /// exhausted. Every attempted level lands in `run`'s history. A failed
    /// validation call aborts the run.
    pub async fn run(
        &self,
        run: &mut RunState,
        policy: TierPolicy,
        output: &str,
    ) -> FirewallResult<LadderOutcome> {
        let threshold = policy.threshold;
        let mut ladder = EscalationLadder::new(policy);

        while let Some(level) = ladder.pending_level() {
            let session = self.cfg.validation_session(level);
            let response = self
                .router
                .validate(session, level, &run.objective, output)
                .await?;

            let judgments = normalize_panel(&response);
            if !sufficient_judgments(&judgments, self.cfg.min_judgments) {
                tracing::warn!(
                    trace_id = %run.trace_id,
                    level,
                    received = judgments.len(),
                    required = self.cfg.min_judgments,
                    "validator panel returned too few usable judgments"
                );
            }

            let step = ladder.record(level, judgments)?;
            if let Some(attempt) = ladder.history().last() {
                tracing::info!(
                    trace_id = %run.trace_id,
                    level,
                    session,
                    agreement = attempt.agreement,
                    mean_confidence = attempt.mean_confidence,
                    composite = attempt.composite_confidence,
                    threshold,
                    step = ?step,
                    "escalation level scored"
                );
                run.record_attempt(validation_task_id(&response), attempt.clone());
            }

            match step {
                LadderStep::Accept | LadderStep::Exhausted => break,
                LadderStep::Next(_) => continue,
            }
        }

        let outcome = ladder.finish()?;
        run.verdict = Some(outcome.verdict);
        run.confidence = outcome.composite;
        run.reason = outcome.reason.clone();
        Ok(outcome)
    }
}
