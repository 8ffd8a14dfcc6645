use std::time::Instant;

use uuid::Uuid;

use sentinel_core::{EscalationAttempt, TierPolicy, Verdict};

use crate::adapter::{CompletionOutput, DelegatePlan};
use crate::artifact::ValidatorRunSummary;

/// Per-evaluation bookkeeping. Owned by exactly one `evaluate` call, passed
/// down by `&mut`, and dropped when the response is returned.
#[derive(Debug)]
pub struct RunState {
    pub trace_id: Uuid,
    started: Instant,
    pub objective: String,
    pub delegate: Option<DelegatePlan>,
    pub completion: Option<CompletionOutput>,
    pub policy: Option<TierPolicy>,
    pub history: Vec<EscalationAttempt>,
    pub validation_task_ids: Vec<String>,
    pub validator_runs: Vec<ValidatorRunSummary>,
    pub verdict: Option<Verdict>,
    pub confidence: f64,
    pub reason: String,
}

impl RunState {
    pub fn new(objective: impl Into<String>) -> Self {
        Self {
            trace_id: Uuid::new_v4(),
            started: Instant::now(),
            objective: objective.into(),
            delegate: None,
            completion: None,
            policy: None,
            history: Vec::new(),
            validation_task_ids: Vec::new(),
            validator_runs: Vec::new(),
            verdict: None,
            confidence: 0.0,
            reason: String::new(),
        }
    }

    pub fn record_delegate(&mut self, plan: DelegatePlan) {
        self.delegate = Some(plan);
    }

    pub fn record_completion(&mut self, output: CompletionOutput) {
        self.completion = Some(output);
    }

    /// Append one level's outcome to the audit trail.
    pub fn record_attempt(&mut self, task_id: String, attempt: EscalationAttempt) {
        self.validation_task_ids.push(task_id);
        self.validator_runs
            .extend(ValidatorRunSummary::from_attempt(&attempt));
        self.history.push(attempt);
    }

    pub fn escalation_path(&self) -> Vec<u32> {
        sentinel_core::escalation_path(&self.history)
    }

    /// Milliseconds since the run started, rounded to 2 decimals.
    pub fn elapsed_ms(&self) -> f64 {
        let ms = self.started.elapsed().as_secs_f64() * 1000.0;
        (ms * 100.0).round() / 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::{score_panel, ValidatorJudgment};

    #[test]
    fn attempts_accumulate_in_order() {
        let mut run = RunState::new("objective");
        for level in [1, 3] {
            let judgments = vec![ValidatorJudgment::scored(true, 0.2)];
            let score = score_panel(&judgments);
            run.record_attempt(format!("v-{level}"), EscalationAttempt::new(level, judgments, score));
        }
        assert_eq!(run.escalation_path(), vec![1, 3]);
        assert_eq!(run.validation_task_ids, vec!["v-1", "v-3"]);
        assert_eq!(run.validator_runs.len(), 2);
        assert!(run.elapsed_ms() >= 0.0);
    }

    #[test]
    fn runs_get_distinct_trace_ids() {
        assert_ne!(RunState::new("a").trace_id, RunState::new("a").trace_id);
    }
}
