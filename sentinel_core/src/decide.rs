use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::judgment::ValidatorJudgment;
use crate::risk::{RiskTier, TierPolicy};
use crate::state::{escalation_path, EscalationAttempt};
use crate::trust::score_panel;

/// Final (or intermediate) outcome of a decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accept,
    Fail,
    Escalate,
    ManualReview,
    Block,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Fail => "FAIL",
            Verdict::Escalate => "ESCALATE",
            Verdict::ManualReview => "MANUAL_REVIEW",
            Verdict::Block => "BLOCK",
        }
    }

    pub fn is_terminal(self) -> bool {
        match self {
            Verdict::Accept | Verdict::Fail | Verdict::ManualReview | Verdict::Block => true,
            Verdict::Escalate => false,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict when every planned level was tried without meeting the threshold.
/// High-stakes tiers go to a human; low-stakes ones fail closed.
pub fn exhausted_verdict(tier: RiskTier) -> (Verdict, &'static str) {
    match tier {
        RiskTier::High => (Verdict::ManualReview, "Oracle-grade threshold not satisfied."),
        RiskTier::Medium => (Verdict::ManualReview, "Balanced-tier threshold not satisfied."),
        RiskTier::Low => (Verdict::Fail, "Low-tier validation failed all levels."),
    }
}

/// Scores keep a trailing `.0` when integral ("1.0", not "1").
pub fn acceptance_reason(composite: f64, threshold: f64) -> String {
    format!("confidence {composite:?} >= threshold {threshold:?}")
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LadderState {
    Pending(u32),
    Accepted { level: u32, composite: f64 },
    Exhausted,
}

/// What the driver should do after a level was recorded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LadderStep {
    Accept,
    Next(u32),
    Exhausted,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LadderError {
    #[error("ladder already terminal")]
    Terminal,
    #[error("expected redundancy level {expected}, got {got}")]
    OutOfOrder { expected: u32, got: u32 },
    #[error("ladder has not reached a terminal state")]
    Unfinished,
}

/// Terminal result of a ladder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LadderOutcome {
    pub verdict: Verdict,
    /// Composite of the last attempted level.
    pub composite: f64,
    pub threshold: f64,
    pub reason: String,
    pub history: Vec<EscalationAttempt>,
}

impl LadderOutcome {
    pub fn escalation_path(&self) -> Vec<u32> {
        escalation_path(&self.history)
    }
}

/// The escalation state machine for one run.
///
/// `Pending(level) -> Accepted | Pending(next) | Exhausted`. Scoring a level
/// and choosing the transition happen inside one `record` call; the scored
/// composite is kept on the appended `EscalationAttempt`.
/// The policy is fixed at construction; the history only grows.
#[derive(Clone, Debug)]
pub struct EscalationLadder {
    policy: TierPolicy,
    cursor: usize,
    state: LadderState,
    history: Vec<EscalationAttempt>,
}

impl EscalationLadder {
    pub fn new(policy: TierPolicy) -> Self {
        let first = policy.plan.first();
        Self {
            policy,
            cursor: 0,
            state: LadderState::Pending(first),
            history: Vec::new(),
        }
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    pub fn state(&self) -> LadderState {
        self.state
    }

    pub fn history(&self) -> &[EscalationAttempt] {
        &self.history
    }

    /// Level awaiting a validator panel, if any.
    pub fn pending_level(&self) -> Option<u32> {
        match self.state {
            LadderState::Pending(level) => Some(level),
            _ => None,
        }
    }

    /// Score a panel for the pending level and advance.
    pub fn record(
        &mut self,
        level: u32,
        judgments: Vec<ValidatorJudgment>,
    ) -> Result<LadderStep, LadderError> {
        let expected = match self.state {
            LadderState::Pending(l) => l,
            _ => return Err(LadderError::Terminal),
        };
        if level != expected {
            return Err(LadderError::OutOfOrder { expected, got: level });
        }

        let score = score_panel(&judgments);
        let composite = score.composite;
        self.history
            .push(EscalationAttempt::new(level, judgments, score));

        if composite >= self.policy.threshold {
            self.state = LadderState::Accepted { level, composite };
            return Ok(LadderStep::Accept);
        }

        self.cursor += 1;
        match self.policy.plan.levels().get(self.cursor) {
            Some(&next) => {
                self.state = LadderState::Pending(next);
                Ok(LadderStep::Next(next))
            }
            None => {
                self.state = LadderState::Exhausted;
                Ok(LadderStep::Exhausted)
            }
        }
    }

    /// Consume a terminal ladder into its outcome.
    pub fn finish(self) -> Result<LadderOutcome, LadderError> {
        let threshold = self.policy.threshold;
        let last = self
            .history
            .last()
            .map(|a| a.composite_confidence)
            .unwrap_or(0.0);

        let (verdict, reason) = match self.state {
            LadderState::Accepted { composite, .. } => {
                (Verdict::Accept, acceptance_reason(composite, threshold))
            }
            LadderState::Exhausted => {
                let (v, r) = exhausted_verdict(self.policy.tier);
                (v, r.to_string())
            }
            LadderState::Pending(_) => {
                return Err(LadderError::Unfinished)
            }
        };

        Ok(LadderOutcome {
            verdict,
            composite: last,
            threshold,
            reason,
            history: self.history,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::SentinelCfg;
    use crate::risk::resolve_tier;

    fn panel(c: f64) -> Vec<ValidatorJudgment> {
        vec![ValidatorJudgment::scored(true, c)]
    }

    fn ladder(recommendation: u32) -> EscalationLadder {
        EscalationLadder::new(resolve_tier(recommendation, &SentinelCfg::default()).expect("tier"))
    }

    #[test]
    fn verdict_wire_names() {
        assert_eq!(
            serde_json::to_string(&Verdict::ManualReview).expect("json"),
            "\"MANUAL_REVIEW\""
        );
        assert_eq!(Verdict::Accept.to_string(), "ACCEPT");
        assert!(!Verdict::Escalate.is_terminal());
    }

    #[test]
    fn immediate_acceptance_has_single_step_path() {
        let mut l = ladder(1);
        assert_eq!(l.pending_level(), Some(1));
        assert_eq!(l.record(1, panel(0.9)), Ok(LadderStep::Accept));
        let out = l.finish().expect("finish");
        assert_eq!(out.verdict, Verdict::Accept);
        assert_eq!(out.escalation_path(), vec![1]);
        assert_eq!(out.reason, "confidence 0.96 >= threshold 0.5");
    }

    #[test]
    fn integral_scores_keep_their_decimal_point() {
        assert_eq!(acceptance_reason(1.0, 0.5), "confidence 1.0 >= threshold 0.5");
        assert_eq!(acceptance_reason(0.806, 0.65), "confidence 0.806 >= threshold 0.65");

        let mut l = ladder(1);
        assert_eq!(l.record(1, panel(1.0)), Ok(LadderStep::Accept));
        assert_eq!(l.finish().expect("finish").reason, "confidence 1.0 >= threshold 0.5");
    }

    #[test]
    fn record_moves_straight_to_the_next_state() {
        let mut l = ladder(5);
        assert_eq!(l.record(3, panel(0.2)), Ok(LadderStep::Next(5)));
        assert_eq!(l.state(), LadderState::Pending(5));
        assert_eq!(l.history()[0].composite_confidence, 0.68);
        assert_eq!(l.record(5, panel(0.9)), Ok(LadderStep::Accept));
        assert_eq!(l.state(), LadderState::Accepted { level: 5, composite: 0.96 });
    }

    #[test]
    fn exhausted_low_tier_fails() {
        let mut l = ladder(1);
        assert_eq!(l.record(1, vec![]), Ok(LadderStep::Next(3)));
        assert_eq!(l.record(3, vec![]), Ok(LadderStep::Next(5)));
        assert_eq!(l.record(5, vec![]), Ok(LadderStep::Exhausted));
        let out = l.finish().expect("finish");
        assert_eq!(out.verdict, Verdict::Fail);
        assert_eq!(out.escalation_path(), vec![1, 3, 5]);
        assert_eq!(out.composite, 0.0);
    }

    #[test]
    fn exhausted_high_stakes_goes_to_manual_review() {
        for rec in [3, 5] {
            let mut l = ladder(rec);
            l.record(3, panel(0.1)).expect("3");
            assert_eq!(l.record(5, panel(0.1)), Ok(LadderStep::Exhausted));
            let out = l.finish().expect("finish");
            assert_eq!(out.verdict, Verdict::ManualReview);
            assert_eq!(out.escalation_path(), vec![3, 5]);
        }
    }

    #[test]
    fn misuse_is_reported() {
        let mut l = ladder(5);
        assert_eq!(
            l.record(5, panel(0.9)),
            Err(LadderError::OutOfOrder { expected: 3, got: 5 })
        );
        assert!(matches!(l.clone().finish(), Err(LadderError::Unfinished)));
        l.record(3, panel(1.0)).expect("accept");
        assert_eq!(l.record(5, panel(1.0)), Err(LadderError::Terminal));
    }
}
