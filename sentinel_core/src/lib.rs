pub mod judgment;
pub mod trust;

pub mod cfg;
pub mod risk;
pub mod state;
pub mod decide;

pub use judgment::{ValidatorJudgment, normalize_panel};
pub use trust::{
    ConfidenceBand, PanelScore, AGREEMENT_WEIGHT, CONFIDENCE_WEIGHT,
    weighted_agreement, mean_confidence, composite_confidence, confidence_band,
    sufficient_judgments, usable_judgments, score_panel, round3,
};
pub use cfg::{SentinelCfg, TierRule, TierTable, CfgError, SCHEMA_VERSION};
pub use risk::{
    RiskTier, EscalationPlan, TierPolicy, PlanError, RiskAssessment, resolve_tier, assess_objective,
};
pub use state::{EscalationAttempt, escalation_path};
pub use decide::{
    Verdict, EscalationLadder, LadderState, LadderStep, LadderOutcome, LadderError,
    exhausted_verdict, acceptance_reason,
};
