use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cfg::SentinelCfg;

/// Stakes of a decision, resolved once from the delegate's recommendation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// 5 -> High, 3 -> Medium, anything else (including 1) -> Low.
    pub fn from_redundancy(recommendation: u32) -> Self {
        match recommendation {
            5 => RiskTier::High,
            3 => RiskTier::Medium,
            _ => RiskTier::Low,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low",
            RiskTier::Medium => "medium",
            RiskTier::High => "high",
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("escalation plan must not be empty")]
    Empty,
}

/// Ordered, non-empty redundancy levels to attempt.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<u32>", into = "Vec<u32>")]
pub struct EscalationPlan(Vec<u32>);

impl EscalationPlan {
    pub fn new(levels: Vec<u32>) -> Result<Self, PlanError> {
        if levels.is_empty() {
            return Err(PlanError::Empty);
        }
        Ok(Self(levels))
    }

    pub fn levels(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> u32 {
        self.0[0]
    }
}

impl TryFrom<Vec<u32>> for EscalationPlan {
    type Error = PlanError;
    fn try_from(levels: Vec<u32>) -> Result<Self, Self::Error> {
        Self::new(levels)
    }
}

impl From<EscalationPlan> for Vec<u32> {
    fn from(plan: EscalationPlan) -> Self {
        plan.0
    }
}

/// Threshold and ladder fixed for the whole run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierPolicy {
    pub tier: RiskTier,
    pub recommendation: u32,
    pub threshold: f64,
    pub plan: EscalationPlan,
}

/// Map the delegate's redundancy recommendation to a threshold and plan.
pub fn resolve_tier(recommendation: u32, cfg: &SentinelCfg) -> Result<TierPolicy, PlanError> {
    let tier = RiskTier::from_redundancy(recommendation);
    let rule = cfg.tiers.rule(tier);
    Ok(TierPolicy {
        tier,
        recommendation,
        threshold: rule.threshold,
        plan: EscalationPlan::new(rule.plan.clone())?,
    })
}

// ---------------------------------------------------------------------
// Keyword heuristic over the raw objective. Only used to report a risk
// level when the delegate supplies none; never feeds thresholds.
// ---------------------------------------------------------------------

const RISK_SIGNALS: &[(&str, f64)] = &[
    ("financial", 0.3),
    ("legal", 0.4),
    ("regulatory", 0.4),
    ("irreversible", 0.3),
    ("liability", 0.4),
    ("investment", 0.3),
    ("compliance", 0.4),
    ("tokenomics", 0.3),
    ("contract", 0.3),
    ("governance", 0.3),
];

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskTier,
    pub score: f64,
    pub factors: Vec<String>,
}

pub fn assess_objective(objective: &str) -> RiskAssessment {
    let lo = objective.to_lowercase();
    let mut score = 0.0_f64;
    let mut factors = Vec::new();

    for (keyword, weight) in RISK_SIGNALS {
        if lo.contains(keyword) {
            score += weight;
            factors.push((*keyword).to_string());
        }
    }

    let level = if score < 0.3 {
        RiskTier::Low
    } else if score < 0.7 {
        RiskTier::Medium
    } else {
        RiskTier::High
    };

    // The raw sum can exceed 1.0, so round without clamping.
    RiskAssessment {
        level,
        score: (score * 1000.0).round() / 1000.0,
        factors,
    }
}
