use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::risk::RiskTier;

/// Schema tag stamped into every decision artifact.
pub const SCHEMA_VERSION: &str = "sentinel.artifact.v1";

#[derive(Debug, Error, PartialEq)]
pub enum CfgError {
    #[error("escalation plan for {0:?} tier is empty")]
    EmptyPlan(RiskTier),
    #[error("escalation plan for {0:?} tier contains redundancy level 0")]
    ZeroLevel(RiskTier),
    #[error("threshold {threshold} for {tier:?} tier is outside [0, 1]")]
    Threshold { tier: RiskTier, threshold: f64 },
    #[error("schema_version must not be empty")]
    EmptySchemaVersion,
    #[error("config parse error: {0}")]
    Parse(String),
}

/// Threshold and ordered escalation plan for one risk tier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub threshold: f64,
    pub plan: Vec<u32>,
}

impl TierRule {
    pub fn new(threshold: f64, plan: &[u32]) -> Self {
        Self {
            threshold,
            plan: plan.to_vec(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierTable {
    pub high: TierRule,
    pub medium: TierRule,
    pub low: TierRule,
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            high: TierRule::new(0.85, &[3, 5]),
            medium: TierRule::new(0.65, &[3, 5]),
            low: TierRule::new(0.50, &[1, 3, 5]),
        }
    }
}

impl TierTable {
    pub fn rule(&self, tier: RiskTier) -> &TierRule {
        match tier {
            RiskTier::High => &self.high,
            RiskTier::Medium => &self.medium,
            RiskTier::Low => &self.low,
        }
    }
}

/// Immutable engine configuration, handed by reference to the resolver and
/// the escalation controller. Nothing in the engine mutates it after load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelCfg {
    pub delegate_session: u32,
    pub completion_session: u32,
    /// Redundancy level -> validation session id.
    pub validation_sessions: BTreeMap<u32, u32>,
    pub fallback_validation_session: u32,
    pub tiers: TierTable,
    /// Minimum well-formed judgments a panel needs to count as usable.
    pub min_judgments: usize,
    pub schema_version: String,
}

impl Default for SentinelCfg {
    fn default() -> Self {
        let mut validation_sessions = BTreeMap::new();
        validation_sessions.insert(1, 78);
        validation_sessions.insert(3, 67);
        validation_sessions.insert(5, 79);

        Self {
            delegate_session: 78,
            completion_session: 78,
            validation_sessions,
            fallback_validation_session: 67,
            tiers: TierTable::default(),
            min_judgments: 1,
            schema_version: SCHEMA_VERSION.to_string(),
        }
    }
}

impl SentinelCfg {
    /// Parse a JSON config document. Missing keys keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self, CfgError> {
        let cfg: SentinelCfg =
            serde_json::from_str(raw).map_err(|e| CfgError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), CfgError> {
        for tier in [RiskTier::High, RiskTier::Medium, RiskTier::Low] {
            let rule = self.tiers.rule(tier);
            if rule.plan.is_empty() {
                return Err(CfgError::EmptyPlan(tier));
            }
            if rule.plan.contains(&0) {
                return Err(CfgError::ZeroLevel(tier));
            }
            if !(0.0..=1.0).contains(&rule.threshold) {
                return Err(CfgError::Threshold {
                    tier,
                    threshold: rule.threshold,
                });
            }
        }
        if self.schema_version.trim().is_empty() {
            return Err(CfgError::EmptySchemaVersion);
        }
        Ok(())
    }

    pub fn validation_session(&self, level: u32) -> u32 {
        self.validation_sessions
            .get(&level)
            .copied()
            .unwrap_or(self.fallback_validation_session)
    }
}
