use serde::{Deserialize, Serialize};

use crate::judgment::ValidatorJudgment;

// ---------------------------------------------------------------------
// Trust scoring: stateless arithmetic over untrusted validator panels.
// Every result is clamped to [0,1] and rounded to 3 decimals.
// ---------------------------------------------------------------------

/// Share of the composite carried by weighted structural agreement.
pub const AGREEMENT_WEIGHT: f64 = 0.6;
/// Share of the composite carried by mean self-reported confidence.
pub const CONFIDENCE_WEIGHT: f64 = 0.4;

/// Clamp to [0,1] and round to 3 decimals. Non-finite input maps to 0.0.
#[inline]
pub fn round3(x: f64) -> f64 {
    if !x.is_finite() {
        return 0.0;
    }
    (x.clamp(0.0, 1.0) * 1000.0).round() / 1000.0
}

/// A judgment's voting weight, if it has one worth counting.
#[inline]
fn weight_of(j: &ValidatorJudgment) -> Option<f64> {
    j.confidence_score.filter(|w| w.is_finite() && *w > 0.0)
}

/// Confidence-weighted share of validators that judged the output valid.
///
/// Non-positive or non-numeric weights are discarded from both sides of the
/// ratio. A missing validity flag counts as not-valid.
pub fn weighted_agreement(judgments: &[ValidatorJudgment]) -> f64 {
    let mut total = 0.0_f64;
    let mut valid = 0.0_f64;

    for j in judgments {
        let Some(w) = weight_of(j) else { continue };
        total += w;
        if j.valid.unwrap_or(false) {
            valid += w;
        }
    }

    if total == 0.0 {
        return 0.0;
    }
    round3(valid / total)
}

/// Arithmetic mean of the strictly positive, numeric confidence scores.
/// Excluded entries do not count toward the denominator.
pub fn mean_confidence(judgments: &[ValidatorJudgment]) -> f64 {
    let (sum, n) = judgments
        .iter()
        .filter_map(weight_of)
        .fold((0.0_f64, 0_usize), |(s, n), w| (s + w, n + 1));

    if n == 0 {
        return 0.0;
    }
    round3(sum / n as f64)
}

pub fn composite_confidence(agreement: f64, mean_confidence: f64) -> f64 {
    round3(AGREEMENT_WEIGHT * agreement + CONFIDENCE_WEIGHT * mean_confidence)
}

/// Reporting label for a composite score. Never used for control flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
    Unsafe,
}

impl ConfidenceBand {
    pub fn as_str(self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
            ConfidenceBand::Unsafe => "unsafe",
        }
    }
}

pub fn confidence_band(composite: f64) -> ConfidenceBand {
    if composite >= 0.85 {
        ConfidenceBand::High
    } else if composite >= 0.65 {
        ConfidenceBand::Medium
    } else if composite >= 0.50 {
        ConfidenceBand::Low
    } else {
        ConfidenceBand::Unsafe
    }
}

/// Count of entries carrying both a validity flag and a confidence score.
pub fn usable_judgments(judgments: &[ValidatorJudgment]) -> usize {
    judgments.iter().filter(|j| j.is_well_formed()).count()
}

/// Guard against a panel that returned nothing usable.
pub fn sufficient_judgments(judgments: &[ValidatorJudgment], minimum: usize) -> bool {
    usable_judgments(judgments) >= minimum
}

/// All scores for one validator panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PanelScore {
    pub agreement: f64,
    pub mean_confidence: f64,
    pub composite: f64,
    pub usable: usize,
}

pub fn score_panel(judgments: &[ValidatorJudgment]) -> PanelScore {
    let agreement = weighted_agreement(judgments);
    let mean = mean_confidence(judgments);
    PanelScore {
        agreement,
        mean_confidence: mean,
        composite: composite_confidence(agreement, mean),
        usable: usable_judgments(judgments),
    }
}
