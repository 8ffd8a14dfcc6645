use crate::judgment::ValidatorJudgment;
use crate::trust::PanelScore;

/// Outcome of one escalation level. Appended to the run's history and never
/// removed, even when a later level accepts.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EscalationAttempt {
    pub redundancy_level: u32,
    pub judgments: Vec<ValidatorJudgment>,
    pub agreement: f64,
    pub mean_confidence: f64,
    pub composite_confidence: f64,
    /// Well-formed entries in the panel.
    pub usable: usize,
}

impl EscalationAttempt {
    pub fn new(redundancy_level: u32, judgments: Vec<ValidatorJudgment>, score: PanelScore) -> Self {
        Self {
            redundancy_level,
            judgments,
            agreement: score.agreement,
            mean_confidence: score.mean_confidence,
            composite_confidence: score.composite,
            usable: score.usable,
        }
    }
}

/// The levels actually attempted, in order.
pub fn escalation_path(history: &[EscalationAttempt]) -> Vec<u32> {
    history.iter().map(|a| a.redundancy_level).collect()
}
