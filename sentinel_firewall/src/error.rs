use thiserror::Error;

use sentinel_core::{CfgError, LadderError, PlanError, Verdict};

use crate::firewall::Evaluation;

pub type FirewallResult<T> = Result<T, FirewallError>;

/// Failure reported by a network collaborator (delegation, completion,
/// validation). Retries and timeouts are the collaborator's business.
#[derive(Debug, Error)]
#[error("{service}: {message}")]
pub struct CollaboratorError {
    pub service: &'static str,
    pub message: String,
}

impl CollaboratorError {
    pub fn new(service: &'static str, message: impl Into<String>) -> Self {
        Self {
            service,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("duplicate decision id {0}")]
    Duplicate(String),
    #[error("limit {0} exceeds maximum of 100")]
    InvalidLimit(usize),
}

/// Fatal conditions for one run. A FAIL verdict is not an error.
#[derive(Debug, Error)]
pub enum FirewallError {
    /// Delegation or completion returned nothing usable; no artifact exists.
    #[error("upstream returned nothing usable: {0}")]
    UpstreamEmpty(String),

    #[error("collaborator call failed: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("signing misconfigured: {0}")]
    SigningMisconfigured(String),

    #[error("canonicalization failed: {0}")]
    Canonicalization(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] CfgError),

    #[error("escalation plan invalid: {0}")]
    Plan(#[from] PlanError),

    #[error("escalation ladder misuse: {0}")]
    Ladder(#[from] LadderError),

    /// The verdict and signed artifact were computed; only the write failed.
    #[error("persisting decision failed: {source}")]
    Persistence {
        #[source]
        source: StoreError,
        evaluation: Box<Evaluation>,
    },

    #[error("execution blocked: verdict {verdict}, reason: {reason}")]
    Blocked { verdict: Verdict, reason: String },
}

impl FirewallError {
    /// The completed evaluation, when the failure came after the verdict.
    pub fn evaluation(&self) -> Option<&Evaluation> {
        match self {
            FirewallError::Persistence { evaluation, .. } => Some(evaluation),
            _ => None,
        }
    }
}
