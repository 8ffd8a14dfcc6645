//! sentinel_firewall
//!
//! Outside-world facing orchestration layer for `sentinel_core`.
//!
//! Responsibilities:
//! - talk to the router (delegation, completion, validation) through `RouterClient`
//! - drive the escalation ladder one level at a time
//! - build, hash and sign the decision artifact
//! - hand the signed decision to a `DecisionStore`
//!
//! Non-goals:
//! - no transport, retries or backoff (collaborator concerns)
//! - no scoring policy (lives in core)
//! - no subscriber setup; events go through `tracing`

pub mod adapter;
pub mod artifact;
pub mod controller;
pub mod error;
pub mod firewall;
pub mod run;
pub mod signing;
pub mod store;

pub use adapter::{
    RouterClient,
    DecisionStore,
    DecisionRecord,
    DelegatePlan,
    CompletionOutput,
};

pub use artifact::{
    ArtifactBuilder,
    ArtifactInputs,
    DecisionArtifact,
    ValidatorRunSummary,
    canonical_json,
    canonical_hash,
    sha256_hex,
};

pub use controller::EscalationController;
pub use error::{CollaboratorError, FirewallError, FirewallResult, StoreError};
pub use firewall::{Evaluation, Firewall};
pub use run::RunState;
pub use signing::{ArtifactSigner, SignedArtifact, PRIVATE_KEY_ENV};
pub use store::MemoryDecisionStore;
