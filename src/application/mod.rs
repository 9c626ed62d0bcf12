//! Application services: task mutations and session gating.

pub mod coordinator;
pub mod gatekeeper;

pub use coordinator::{MutationCoordinator, MutationOutcome, SkipReason};
pub use gatekeeper::{
    ACCESS_DENIED_NOTICE, GateDecision, Gatekeeper, LoginOutcome, SESSION_TIMEOUT_NOTICE,
};
