//! Initiator for the storecopy negotiation protocol.
//!
//! A [`Negotiation`] places one local file at one target path on the single
//! Responder advertising the capability tag:
//!
//! 1. **Discover** the Responder and send OPEN with the target path
//! 2. **Await** ACCEPT or REJECT
//! 3. **Commit** with the source path
//! 4. **Await** DONE or FAILED
//!
//! Every protocol result, including "already exists" and an empty
//! directory, is an [`Outcome`]. [`InitiatorError`] is reserved for the
//! fabric itself failing.

pub mod negotiation;
pub mod types;

pub use negotiation::Negotiation;
pub use types::{InitiatorConfig, Outcome, Stage, State, TransferRequest};

/// Errors produced while driving a negotiation.
#[derive(Debug, thiserror::Error)]
pub enum InitiatorError {
    #[error("fabric error: {0}")]
    Fabric(#[from] storecopy_fabric::FabricError),
}
