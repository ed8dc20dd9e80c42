//! Wire types for the storecopy negotiation protocol.
//!
//! An Initiator and a Responder exchange [`NegotiationMessage`]s over a
//! message fabric. A reply is matched to its request only by topic and
//! `in_reply_to`; see [`Template`].

pub mod constants;
pub mod envelope;
pub mod template;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{CAPABILITY_TAG, Kind, PROTOCOL_TOPIC, SERVICE_NAME};
pub use envelope::NegotiationMessage;
pub use template::Template;
pub use types::{ActorAddress, CorrelationTag, Status};

/// Errors produced when decoding protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unknown status payload: {0}")]
    UnknownStatus(String),
}
