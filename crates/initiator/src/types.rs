//! Data types for the negotiation machine.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use storecopy_protocol::{ActorAddress, CAPABILITY_TAG, CorrelationTag, NegotiationMessage};

/// Settings for a [`Negotiation`](crate::Negotiation).
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    /// Capability tag to look up.
    pub capability: String,
    /// Deadline for each awaited reply. `None` waits indefinitely.
    pub reply_timeout: Option<Duration>,
}

impl Default for InitiatorConfig {
    fn default() -> Self {
        Self {
            capability: CAPABILITY_TAG.to_string(),
            reply_timeout: None,
        }
    }
}

/// One file to place: local `source`, namespace `target`.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRequest {
    pub source: PathBuf,
    pub target: String,
}

impl TransferRequest {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Which await state a deadline elapsed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Open,
    Commit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::Commit => write!(f, "commit"),
        }
    }
}

/// Terminal result of a negotiation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// DONE: the target now holds the source bytes.
    Transferred { responder: ActorAddress },
    /// REJECT: the target already exists or is reserved.
    AlreadyExists,
    /// FAILED with "failed-copy".
    TransferFailed,
    /// FAILED with "io-fault" (only sent when the Responder reports faults).
    ResponderFault { stage: Stage },
    /// No Responder advertises the capability.
    NoResponder,
    /// More than one Responder advertises the capability.
    AmbiguousResponder { count: usize },
    /// The configured reply deadline elapsed.
    TimedOut { stage: Stage },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Transferred { .. })
    }

    /// Returns `true` for outcomes reached before any message was sent.
    pub fn is_setup_failure(&self) -> bool {
        matches!(self, Self::NoResponder | Self::AmbiguousResponder { .. })
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transferred { responder } => write!(f, "transferred via {responder}"),
            Self::AlreadyExists => write!(f, "destination already exists"),
            Self::TransferFailed => write!(f, "transfer reported failed"),
            Self::ResponderFault { stage } => {
                write!(f, "responder reported an I/O fault during {stage}")
            }
            Self::NoResponder => write!(f, "no responder found"),
            Self::AmbiguousResponder { count } => {
                write!(f, "ambiguous responder: {count} found, expected exactly one")
            }
            Self::TimedOut { stage } => write!(f, "timed out waiting for {stage} reply"),
        }
    }
}

/// Negotiation machine state.
#[derive(Debug, Clone, PartialEq)]
pub enum State {
    /// Look up the Responder and send OPEN.
    Discover,
    /// Waiting for ACCEPT or REJECT to the OPEN tagged `tag`.
    AwaitOpenReply {
        responder: ActorAddress,
        tag: CorrelationTag,
    },
    /// ACCEPT received; COMMIT not yet sent.
    Commit { accept: NegotiationMessage },
    /// Waiting for DONE or FAILED to the COMMIT tagged `tag`.
    AwaitCommitReply {
        responder: ActorAddress,
        tag: CorrelationTag,
    },
    Terminal(Outcome),
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Discover => "discover",
            Self::AwaitOpenReply { .. } => "await-open-reply",
            Self::Commit { .. } => "commit",
            Self::AwaitCommitReply { .. } => "await-commit-reply",
            Self::Terminal(_) => "terminal",
        }
    }
}
