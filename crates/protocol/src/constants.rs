use std::fmt;

use serde::{Deserialize, Serialize};

/// Capability tag a Responder advertises in the directory.
pub const CAPABILITY_TAG: &str = "storage-copy";

/// Service name registered alongside the capability tag.
pub const SERVICE_NAME: &str = "storecopy";

/// Topic scoping every message of this protocol.
///
/// Messages with any other topic are left in the mailbox untouched.
pub const PROTOCOL_TOPIC: &str = "storage-copy/negotiation";

/// Correlation tag prefixes, one per message kind that starts an exchange.
pub const TAG_PREFIX_OPEN: &str = "open";
pub const TAG_PREFIX_ACCEPT: &str = "accept";
pub const TAG_PREFIX_COMMIT: &str = "commit";
pub const TAG_PREFIX_REPLY: &str = "reply";

/// Negotiation message kind.
///
/// Closed set: outcome is communicated only through these values, never
/// through structured error objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Kind {
    /// Initiator asks whether a target path is free.
    #[serde(rename = "open")]
    Open,
    /// Responder reserved the target path.
    #[serde(rename = "accept")]
    Accept,
    /// Target path already exists (or is reserved).
    #[serde(rename = "reject")]
    Reject,
    /// Initiator supplies the local source path for a reserved target.
    #[serde(rename = "commit")]
    Commit,
    /// Copy finished and the target is a regular file.
    #[serde(rename = "done")]
    Done,
    /// Copy did not produce a regular file.
    #[serde(rename = "failed")]
    Failed,
}

impl Kind {
    /// Returns the wire name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Open => "open",
            Kind::Accept => "accept",
            Kind::Reject => "reject",
            Kind::Commit => "commit",
            Kind::Done => "done",
            Kind::Failed => "failed",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
