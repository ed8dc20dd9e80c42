use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Opaque mailbox address of an actor on the fabric.
///
/// Resolved through the directory and used only for addressing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorAddress(String);

impl ActorAddress {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Token linking a reply to the request it answers.
///
/// Each tag is used for exactly one request/reply pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationTag(String);

impl CorrelationTag {
    /// Generates a fresh tag of the form `<prefix>-<uuid v4>`.
    pub fn generate(prefix: &str) -> Self {
        Self(format!("{prefix}-{}", uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fixed status payloads carried by reply messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Target path is free (ACCEPT).
    Ok,
    /// Target path exists or is reserved (REJECT).
    NotOk,
    /// Copy completed (DONE).
    Success,
    /// Copy did not produce a regular file (FAILED).
    FailedCopy,
    /// I/O fault reported instead of silently abandoning the round (FAILED).
    IoFault,
}

impl Status {
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Ok => "ok",
            Status::NotOk => "not-ok",
            Status::Success => "success",
            Status::FailedCopy => "failed-copy",
            Status::IoFault => "io-fault",
        }
    }

    /// Parses a status payload.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        match payload {
            "ok" => Ok(Status::Ok),
            "not-ok" => Ok(Status::NotOk),
            "success" => Ok(Status::Success),
            "failed-copy" => Ok(Status::FailedCopy),
            "io-fault" => Ok(Status::IoFault),
            other => Err(ProtocolError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tags_carry_prefix() {
        let tag = CorrelationTag::generate("open");
        assert!(tag.as_str().starts_with("open-"));
        assert_eq!(tag.as_str().len(), "open-".len() + 36);
    }

    #[test]
    fn generated_tags_are_unique() {
        let tags: std::collections::HashSet<_> =
            (0..1000).map(|_| CorrelationTag::generate("t")).collect();
        assert_eq!(tags.len(), 1000);
    }

    #[test]
    fn status_parse_all() {
        for status in [
            Status::Ok,
            Status::NotOk,
            Status::Success,
            Status::FailedCopy,
            Status::IoFault,
        ] {
            assert_eq!(Status::parse(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn status_parse_unknown() {
        let err = Status::parse("maybe").unwrap_err();
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn address_serializes_transparently() {
        let addr = ActorAddress::new("responder@host");
        assert_eq!(
            serde_json::to_string(&addr).unwrap(),
            "\"responder@host\""
        );
        assert_eq!(addr.to_string(), "responder@host");
    }
}
