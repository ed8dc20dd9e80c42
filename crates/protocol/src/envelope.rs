use serde::{Deserialize, Serialize};

use crate::constants::{Kind, PROTOCOL_TOPIC, TAG_PREFIX_COMMIT, TAG_PREFIX_OPEN};
use crate::types::{ActorAddress, CorrelationTag, Status};
use crate::ProtocolError;

/// Unit exchanged on the fabric.
///
/// `payload` is a target path (OPEN), a source path (COMMIT), or a fixed
/// [`Status`] string (every reply).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegotiationMessage {
    pub kind: Kind,
    pub topic: String,
    pub correlation_tag: CorrelationTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<CorrelationTag>,
    pub sender: ActorAddress,
    pub receiver: ActorAddress,
    pub payload: String,
}

impl NegotiationMessage {
    /// Builds an OPEN asking `receiver` to reserve `target_path`.
    pub fn open(
        sender: ActorAddress,
        receiver: ActorAddress,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            kind: Kind::Open,
            topic: PROTOCOL_TOPIC.to_string(),
            correlation_tag: CorrelationTag::generate(TAG_PREFIX_OPEN),
            in_reply_to: None,
            sender,
            receiver,
            payload: target_path.into(),
        }
    }

    /// Builds a COMMIT answering `accept` with the local source path.
    ///
    /// The COMMIT's `in_reply_to` names the ACCEPT, which is how the
    /// Responder finds the reservation it made.
    pub fn commit(accept: &NegotiationMessage, source_path: impl Into<String>) -> Self {
        Self {
            kind: Kind::Commit,
            topic: accept.topic.clone(),
            correlation_tag: CorrelationTag::generate(TAG_PREFIX_COMMIT),
            in_reply_to: Some(accept.correlation_tag.clone()),
            sender: accept.receiver.clone(),
            receiver: accept.sender.clone(),
            payload: source_path.into(),
        }
    }

    /// Creates a reply to this message with a fresh correlation tag.
    pub fn reply(&self, kind: Kind, status: Status, tag: CorrelationTag) -> Self {
        Self {
            kind,
            topic: self.topic.clone(),
            correlation_tag: tag,
            in_reply_to: Some(self.correlation_tag.clone()),
            sender: self.receiver.clone(),
            receiver: self.sender.clone(),
            payload: status.as_str().to_string(),
        }
    }

    /// Parses the payload of a reply as a [`Status`].
    pub fn status(&self) -> Result<Status, ProtocolError> {
        Status::parse(&self.payload)
    }

    /// Encodes the message as JSON.
    pub fn to_json(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decodes a message from JSON.
    pub fn from_json(json: &str) -> Result<Self, ProtocolError> {
        Ok(serde_json::from_str(json)?)
    }
}
