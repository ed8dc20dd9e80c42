//! Message templates used for pattern-based retrieval.
//!
//! A template is a conjunction of optional field constraints. The
//! Responder loops match by topic and kind; an awaiting Initiator matches
//! by topic and `in_reply_to`.

use crate::constants::{Kind, PROTOCOL_TOPIC};
use crate::envelope::NegotiationMessage;
use crate::types::CorrelationTag;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    topic: Option<String>,
    kind: Option<Kind>,
    in_reply_to: Option<CorrelationTag>,
}

impl Template {
    /// Matches any message of the given topic.
    pub fn topic(topic: impl Into<String>) -> Self {
        Self {
            topic: Some(topic.into()),
            ..Self::default()
        }
    }

    /// Matches messages of this protocol's topic.
    pub fn protocol() -> Self {
        Self::topic(PROTOCOL_TOPIC)
    }

    /// Adds a kind constraint.
    pub fn with_kind(mut self, kind: Kind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Adds an `in_reply_to` constraint.
    pub fn in_reply_to(mut self, tag: CorrelationTag) -> Self {
        self.in_reply_to = Some(tag);
        self
    }

    /// Returns `true` if every constraint holds for `msg`.
    pub fn matches(&self, msg: &NegotiationMessage) -> bool {
        if let Some(topic) = &self.topic
            && &msg.topic != topic
        {
            return false;
        }
        if let Some(kind) = self.kind
            && msg.kind != kind
        {
            return false;
        }
        if let Some(tag) = &self.in_reply_to
            && msg.in_reply_to.as_ref() != Some(tag)
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActorAddress, Status};

    fn open() -> NegotiationMessage {
        NegotiationMessage::open(
            ActorAddress::new("initiator"),
            ActorAddress::new("responder"),
            "/data/a",
        )
    }

    #[test]
    fn empty_template_matches_everything() {
        assert!(Template::default().matches(&open()));
    }

    #[test]
    fn topic_mismatch() {
        assert!(!Template::topic("other").matches(&open()));
        assert!(Template::protocol().matches(&open()));
    }

    #[test]
    fn kind_filter() {
        let t = Template::protocol().with_kind(Kind::Commit);
        assert!(!t.matches(&open()));
        assert!(Template::protocol().with_kind(Kind::Open).matches(&open()));
    }

    #[test]
    fn in_reply_to_requires_exact_tag() {
        let req = open();
        let reply = req.reply(Kind::Accept, Status::Ok, CorrelationTag::generate("a"));

        let waiting = Template::protocol().in_reply_to(req.correlation_tag.clone());
        assert!(waiting.matches(&reply));

        let other = Template::protocol().in_reply_to(CorrelationTag::generate("open"));
        assert!(!other.matches(&reply));
    }

    #[test]
    fn in_reply_to_rejects_unsolicited_messages() {
        let t = Template::protocol().in_reply_to(CorrelationTag::generate("open"));
        // OPEN has no in_reply_to at all.
        assert!(!t.matches(&open()));
    }
}
