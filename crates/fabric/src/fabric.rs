use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use storecopy_protocol::{ActorAddress, NegotiationMessage, PROTOCOL_TOPIC, Template};
use tracing::{debug, trace};

use crate::FabricError;
use crate::mailbox::Mailbox;

/// Registry of mailboxes shared by every endpoint (cheap to clone).
#[derive(Clone, Default)]
pub struct Fabric {
    mailboxes: Arc<RwLock<HashMap<ActorAddress, Arc<Mailbox>>>>,
}

impl Fabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mailbox at `address` and returns its endpoint.
    pub fn endpoint(&self, address: impl Into<String>) -> Result<Endpoint, FabricError> {
        let address = ActorAddress::new(address);
        let mut mailboxes = self.mailboxes.write().unwrap_or_else(|e| e.into_inner());
        if mailboxes.contains_key(&address) {
            return Err(FabricError::AddressInUse(address.to_string()));
        }
        let mailbox = Arc::new(Mailbox::new());
        mailboxes.insert(address.clone(), Arc::clone(&mailbox));
        drop(mailboxes);

        trace!(%address, "mailbox created");
        Ok(Endpoint {
            address,
            mailbox,
            fabric: self.clone(),
        })
    }

    /// Closes every mailbox, waking all suspended receivers with
    /// [`FabricError::Closed`].
    pub fn close(&self) {
        let mut mailboxes = self.mailboxes.write().unwrap_or_else(|e| e.into_inner());
        for mailbox in mailboxes.values() {
            mailbox.close();
        }
        mailboxes.clear();
    }

    fn deliver(&self, msg: NegotiationMessage) -> Result<(), FabricError> {
        if msg.topic != PROTOCOL_TOPIC {
            // No loop retrieves other topics; queueing them would only grow the mailbox.
            debug!(topic = %msg.topic, to = %msg.receiver, "discarding message on foreign topic");
            return Ok(());
        }
        let mailbox = self
            .mailboxes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&msg.receiver)
            .cloned()
            .ok_or_else(|| FabricError::UnknownAddress(msg.receiver.to_string()))?;
        trace!(
            kind = %msg.kind,
            tag = %msg.correlation_tag,
            from = %msg.sender,
            to = %msg.receiver,
            "deliver"
        );
        mailbox.push(msg)
    }

    fn remove(&self, address: &ActorAddress) {
        self.mailboxes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(address);
    }
}

/// An actor's handle on the fabric: its address plus its private mailbox.
///
/// Dropping the endpoint closes the mailbox and frees the address.
pub struct Endpoint {
    address: ActorAddress,
    mailbox: Arc<Mailbox>,
    fabric: Fabric,
}

impl Endpoint {
    pub fn address(&self) -> &ActorAddress {
        &self.address
    }

    /// Enqueues `msg` in the mailbox named by `msg.receiver`.
    ///
    /// Messages on a topic other than the negotiation topic are dropped.
    pub fn send(&self, msg: NegotiationMessage) -> Result<(), FabricError> {
        self.fabric.deliver(msg)
    }

    /// Takes the oldest queued message matching `template`, if any.
    pub fn try_receive(&self, template: &Template) -> Option<NegotiationMessage> {
        self.mailbox.take_matching(template)
    }

    /// Suspends until a message matching `template` arrives.
    ///
    /// Returns [`FabricError::Closed`] once the mailbox is closed and no
    /// matching message remains.
    pub async fn receive(&self, template: &Template) -> Result<NegotiationMessage, FabricError> {
        self.mailbox.wait_matching(template).await
    }

    /// Number of messages waiting in this mailbox.
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }
}

impl Drop for Endpoint {
    fn drop(&mut self) {
        self.mailbox.close();
        self.fabric.remove(&self.address);
    }
}
