//! In-process message fabric.
//!
//! Every actor owns a private mailbox reached through an [`Endpoint`].
//! Delivery is asynchronous: [`Endpoint::send`] enqueues into the
//! receiver's mailbox and returns immediately. Retrieval is by
//! [`Template`](storecopy_protocol::Template): [`Endpoint::try_receive`]
//! never blocks, and [`Endpoint::receive`] suspends the calling task until
//! a matching message arrives instead of polling.
//!
//! Only messages on the negotiation topic are delivered; anything else is
//! discarded at the sender. A mailbox holds at most [`MAILBOX_CAPACITY`]
//! messages.
//!
//! Ordering across senders is not guaranteed; consumers correlate replies
//! by tag, never by arrival order.

mod fabric;
mod mailbox;

pub use fabric::{Endpoint, Fabric};
pub use mailbox::MAILBOX_CAPACITY;

/// Errors produced by the fabric.
#[derive(Debug, thiserror::Error)]
pub enum FabricError {
    #[error("unknown address: {0}")]
    UnknownAddress(String),

    #[error("address already in use: {0}")]
    AddressInUse(String),

    #[error("mailbox closed")]
    Closed,

    #[error("mailbox full: {0}")]
    MailboxFull(String),
}
