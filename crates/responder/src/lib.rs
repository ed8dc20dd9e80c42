//! Responder for the storecopy negotiation protocol.
//!
//! Owns the storage namespace and runs two independent loops on one
//! mailbox:
//!
//! - the existence-check loop answers OPEN with ACCEPT (and a reservation)
//!   or REJECT;
//! - the transfer loop answers COMMIT by copying the source into the
//!   reserved target and replying DONE or FAILED.
//!
//! Reservations are keyed by the ACCEPT's correlation tag, so any number
//! of negotiations may be in flight at once.

mod config;
mod existence;
mod reservations;
mod responder;
mod transfer;

pub use config::{DEFAULT_RESERVATION_TTL, ResponderConfig};
pub use reservations::{Reservation, Reservations};
pub use responder::{Responder, ResponderHandle};

/// Errors produced by the responder.
#[derive(Debug, thiserror::Error)]
pub enum ResponderError {
    #[error("storage error: {0}")]
    Storage(#[from] storecopy_storage::StorageError),

    #[error("fabric error: {0}")]
    Fabric(#[from] storecopy_fabric::FabricError),

    #[error("discovery error: {0}")]
    Discovery(#[from] storecopy_discovery::DiscoveryError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Runs a blocking storage call off the async worker threads.
pub(crate) async fn run_blocking<T, F>(f: F) -> Result<T, ResponderError>
where
    F: FnOnce() -> Result<T, ResponderError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
