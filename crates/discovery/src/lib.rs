pub mod directory;
pub mod registration;
pub mod types;

// Re-export primary types.
pub use directory::Directory;
pub use registration::{Registration, get_hostname};
pub use types::{DirectoryEvent, EventType, ServiceInfo};

/// Errors for directory operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("already registered: {address} for {capability}")]
    AlreadyRegistered { address: String, capability: String },

    #[error("configuration error: {0}")]
    Config(String),
}
