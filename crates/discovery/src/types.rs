use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use storecopy_protocol::ActorAddress;

/// A service advertised in the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub address: ActorAddress,
    /// Capability tag the service is found by.
    pub capability: String,
    pub name: String,
    pub host: String,
    #[serde(skip)]
    pub registered_at: Option<Instant>,
}

impl ServiceInfo {
    pub fn new(
        address: ActorAddress,
        capability: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            address,
            capability: capability.into(),
            name: name.into(),
            host: crate::registration::get_hostname(),
            registered_at: None,
        }
    }
}

/// A registration or deregistration event.
#[derive(Debug, Clone)]
pub struct DirectoryEvent {
    pub event_type: EventType,
    pub service: ServiceInfo,
}

/// Type of directory event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Registered,
    Deregistered,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::Registered => write!(f, "registered"),
            EventType::Deregistered => write!(f, "deregistered"),
        }
    }
}
