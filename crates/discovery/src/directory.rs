use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use storecopy_protocol::ActorAddress;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::DiscoveryError;
use crate::registration::Registration;
use crate::types::{DirectoryEvent, EventType, ServiceInfo};

type ServiceKey = (String, ActorAddress);

pub(crate) struct Shared {
    services: RwLock<BTreeMap<ServiceKey, ServiceInfo>>,
    events_tx: mpsc::Sender<DirectoryEvent>,
}

impl Shared {
    pub(crate) fn remove(&self, capability: &str, address: &ActorAddress) -> bool {
        let key = (capability.to_string(), address.clone());
        let mut services = self.services.write().unwrap_or_else(|e| e.into_inner());
        let Some(service) = services.remove(&key) else {
            return false;
        };
        drop(services);

        info!(%address, capability, "service deregistered");
        let _ = self.events_tx.try_send(DirectoryEvent {
            event_type: EventType::Deregistered,
            service,
        });
        true
    }
}

/// Capability directory ("yellow pages").
///
/// Responders register under a capability tag; initiators look up every
/// address currently advertising that tag.
pub struct Directory {
    shared: Arc<Shared>,
    events_rx: Option<mpsc::Receiver<DirectoryEvent>>,
}

impl Directory {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(16);
        Self {
            shared: Arc::new(Shared {
                services: RwLock::new(BTreeMap::new()),
                events_tx: tx,
            }),
            events_rx: Some(rx),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<DirectoryEvent>> {
        self.events_rx.take()
    }

    /// Advertises `info`. The service stays listed until the returned
    /// [`Registration`] is deregistered or dropped.
    pub fn register(&self, mut info: ServiceInfo) -> Result<Registration, DiscoveryError> {
        if info.capability.is_empty() {
            return Err(DiscoveryError::Config("capability tag must be set".into()));
        }

        let key = (info.capability.clone(), info.address.clone());
        let mut services = self.shared.services.write().unwrap_or_else(|e| e.into_inner());
        if services.contains_key(&key) {
            return Err(DiscoveryError::AlreadyRegistered {
                address: info.address.to_string(),
                capability: info.capability,
            });
        }
        info.registered_at = Some(Instant::now());
        services.insert(key, info.clone());
        drop(services);

        info!(
            address = %info.address,
            capability = %info.capability,
            name = %info.name,
            "service registered"
        );
        let _ = self.shared.events_tx.try_send(DirectoryEvent {
            event_type: EventType::Registered,
            service: info.clone(),
        });

        Ok(Registration::new(Arc::clone(&self.shared), info))
    }

    /// Removes the entry for `address` under `capability`.
    ///
    /// Returns `false` if no such entry was listed.
    pub fn deregister(&self, capability: &str, address: &ActorAddress) -> bool {
        self.shared.remove(capability, address)
    }

    /// Returns every address currently advertising `capability`.
    ///
    /// Zero, one, or many; callers decide what cardinality they accept.
    pub fn find(&self, capability: &str) -> Vec<ActorAddress> {
        let found: Vec<ActorAddress> = self
            .shared
            .services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|s| s.capability == capability)
            .map(|s| s.address.clone())
            .collect();
        debug!(capability, matches = found.len(), "directory lookup");
        found
    }

    /// Returns all listed services.
    pub fn services(&self) -> Vec<ServiceInfo> {
        self.shared
            .services
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

impl Default for Directory {
    fn default() -> Self {
        Self::new()
    }
}
