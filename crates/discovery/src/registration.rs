use std::sync::Arc;

use storecopy_protocol::ActorAddress;

use crate::directory::Shared;
use crate::types::ServiceInfo;

/// Live directory entry. Deregisters when dropped.
pub struct Registration {
    shared: Arc<Shared>,
    info: ServiceInfo,
    active: bool,
}

impl Registration {
    pub(crate) fn new(shared: Arc<Shared>, info: ServiceInfo) -> Self {
        Self {
            shared,
            info,
            active: true,
        }
    }

    /// Returns the advertised service.
    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    pub fn address(&self) -> &ActorAddress {
        &self.info.address
    }

    /// Stops advertising the service.
    pub fn deregister(mut self) {
        self.withdraw();
    }

    fn withdraw(&mut self) {
        if self.active {
            self.active = false;
            self.shared
                .remove(&self.info.capability, &self.info.address);
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.withdraw();
    }
}

/// Returns the local hostname, or `"unknown"`.
pub fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .map(|h| h.trim_end_matches('.').to_string())
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| "unknown".into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Directory;

    fn info() -> ServiceInfo {
        ServiceInfo::new(ActorAddress::new("r1"), "storage-copy", "storecopy")
    }

    #[test]
    fn get_hostname_returns_something() {
        assert!(!get_hostname().is_empty());
    }

    #[test]
    fn registration_info_access() {
        let dir = Directory::new();
        let reg = dir.register(info()).unwrap();
        assert_eq!(reg.address(), &ActorAddress::new("r1"));
        assert_eq!(reg.info().name, "storecopy");
        assert!(reg.info().registered_at.is_some());
    }

    #[test]
    fn external_deregister_then_drop_is_harmless() {
        let dir = Directory::new();
        let reg = dir.register(info()).unwrap();
        assert!(dir.deregister("storage-copy", &ActorAddress::new("r1")));
        drop(reg);
        assert!(dir.services().is_empty());
    }
}
