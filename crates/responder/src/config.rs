use std::time::Duration;

use storecopy_protocol::{CAPABILITY_TAG, SERVICE_NAME};
use storecopy_storage::DEFAULT_COPY_BUFFER_SIZE;

/// Responder settings.
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Mailbox address and advertised name.
    pub name: String,
    /// Capability tag to register under.
    pub capability: String,
    /// Reply FAILED ("io-fault") on I/O faults instead of abandoning the
    /// round silently.
    pub report_io_faults: bool,
    /// Copy buffer size in bytes (0 = default).
    pub copy_buffer_size: usize,
    /// Audit the directory of the last written target on shutdown.
    pub audit_on_shutdown: bool,
    /// How long an accepted target stays reserved without a COMMIT.
    pub reservation_ttl: Duration,
}

/// Default time an ACCEPT holds its target.
pub const DEFAULT_RESERVATION_TTL: Duration = Duration::from_secs(60);

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            name: SERVICE_NAME.to_string(),
            capability: CAPABILITY_TAG.to_string(),
            report_io_faults: false,
            copy_buffer_size: DEFAULT_COPY_BUFFER_SIZE,
            audit_on_shutdown: true,
            reservation_ttl: DEFAULT_RESERVATION_TTL,
        }
    }
}
