//! Configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/storecopy/storecopy.toml`
//! - Windows: `%APPDATA%/storecopy/storecopy.toml`
//!
//! Every field is optional; command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use storecopy_initiator::InitiatorConfig;
use storecopy_protocol::CAPABILITY_TAG;
use storecopy_responder::{DEFAULT_RESERVATION_TTL, ResponderConfig};
use storecopy_storage::DEFAULT_COPY_BUFFER_SIZE;

use crate::cli::Cli;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base directory of the storage namespace.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,

    /// Name (and mailbox address) the responder advertises.
    #[serde(default = "default_responder_name")]
    pub responder_name: String,

    /// Reply FAILED ("io-fault") on I/O faults instead of dropping the round.
    #[serde(default)]
    pub report_io_faults: bool,

    /// Reply deadline in seconds. Absent means wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_timeout_secs: Option<u64>,

    #[serde(default = "default_true")]
    pub audit_on_shutdown: bool,

    #[serde(default = "default_copy_buffer_size")]
    pub copy_buffer_size: usize,

    /// Seconds an accepted target stays reserved awaiting its COMMIT.
    #[serde(default = "default_reservation_ttl_secs")]
    pub reservation_ttl_secs: u64,
}

fn default_storage_root() -> PathBuf {
    match std::env::var("HOME") {
        Ok(home) if !home.is_empty() => PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("storecopy"),
        _ => PathBuf::from("/tmp/storecopy"),
    }
}

fn default_responder_name() -> String {
    storecopy_discovery::get_hostname()
}

fn default_true() -> bool {
    true
}

fn default_copy_buffer_size() -> usize {
    DEFAULT_COPY_BUFFER_SIZE
}

fn default_reservation_ttl_secs() -> u64 {
    DEFAULT_RESERVATION_TTL.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            responder_name: default_responder_name(),
            report_io_faults: false,
            reply_timeout_secs: None,
            audit_on_shutdown: default_true(),
            copy_buffer_size: default_copy_buffer_size(),
            reservation_ttl_secs: default_reservation_ttl_secs(),
        }
    }
}

impl Config {
    /// Loads `explicit` if given, else the platform config file if it
    /// exists, else defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let path = config_path();
        if path.exists() {
            Self::from_file(&path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Applies command-line overrides.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.storage_root {
            self.storage_root = root.clone();
        }
        if cli.report_io_faults {
            self.report_io_faults = true;
        }
        if let Some(secs) = cli.timeout {
            self.reply_timeout_secs = Some(secs);
        }
        if cli.no_audit {
            self.audit_on_shutdown = false;
        }
    }

    pub fn responder_config(&self) -> ResponderConfig {
        ResponderConfig {
            name: self.responder_name.clone(),
            capability: CAPABILITY_TAG.to_string(),
            report_io_faults: self.report_io_faults,
            copy_buffer_size: self.copy_buffer_size,
            audit_on_shutdown: self.audit_on_shutdown,
            reservation_ttl: Duration::from_secs(self.reservation_ttl_secs),
        }
    }

    pub fn initiator_config(&self) -> InitiatorConfig {
        InitiatorConfig {
            capability: CAPABILITY_TAG.to_string(),
            reply_timeout: self.reply_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        PathBuf::from(appdata).join("storecopy").join("storecopy.toml")
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        PathBuf::from(home)
            .join(".config")
            .join("storecopy")
            .join("storecopy.toml")
    }
}
