//! Command-line arguments.

use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use storecopy_initiator::TransferRequest;

/// Separators accepted in the single-argument `SOURCE<sep>TARGET` form.
const COMBINED_SEPARATORS: [char; 2] = [':', ';'];

#[derive(Debug, Parser)]
#[command(name = "storecopy", version)]
#[command(about = "Copy a local file into a write-once storage namespace")]
pub struct Cli {
    /// Local source file, or `SOURCE:TARGET` / `SOURCE;TARGET` when TARGET is omitted
    pub source: String,

    /// Target path in the storage namespace
    pub target: Option<String>,

    /// Configuration file (defaults to ~/.config/storecopy/storecopy.toml)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Base directory of the storage namespace
    #[arg(long)]
    pub storage_root: Option<PathBuf>,

    /// Reply FAILED on responder I/O faults instead of staying silent
    #[arg(long)]
    pub report_io_faults: bool,

    /// Give up waiting for a reply after this many seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Skip the storage audit on shutdown
    #[arg(long)]
    pub no_audit: bool,

    /// Enable debug logging
    #[arg(long, short)]
    pub verbose: bool,
}

impl Cli {
    /// Resolves the positional arguments into a transfer request.
    pub fn transfer_request(&self) -> anyhow::Result<TransferRequest> {
        let (source, target) = match &self.target {
            Some(target) => (self.source.as_str(), target.as_str()),
            None => split_combined(&self.source)?,
        };

        if source.is_empty() || target.is_empty() {
            bail!("source and target must both be non-empty");
        }
        Ok(TransferRequest::new(source, target))
    }
}

/// Splits `SOURCE<sep>TARGET` on the first separator present, `:` before `;`.
///
/// The chosen separator must occur exactly once.
fn split_combined(arg: &str) -> anyhow::Result<(&str, &str)> {
    let Some(sep) = COMBINED_SEPARATORS.into_iter().find(|sep| arg.contains(*sep)) else {
        bail!("missing target: pass SOURCE TARGET, SOURCE:TARGET or SOURCE;TARGET");
    };
    let parts: Vec<&str> = arg.split(sep).collect();
    match parts.as_slice() {
        [source, target] => Ok((*source, *target)),
        _ => bail!("expected exactly one '{sep}' in {arg:?}, found {}", parts.len() - 1),
    }
}
