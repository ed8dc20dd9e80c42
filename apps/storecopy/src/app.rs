//! Application orchestrator: wires one responder and one initiator together.

use std::sync::Arc;

use anyhow::{Context, bail};
use storecopy_discovery::{Directory, DirectoryEvent};
use storecopy_fabric::Fabric;
use storecopy_initiator::{Negotiation, Outcome, TransferRequest};
use storecopy_responder::Responder;
use storecopy_storage::{AuditReport, LocalStorage};
use tokio::sync::mpsc;

use crate::config::Config;

/// Runs one transfer to completion and returns its outcome.
///
/// Errors are setup failures: missing source, unusable storage root, or
/// the fabric going away.
pub async fn run(config: Config, request: TransferRequest) -> anyhow::Result<Outcome> {
    // -- Local source pre-check --
    if !request.source.is_file() {
        bail!("source file not found: {}", request.source.display());
    }
    // The responder opens the source by path, so hand it an absolute one.
    let source = std::fs::canonicalize(&request.source)
        .with_context(|| format!("resolving {}", request.source.display()))?;
    let request = TransferRequest::new(source, request.target);

    // -- Storage --
    let storage = LocalStorage::open(&config.storage_root).with_context(|| {
        format!("opening storage root {}", config.storage_root.display())
    })?;
    tracing::info!(root = %storage.root().display(), "storage ready");

    // -- Fabric and directory --
    let fabric = Fabric::new();
    let mut directory = Directory::new();
    let events = directory
        .take_events()
        .map(|rx| tokio::spawn(log_directory_events(rx)));

    // -- Responder --
    let responder_ep = fabric.endpoint(config.responder_name.as_str())?;
    let responder = Responder::new(config.responder_config(), Arc::new(storage), responder_ep);
    let handle = responder.start(&directory)?;

    // -- Initiator --
    let initiator_ep = fabric.endpoint(format!("initiator-{}", uuid::Uuid::new_v4()))?;
    let mut negotiation = Negotiation::new(
        &initiator_ep,
        &directory,
        request,
        config.initiator_config(),
    );

    let result = tokio::select! {
        result = negotiation.run() => result.map_err(anyhow::Error::from),
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, shutting down");
            Err(anyhow::anyhow!("interrupted"))
        }
    };

    if let Some(report) = handle.shutdown().await {
        log_audit(&report);
    }
    fabric.close();

    // Closing the directory ends the event stream.
    drop(negotiation);
    drop(directory);
    if let Some(task) = events {
        let _ = task.await;
    }
    result
}

async fn log_directory_events(mut events: mpsc::Receiver<DirectoryEvent>) {
    while let Some(event) = events.recv().await {
        tracing::debug!(
            event = %event.event_type,
            address = %event.service.address,
            capability = %event.service.capability,
            "directory changed"
        );
    }
}

fn log_audit(report: &AuditReport) {
    for entry in &report.files {
        tracing::debug!(path = %entry.path, size = entry.size, sha256 = %entry.checksum, "audited");
    }
    if !report.is_healthy() {
        tracing::warn!(
            dir = %report.directory.display(),
            other = report.other_entries,
            "storage directory holds non-regular entries"
        );
    }
}
