//! Responder lifecycle: register, run both loops, shut down.

use std::sync::{Arc, Mutex};

use storecopy_discovery::{Directory, Registration, ServiceInfo};
use storecopy_fabric::Endpoint;
use storecopy_protocol::constants::TAG_PREFIX_REPLY;
use storecopy_protocol::{ActorAddress, CorrelationTag, Kind, NegotiationMessage, Status};
use storecopy_storage::{AuditReport, Storage};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::ResponderConfig;
use crate::existence::existence_check_loop;
use crate::reservations::Reservations;
use crate::transfer::transfer_loop;
use crate::ResponderError;

/// State shared by both loops.
pub(crate) struct Context {
    pub(crate) endpoint: Endpoint,
    pub(crate) storage: Arc<dyn Storage>,
    pub(crate) reservations: Reservations,
    pub(crate) config: ResponderConfig,
    last_written: Mutex<Option<String>>,
}

impl Context {
    /// Sends a reply to `request`. Send failures are logged, not returned:
    /// an initiator that went away cannot be told anything.
    pub(crate) fn send_reply(
        &self,
        request: &NegotiationMessage,
        kind: Kind,
        status: Status,
        tag: Option<CorrelationTag>,
    ) {
        let tag = tag.unwrap_or_else(|| CorrelationTag::generate(TAG_PREFIX_REPLY));
        let reply = request.reply(kind, status, tag);
        debug!(
            kind = %reply.kind,
            to = %reply.receiver,
            in_reply_to = %request.correlation_tag,
            "reply"
        );
        if let Err(e) = self.endpoint.send(reply) {
            warn!(to = %request.sender, "failed to send {kind} reply: {e}");
        }
    }

    pub(crate) fn record_written(&self, target: &str) {
        *self.last_written.lock().unwrap_or_else(|e| e.into_inner()) = Some(target.to_string());
    }

    fn last_written(&self) -> Option<String> {
        self.last_written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// A configured responder, not yet running.
pub struct Responder {
    ctx: Arc<Context>,
}

impl Responder {
    pub fn new(config: ResponderConfig, storage: Arc<dyn Storage>, endpoint: Endpoint) -> Self {
        Self {
            ctx: Arc::new(Context {
                endpoint,
                storage,
                reservations: Reservations::new(),
                config,
                last_written: Mutex::new(None),
            }),
        }
    }

    pub fn address(&self) -> &ActorAddress {
        self.ctx.endpoint.address()
    }

    /// Registers in `directory` and spawns both loops.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self, directory: &Directory) -> Result<ResponderHandle, ResponderError> {
        let info = ServiceInfo::new(
            self.address().clone(),
            self.ctx.config.capability.clone(),
            self.ctx.config.name.clone(),
        );
        let registration = directory.register(info)?;

        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn(existence_check_loop(Arc::clone(&self.ctx), cancel.clone())),
            tokio::spawn(transfer_loop(Arc::clone(&self.ctx), cancel.clone())),
        ];

        info!(
            address = %self.address(),
            capability = %self.ctx.config.capability,
            "responder started"
        );
        Ok(ResponderHandle {
            ctx: self.ctx,
            registration: Some(registration),
            cancel,
            tasks,
        })
    }
}

/// A running responder.
pub struct ResponderHandle {
    ctx: Arc<Context>,
    registration: Option<Registration>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl ResponderHandle {
    pub fn address(&self) -> &ActorAddress {
        self.ctx.endpoint.address()
    }

    /// Accepted negotiations still waiting for a COMMIT.
    pub fn pending_reservations(&self) -> usize {
        self.ctx.reservations.len()
    }

    /// Deregisters, stops both loops and, if enabled and anything was
    /// written, audits the directory of the last written target.
    ///
    /// A copy already in progress runs to completion first.
    pub async fn shutdown(mut self) -> Option<AuditReport> {
        info!(address = %self.address(), "responder shutting down");
        if let Some(registration) = self.registration.take() {
            registration.deregister();
        }
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!("responder loop panicked: {e}");
            }
        }

        if !self.ctx.config.audit_on_shutdown {
            return None;
        }
        let target = self.ctx.last_written()?;
        let storage = Arc::clone(&self.ctx.storage);
        match crate::run_blocking(move || Ok(storage.audit(&target)?)).await {
            Ok(report) => report,
            Err(e) => {
                error!("shutdown audit failed: {e}");
                None
            }
        }
    }
}

impl Drop for ResponderHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
