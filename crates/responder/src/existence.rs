//! Existence-check loop: answers OPEN with ACCEPT or REJECT.

use std::sync::Arc;

use storecopy_protocol::constants::TAG_PREFIX_ACCEPT;
use storecopy_protocol::{CorrelationTag, Kind, NegotiationMessage, Status, Template};
use storecopy_storage::{StorageError, normalize_namespace_path};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ResponderError;
use crate::responder::Context;

/// Consumes OPEN messages until cancelled or the mailbox closes.
///
/// Suspends on the mailbox between messages; never polls.
pub(crate) async fn existence_check_loop(ctx: Arc<Context>, cancel: CancellationToken) {
    let template = Template::protocol().with_kind(Kind::Open);
    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = ctx.endpoint.receive(&template) => match result {
                Ok(msg) => msg,
                Err(e) => {
                    debug!("existence-check loop stopping: {e}");
                    break;
                }
            },
        };
        handle_open(&ctx, msg).await;
    }
    debug!("existence-check loop stopped");
}

/// Answers a single OPEN.
pub(crate) async fn handle_open(ctx: &Context, msg: NegotiationMessage) {
    debug!(
        tag = %msg.correlation_tag,
        from = %msg.sender,
        target = %msg.payload,
        "OPEN received"
    );

    let expired = ctx.reservations.expire(ctx.config.reservation_ttl);
    if expired > 0 {
        info!(expired, "released reservations that never saw a COMMIT");
    }

    // Every spelling of one object shares a reservation key.
    let target = match normalize_namespace_path(&msg.payload) {
        Ok(key) => key,
        Err(e) => {
            warn!(target = %msg.payload, "invalid target path, rejecting: {e}");
            ctx.send_reply(&msg, Kind::Reject, Status::NotOk, None);
            return;
        }
    };

    if ctx.reservations.is_held(&target) {
        info!(%target, "target already reserved by another negotiation, rejecting");
        ctx.send_reply(&msg, Kind::Reject, Status::NotOk, None);
        return;
    }

    let storage = Arc::clone(&ctx.storage);
    let path = target.clone();
    let exists = crate::run_blocking(move || Ok(storage.exists(&path)?)).await;

    match exists {
        Ok(false) => {
            let tag = CorrelationTag::generate(TAG_PREFIX_ACCEPT);
            if !ctx
                .reservations
                .reserve(tag.clone(), &target, msg.sender.clone())
            {
                // Lost a race with another OPEN for the same path.
                ctx.send_reply(&msg, Kind::Reject, Status::NotOk, None);
                return;
            }
            info!(%target, reservation = %tag, "target free, accepting");
            ctx.send_reply(&msg, Kind::Accept, Status::Ok, Some(tag));
        }
        Ok(true) => {
            info!(%target, "target already exists, rejecting");
            ctx.send_reply(&msg, Kind::Reject, Status::NotOk, None);
        }
        Err(ResponderError::Storage(StorageError::InvalidPath(reason))) => {
            warn!(%target, "invalid target path, rejecting: {reason}");
            ctx.send_reply(&msg, Kind::Reject, Status::NotOk, None);
        }
        Err(e) => {
            error!(tag = %msg.correlation_tag, %target, "existence check failed: {e}");
            if ctx.config.report_io_faults {
                ctx.send_reply(&msg, Kind::Failed, Status::IoFault, None);
            }
        }
    }
}
