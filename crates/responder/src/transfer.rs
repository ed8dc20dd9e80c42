//! Transfer loop: answers COMMIT by copying into the reserved target.

use std::path::PathBuf;
use std::sync::Arc;

use storecopy_protocol::{Kind, NegotiationMessage, Status, Template};
use storecopy_storage::{FileStatus, Storage, copy_stream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::ResponderError;
use crate::responder::Context;

/// Consumes COMMIT messages until cancelled or the mailbox closes.
pub(crate) async fn transfer_loop(ctx: Arc<Context>, cancel: CancellationToken) {
    let template = Template::protocol().with_kind(Kind::Commit);
    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = ctx.endpoint.receive(&template) => match result {
                Ok(msg) => msg,
                Err(e) => {
                    debug!("transfer loop stopping: {e}");
                    break;
                }
            },
        };
        handle_commit(&ctx, msg).await;
    }
    debug!("transfer loop stopped");
}

/// Answers a single COMMIT.
pub(crate) async fn handle_commit(ctx: &Context, msg: NegotiationMessage) {
    let reservation = msg
        .in_reply_to
        .as_ref()
        .and_then(|tag| ctx.reservations.take(tag, &msg.sender));

    let Some(reservation) = reservation else {
        warn!(
            tag = %msg.correlation_tag,
            from = %msg.sender,
            "COMMIT names no reservation held by its sender"
        );
        ctx.send_reply(&msg, Kind::Failed, Status::FailedCopy, None);
        return;
    };

    let waited = reservation.accepted_at.elapsed();
    let target = reservation.target_path;
    let source = PathBuf::from(&msg.payload);
    info!(source = %source.display(), %target, ?waited, "copying");

    let storage = Arc::clone(&ctx.storage);
    let buffer_size = ctx.config.copy_buffer_size;
    let copy_target = target.clone();
    let result = crate::run_blocking(move || {
        copy_and_stat(storage.as_ref(), &source, &copy_target, buffer_size)
    })
    .await;
    ctx.reservations.release(&target);

    match result {
        Ok((bytes, status)) if status.is_regular_file => {
            info!(%target, bytes, "copy succeeded");
            ctx.record_written(&target);
            ctx.send_reply(&msg, Kind::Done, Status::Success, None);
        }
        Ok((bytes, _)) => {
            warn!(%target, bytes, "copy finished but target is not a regular file");
            ctx.send_reply(&msg, Kind::Failed, Status::FailedCopy, None);
        }
        Err(e) => {
            error!(tag = %msg.correlation_tag, %target, "copy failed: {e}");
            if ctx.config.report_io_faults {
                ctx.send_reply(&msg, Kind::Failed, Status::IoFault, None);
            }
        }
    }
}

/// Copies `source` into a new object at `target` and stats the result.
///
/// Both streams are dropped before returning, on every path.
fn copy_and_stat(
    storage: &dyn Storage,
    source: &std::path::Path,
    target: &str,
    buffer_size: usize,
) -> Result<(u64, FileStatus), ResponderError> {
    // Open the source first so a missing source never leaves an empty
    // object behind in the write-once namespace.
    let reader = storage.open_source(source)?;
    let mut writer = storage.create(target)?;
    let bytes = copy_stream(reader, &mut writer, buffer_size)?;
    drop(writer);

    let status = storage.stat(target)?;
    Ok((bytes, status))
}
