//! Private per-actor message queue.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use storecopy_protocol::{NegotiationMessage, Template};
use tokio::sync::Notify;

use crate::FabricError;

/// Messages a mailbox holds before refusing further deliveries.
pub const MAILBOX_CAPACITY: usize = 1024;

pub(crate) struct Mailbox {
    queue: Mutex<VecDeque<NegotiationMessage>>,
    capacity: usize,
    arrived: Notify,
    closed: AtomicBool,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self::with_capacity(MAILBOX_CAPACITY)
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            capacity,
            arrived: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn push(&self, msg: NegotiationMessage) -> Result<(), FabricError> {
        if self.is_closed() {
            return Err(FabricError::Closed);
        }
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        if queue.len() >= self.capacity {
            return Err(FabricError::MailboxFull(msg.receiver.to_string()));
        }
        queue.push_back(msg);
        drop(queue);
        // Several loops may wait on one mailbox with different templates.
        self.arrived.notify_waiters();
        Ok(())
    }

    /// Removes and returns the oldest message matching `template`.
    pub(crate) fn take_matching(&self, template: &Template) -> Option<NegotiationMessage> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        let index = queue.iter().position(|m| template.matches(m))?;
        queue.remove(index)
    }

    /// Waits until a message matching `template` is available.
    pub(crate) async fn wait_matching(
        &self,
        template: &Template,
    ) -> Result<NegotiationMessage, FabricError> {
        loop {
            // Register interest before checking the queue so a push between
            // the check and the await is not lost.
            let notified = self.arrived.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(msg) = self.take_matching(template) {
                return Ok(msg);
            }
            if self.is_closed() {
                return Err(FabricError::Closed);
            }
            notified.await;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.arrived.notify_waiters();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
