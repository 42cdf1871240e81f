use crate::error::{GatewayError, Result};
use crate::message::OutboundMessage;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// FIFO of pending outbound work, shared by all dispatcher workers of one
/// gateway.
///
/// The contract is deliberately narrow: `take` never blocks (returning
/// `None` when the queue is empty), `add` refuses messages while the queue
/// is stopped, and concurrent add/take must not corrupt the queue. Storage
/// strategy is the implementation's business; gateways consume whatever the
/// embedder wires in.
pub trait OutboundQueue: Send + Sync + 'static {
    /// Begin accepting messages. Called during gateway start.
    fn start(&self) -> Result<()>;

    /// Stop accepting messages. Called during gateway stop, after the
    /// queue has been drained.
    fn stop(&self) -> Result<()>;

    /// Append one message. `Err(QueueStopped)` while stopped.
    fn add(&self, message: OutboundMessage) -> Result<bool>;

    /// Remove and return the oldest message, or `None` when empty. Never
    /// blocks.
    fn take(&self) -> Option<OutboundMessage>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory [`OutboundQueue`] used unless the embedder supplies its own.
#[derive(Debug, Default)]
pub struct MemoryOutboundQueue {
    items: Mutex<VecDeque<OutboundMessage>>,
    started: AtomicBool,
}

impl OutboundQueue for MemoryOutboundQueue {
    fn start(&self) -> Result<()> {
        self.started.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.started.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn add(&self, message: OutboundMessage) -> Result<bool> {
        if !self.started.load(Ordering::SeqCst) {
            return Err(GatewayError::QueueStopped);
        }
        self.items.lock().unwrap().push_back(message);
        Ok(true)
    }

    fn take(&self) -> Option<OutboundMessage> {
        self.items.lock().unwrap().pop_front()
    }

    fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }
}
