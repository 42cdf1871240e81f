use crate::message::OutboundMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::warn;

/// Process-wide re-queue sink.
///
/// When a gateway stops, every message still waiting in its outbound queue
/// is handed here exactly once so the embedding application can route it
/// through another gateway. The gateway treats the sink as infallible; a
/// sink that cannot keep the message is expected to log it rather than
/// fail the drain.
#[async_trait]
pub trait MessageRouter: Send + Sync + 'static {
    async fn requeue(&self, message: OutboundMessage);
}

/// Forwards re-queued messages into a channel owned by the embedder.
pub struct ChannelRouter {
    tx: mpsc::UnboundedSender<OutboundMessage>,
}

impl ChannelRouter {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl MessageRouter for ChannelRouter {
    async fn requeue(&self, message: OutboundMessage) {
        let message_id = message.id();
        if self.tx.send(message).is_err() {
            warn!(message_id = %message_id, "re-route receiver dropped, message discarded");
        }
    }
}

/// Default sink when the embedder wires no router: the message is dropped,
/// but never without a trace.
#[derive(Debug, Default)]
pub struct DiscardRouter;

#[async_trait]
impl MessageRouter for DiscardRouter {
    async fn requeue(&self, message: OutboundMessage) {
        warn!(
            message_id = %message.id(),
            recipient = %message.recipient(),
            "no message router configured, discarding drained message"
        );
    }
}
