use crate::gateway::{Gateway, GatewayStatus};
use crate::queue::OutboundQueue;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How long an idle worker sleeps before polling the queue again.
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Spawn one background dispatch worker.
///
/// The worker loops until cancelled: take one message from the shared
/// queue, push it through the gateway's send path, repeat. Cancellation is
/// observed between iterations only — a send already in flight is always
/// run to completion, and the lifecycle machinery joins the task before
/// declaring the gateway stopped.
pub(crate) fn spawn(
    name: String,
    queue: Arc<dyn OutboundQueue>,
    gateway: Gateway,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(worker = %name, "dispatcher started");
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let Some(mut message) = queue.take() else {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(IDLE_POLL) => continue,
                }
            };
            match gateway.send(&mut message).await {
                Ok(true) => {}
                Ok(false) if gateway.status() != GatewayStatus::Started => {
                    // Declined by the readiness check, not refused by the
                    // operator: hand it back for routing elsewhere.
                    gateway.reroute(message).await;
                }
                Ok(false) => {
                    warn!(worker = %name, message_id = %message.id(), "send reported failure");
                }
                Err(e) => {
                    warn!(worker = %name, message_id = %message.id(), error = %e, "send raised");
                }
            }
        }
        debug!(worker = %name, "dispatcher stopped");
    })
}
