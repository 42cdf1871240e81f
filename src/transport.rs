use crate::error::Result;
use crate::message::{Coverage, CreditBalance, DeliveryStatus, InboundMessage, OutboundMessage};
use async_trait::async_trait;

/// Protocol operations a concrete gateway driver supplies.
///
/// Implementations talk to one physical or virtual channel — a serial
/// modem, an SMPP bind, an HTTP aggregator API. The dispatch core
/// guarantees `connect` has completed before any other operation runs and
/// that at most `concurrency_level` operations are in flight at once;
/// wire formats and any additional internal locking are the
/// implementation's business.
///
/// Errors returned here propagate unchanged through [`crate::Gateway`];
/// the core only adds statistics accounting on the send path and forces
/// the `Error` state on lifecycle failures.
#[async_trait]
pub trait GatewayTransport: Send + Sync + 'static {
    /// Open the underlying channel. Invoked once per gateway start.
    async fn connect(&self) -> Result<()>;

    /// Close the underlying channel. Invoked once per gateway stop.
    async fn disconnect(&self) -> Result<()>;

    /// Submit one outbound message. `Ok(false)` means the channel took the
    /// request and reported an unsuccessful result. Implementations record
    /// operator message ids on `message` after a successful handoff.
    async fn send(&self, message: &mut OutboundMessage) -> Result<bool>;

    /// Remove a received message from the channel's store.
    async fn delete(&self, message: &InboundMessage) -> Result<bool>;

    /// Ask the operator for the delivery state of a submitted message part.
    async fn query_delivery_status(&self, operator_message_id: &str) -> Result<DeliveryStatus>;

    /// Ask the operator for the remaining account balance.
    async fn query_credit_balance(&self) -> Result<CreditBalance>;

    /// Ask the operator whether the destination in `request` is reachable.
    async fn query_coverage(&self, request: Coverage) -> Result<Coverage>;
}

/// Forward `GatewayTransport` through a shared handle so a single transport
/// can be held by the caller (for instrumentation) and by the gateway at
/// the same time.
#[async_trait]
impl<T: GatewayTransport + ?Sized> GatewayTransport for std::sync::Arc<T> {
    async fn connect(&self) -> Result<()> {
        (**self).connect().await
    }

    async fn disconnect(&self) -> Result<()> {
        (**self).disconnect().await
    }

    async fn send(&self, message: &mut OutboundMessage) -> Result<bool> {
        (**self).send(message).await
    }

    async fn delete(&self, message: &InboundMessage) -> Result<bool> {
        (**self).delete(message).await
    }

    async fn query_delivery_status(&self, operator_message_id: &str) -> Result<DeliveryStatus> {
        (**self).query_delivery_status(operator_message_id).await
    }

    async fn query_credit_balance(&self) -> Result<CreditBalance> {
        (**self).query_credit_balance().await
    }

    async fn query_coverage(&self, request: Coverage) -> Result<Coverage> {
        (**self).query_coverage(request).await
    }
}
