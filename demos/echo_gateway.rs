//! Round trip against a loopback transport: start a gateway, queue a few
//! messages, watch status transitions, query the (fake) operator, stop.

use async_trait::async_trait;
use smsgate::{
    Capabilities, Coverage, CreditBalance, DeliveryStatus, Gateway, GatewayConfig,
    GatewayTransport, InboundMessage, OutboundMessage, Result,
};
use tokio::time::{sleep, Duration};
use tracing::info;

/// Pretends to be an operator: every send succeeds and is logged.
struct LoopbackTransport;

#[async_trait]
impl GatewayTransport for LoopbackTransport {
    async fn connect(&self) -> Result<()> {
        info!("loopback channel open");
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        info!("loopback channel closed");
        Ok(())
    }

    async fn send(&self, message: &mut OutboundMessage) -> Result<bool> {
        info!(recipient = %message.recipient(), text = ?message.text(), "delivering");
        message.add_operator_message_id(format!("loop-{}", message.id()));
        Ok(true)
    }

    async fn delete(&self, _message: &InboundMessage) -> Result<bool> {
        Ok(false)
    }

    async fn query_delivery_status(&self, _operator_message_id: &str) -> Result<DeliveryStatus> {
        Ok(DeliveryStatus::Delivered)
    }

    async fn query_credit_balance(&self) -> Result<CreditBalance> {
        Ok(CreditBalance { credits: 42.5 })
    }

    async fn query_coverage(&self, mut request: Coverage) -> Result<Coverage> {
        request.set_covered(true);
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = GatewayConfig::builder()
        .gateway_id("loopback-1")
        .description("loopback demo gateway")
        .sender_id("+3197000000")
        .capabilities(Capabilities::SEND_MESSAGE | Capabilities::QUERY_CREDIT_BALANCE)
        .concurrency_level(2)
        .dispatchers(2)
        .build()?;

    let gateway = Gateway::builder()
        .config(config)
        .transport(LoopbackTransport)
        .build()?;

    let mut status_events = gateway.subscribe_status();
    tokio::spawn(async move {
        while let Ok(event) = status_events.recv().await {
            info!(gateway = %event.gateway_id, ?event.old, ?event.new, "status change");
        }
    });

    gateway.start().await;

    for i in 0..5 {
        gateway.enqueue(OutboundMessage::new("+31612345678", format!("hello #{i}")))?;
    }
    while gateway.queue_len() > 0 {
        sleep(Duration::from_millis(20)).await;
    }

    let balance = gateway.query_credit_balance().await?;
    info!(%balance, "credit balance");

    let coverage = gateway.query_coverage(Coverage::new("+31612345678")).await?;
    info!(covered = coverage.is_covered(), "coverage probe");

    gateway.stop().await;
    info!(snapshot = ?gateway.statistics().snapshot(), "done");
    Ok(())
}
