//! Drain-and-reroute across two gateways: stop the primary while work is
//! still queued and feed the drained messages to a backup gateway, with a
//! shared process-wide statistics aggregate.

use async_trait::async_trait;
use smsgate::{
    ChannelRouter, Coverage, CreditBalance, DeliveryStatus, Gateway, GatewayConfig,
    GatewayTransport, InboundMessage, OutboundMessage, Result, Statistics,
};
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::info;

/// A deliberately slow operator link, so the primary still has queued work
/// when we pull the plug.
struct SlowTransport {
    name: &'static str,
    delay: Duration,
}

#[async_trait]
impl GatewayTransport for SlowTransport {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn disconnect(&self) -> Result<()> {
        Ok(())
    }

    async fn send(&self, message: &mut OutboundMessage) -> Result<bool> {
        sleep(self.delay).await;
        info!(via = self.name, recipient = %message.recipient(), "delivered");
        Ok(true)
    }

    async fn delete(&self, _message: &InboundMessage) -> Result<bool> {
        Ok(false)
    }

    async fn query_delivery_status(&self, _operator_message_id: &str) -> Result<DeliveryStatus> {
        Ok(DeliveryStatus::Pending)
    }

    async fn query_credit_balance(&self) -> Result<CreditBalance> {
        Ok(CreditBalance::default())
    }

    async fn query_coverage(&self, request: Coverage) -> Result<Coverage> {
        Ok(request)
    }
}

fn gateway_config(id: &str, priority: i32) -> Result<GatewayConfig> {
    GatewayConfig::builder()
        .gateway_id(id)
        .description("failover demo")
        .priority(priority)
        .concurrency_level(2)
        .dispatchers(1)
        .build()
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let global = Arc::new(Statistics::default());
    let (router, mut drained) = ChannelRouter::new();

    let primary = Gateway::builder()
        .config(gateway_config("primary", 10)?)
        .transport(SlowTransport {
            name: "primary",
            delay: Duration::from_millis(200),
        })
        .router(router)
        .global_statistics(global.clone())
        .build()?;

    let backup = Gateway::builder()
        .config(gateway_config("backup", 1)?)
        .transport(SlowTransport {
            name: "backup",
            delay: Duration::from_millis(10),
        })
        .global_statistics(global.clone())
        .build()?;

    primary.start().await;
    backup.start().await;

    for i in 0..8 {
        primary.enqueue(OutboundMessage::new("+31688888888", format!("job {i}")))?;
    }

    // Let the slow primary work through a couple of jobs, then stop it.
    sleep(Duration::from_millis(500)).await;
    primary.stop().await;

    let mut rerouted = 0;
    while let Ok(message) = drained.try_recv() {
        info!(message_id = %message.id(), "rerouting to backup");
        backup.enqueue(message)?;
        rerouted += 1;
    }
    info!(rerouted, "primary drained");

    while backup.queue_len() > 0 {
        sleep(Duration::from_millis(20)).await;
    }
    backup.stop().await;

    info!(
        primary = ?primary.statistics().snapshot(),
        backup = ?backup.statistics().snapshot(),
        global = ?global.snapshot(),
        "all messages accounted for"
    );
    Ok(())
}
