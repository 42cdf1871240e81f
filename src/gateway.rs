use crate::config::GatewayConfig;
use crate::dispatcher;
use crate::error::{GatewayError, Result};
use crate::message::{Coverage, CreditBalance, DeliveryStatus, InboundMessage, OutboundMessage};
use crate::queue::{MemoryOutboundQueue, OutboundQueue};
use crate::routing::{DiscardRouter, MessageRouter};
use crate::statistics::Statistics;
use crate::transport::GatewayTransport;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::{broadcast, Mutex as AsyncMutex, Semaphore, SemaphorePermit};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const STATUS_EVENT_CAPACITY: usize = 32;

/// Lifecycle state of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayStatus {
    Starting,
    Started,
    Stopping,
    Stopped,
    Error,
}

/// Emitted on every status transition.
///
/// Delivery is fire-and-forget over a broadcast channel: a slow or absent
/// subscriber never blocks the lifecycle transition that produced the
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub gateway_id: String,
    pub old: GatewayStatus,
    pub new: GatewayStatus,
}

/// One messaging gateway: lifecycle, concurrency admission, background
/// dispatch, statistics.
///
/// A `Gateway` wraps a [`GatewayTransport`] — the protocol-specific driver
/// for a modem or provider API — and supplies everything that is common
/// regardless of protocol: no operation touches the channel unless the
/// gateway is `Started`, at most `concurrency_level` operations run at
/// once, queued messages are dispatched by background workers, and a stop
/// drains undispatched work to a [`MessageRouter`] instead of losing it.
///
/// Handles are cheap to clone and share one underlying gateway. Dropping
/// the last handle does not stop a started gateway; call [`Gateway::stop`].
#[derive(Clone)]
pub struct Gateway {
    inner: Arc<Inner>,
}

struct Inner {
    config: GatewayConfig,
    transport: Arc<dyn GatewayTransport>,
    queue: Arc<dyn OutboundQueue>,
    router: Arc<dyn MessageRouter>,
    statistics: Arc<Statistics>,
    global_statistics: Arc<Statistics>,
    status: RwLock<GatewayStatus>,
    status_tx: broadcast::Sender<StatusChange>,
    /// Serializes start/stop; held across the whole transition.
    lifecycle: AsyncMutex<Workers>,
    /// Admission gate: at most `concurrency_level` transport operations in
    /// flight, fair FIFO ordering.
    gate: Semaphore,
    /// 0 means unseeded; see [`Gateway::next_multipart_reference`].
    multipart_ref: Mutex<u16>,
}

#[derive(Default)]
struct Workers {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Gateway {
    pub fn builder() -> GatewayBuilder {
        GatewayBuilder::default()
    }

    pub fn id(&self) -> &str {
        &self.inner.config.gateway_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    pub fn status(&self) -> GatewayStatus {
        *self.inner.status.read().unwrap()
    }

    /// Counters for this gateway alone. The shared aggregate passed to
    /// [`GatewayBuilder::global_statistics`] receives the same increments.
    pub fn statistics(&self) -> &Statistics {
        &self.inner.statistics
    }

    /// Subscribe to status transitions. Events are dropped, not queued
    /// indefinitely, when a subscriber falls behind.
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusChange> {
        self.inner.status_tx.subscribe()
    }

    /// Transition to `Started`.
    ///
    /// Allowed from `Stopped` and `Error`: starts the outbound queue,
    /// connects the transport, spawns the dispatcher pool. On any failure
    /// the stop sequence runs as best-effort cleanup (its own errors are
    /// logged, not escalated) and the gateway lands in `Error`. Calling
    /// this in any other state is a no-op. Returns whether the gateway is
    /// `Started` afterwards.
    pub async fn start(&self) -> bool {
        let mut workers = self.inner.lifecycle.lock().await;
        if !matches!(self.status(), GatewayStatus::Stopped | GatewayStatus::Error) {
            return self.status() == GatewayStatus::Started;
        }
        self.set_status(GatewayStatus::Starting);
        info!(gateway = %self, "starting gateway");
        if let Err(e) = self.start_sequence(&mut workers).await {
            error!(gateway = %self, error = %e, "gateway failed to start");
            if let Err(e) = self.stop_sequence(&mut workers).await {
                error!(gateway = %self, error = %e, "cleanup after failed start also failed");
            }
            self.set_status(GatewayStatus::Error);
        }
        self.status() == GatewayStatus::Started
    }

    /// Transition to `Stopped`.
    ///
    /// Allowed from `Started` and `Error`: cancels every dispatcher, waits
    /// for each to finish its current iteration, drains the queue into the
    /// router so no message is silently lost, then stops the queue and
    /// disconnects the transport. Any failure lands the gateway in
    /// `Error`. Calling this in any other state is a no-op. Returns
    /// whether the gateway is `Stopped` afterwards.
    pub async fn stop(&self) -> bool {
        let mut workers = self.inner.lifecycle.lock().await;
        if !matches!(self.status(), GatewayStatus::Started | GatewayStatus::Error) {
            return self.status() == GatewayStatus::Stopped;
        }
        self.set_status(GatewayStatus::Stopping);
        info!(gateway = %self, "stopping gateway");
        if let Err(e) = self.stop_sequence(&mut workers).await {
            error!(gateway = %self, error = %e, "gateway failed to stop");
            self.set_status(GatewayStatus::Error);
        }
        self.status() == GatewayStatus::Stopped
    }

    async fn start_sequence(&self, workers: &mut Workers) -> Result<()> {
        self.inner.queue.start()?;
        self.inner.transport.connect().await?;
        let cancel = CancellationToken::new();
        let mut handles = Vec::with_capacity(self.inner.config.dispatchers);
        for i in 0..self.inner.config.dispatchers {
            let name = format!("dispatcher-{} [{}]", i, self.inner.config.gateway_id);
            handles.push(dispatcher::spawn(
                name,
                Arc::clone(&self.inner.queue),
                self.clone(),
                cancel.child_token(),
            ));
        }
        workers.cancel = cancel;
        workers.handles = handles;
        self.set_status(GatewayStatus::Started);
        Ok(())
    }

    async fn stop_sequence(&self, workers: &mut Workers) -> Result<()> {
        workers.cancel.cancel();
        for result in futures::future::join_all(workers.handles.drain(..)).await {
            if let Err(e) = result {
                error!(gateway = %self, error = %e, "dispatcher terminated abnormally");
            }
        }
        let mut drained = 0usize;
        while let Some(message) = self.inner.queue.take() {
            self.inner.router.requeue(message).await;
            drained += 1;
        }
        if drained > 0 {
            info!(gateway = %self, drained, "handed undispatched messages to the router");
        }
        self.set_status(GatewayStatus::Stopped);
        self.inner.queue.stop()?;
        self.inner.transport.disconnect().await?;
        Ok(())
    }

    /// Submit one message through the concurrency gate.
    ///
    /// Returns `Ok(false)` without touching the channel when the gateway is
    /// not `Started`, or when the channel accepted the request and reported
    /// an unsuccessful result. A transport error is recorded as a failure
    /// on the gateway and global counters, then returned unchanged.
    pub async fn send(&self, message: &mut OutboundMessage) -> Result<bool> {
        if self.status() != GatewayStatus::Started {
            warn!(
                gateway = %self,
                message_id = %message.id(),
                status = ?self.status(),
                "outbound message routed via non-started gateway"
            );
            return Ok(false);
        }
        let _permit = self.acquire_gate().await?;
        match self.inner.transport.send(message).await {
            Ok(true) => {
                self.inner.statistics.record_sent();
                self.inner.global_statistics.record_sent();
                Ok(true)
            }
            Ok(false) => {
                self.inner.statistics.record_failed();
                self.inner.global_statistics.record_failed();
                Ok(false)
            }
            Err(e) => {
                self.inner.statistics.record_failure();
                self.inner.global_statistics.record_failure();
                Err(e)
            }
        }
    }

    /// Remove a received message from the channel's store.
    ///
    /// Returns `Ok(false)` without touching the channel when the gateway
    /// is not `Started`.
    pub async fn delete(&self, message: &InboundMessage) -> Result<bool> {
        if self.status() != GatewayStatus::Started {
            warn!(
                gateway = %self,
                message = %message,
                status = ?self.status(),
                "delete requested via non-started gateway"
            );
            return Ok(false);
        }
        let _permit = self.acquire_gate().await?;
        self.inner.transport.delete(message).await
    }

    /// Delivery state of `message`, keyed by its first recorded operator
    /// message id.
    pub async fn query_delivery_status(&self, message: &OutboundMessage) -> Result<DeliveryStatus> {
        let operator_id = message
            .operator_message_ids()
            .first()
            .ok_or(GatewayError::NoOperatorMessageId(message.id()))?;
        self.query_delivery_status_by_id(operator_id).await
    }

    /// Delivery state of the message part the operator knows by
    /// `operator_message_id`.
    pub async fn query_delivery_status_by_id(
        &self,
        operator_message_id: &str,
    ) -> Result<DeliveryStatus> {
        let _permit = self.acquire_gate().await?;
        self.inner
            .transport
            .query_delivery_status(operator_message_id)
            .await
    }

    pub async fn query_credit_balance(&self) -> Result<CreditBalance> {
        let _permit = self.acquire_gate().await?;
        self.inner.transport.query_credit_balance().await
    }

    pub async fn query_coverage(&self, request: Coverage) -> Result<Coverage> {
        let _permit = self.acquire_gate().await?;
        self.inner.transport.query_coverage(request).await
    }

    /// Hand a message to the background dispatchers.
    pub fn enqueue(&self, message: OutboundMessage) -> Result<bool> {
        debug!(gateway = %self, message_id = %message.id(), "enqueue");
        self.inner.queue.add(message)
    }

    /// Number of messages waiting in the outbound queue.
    pub fn queue_len(&self) -> usize {
        self.inner.queue.len()
    }

    /// Next reference id for correlating the parts of one segmented
    /// message.
    ///
    /// Seeded lazily from randomness on first use, then cycles through
    /// `[1, 65536)`; 0 stays reserved as the unseeded marker and is never
    /// returned. References repeat once more than 65535 multipart sends
    /// are in flight, which receiving networks tolerate in practice.
    pub fn next_multipart_reference(&self) -> u16 {
        let mut current = self.inner.multipart_ref.lock().unwrap();
        if *current == 0 {
            *current = rand::thread_rng().gen_range(0..=u16::MAX);
        }
        *current = current.wrapping_add(1);
        if *current == 0 {
            *current = 1;
        }
        *current
    }

    pub(crate) async fn reroute(&self, message: OutboundMessage) {
        self.inner.router.requeue(message).await;
    }

    async fn acquire_gate(&self) -> Result<SemaphorePermit<'_>> {
        // The permit is released on drop, on every exit path.
        self.inner
            .gate
            .acquire()
            .await
            .map_err(|_| GatewayError::Cancelled)
    }

    fn set_status(&self, new: GatewayStatus) {
        let old = {
            let mut status = self.inner.status.write().unwrap();
            std::mem::replace(&mut *status, new)
        };
        // Non-blocking; an absent subscriber is not an error.
        let _ = self.inner.status_tx.send(StatusChange {
            gateway_id: self.inner.config.gateway_id.clone(),
            old,
            new,
        });
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.inner.config.gateway_id, self.inner.config.description
        )
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("gateway_id", &self.inner.config.gateway_id)
            .field("status", &self.status())
            .finish()
    }
}

/// Builder for [`Gateway`].
///
/// `config` and `transport` are required; the queue defaults to
/// [`MemoryOutboundQueue`], the router to [`DiscardRouter`], and the global
/// statistics aggregate to a fresh standalone instance.
#[derive(Default)]
pub struct GatewayBuilder {
    config: Option<GatewayConfig>,
    transport: Option<Arc<dyn GatewayTransport>>,
    queue: Option<Arc<dyn OutboundQueue>>,
    router: Option<Arc<dyn MessageRouter>>,
    global_statistics: Option<Arc<Statistics>>,
}

impl GatewayBuilder {
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn transport(mut self, transport: impl GatewayTransport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn queue(mut self, queue: impl OutboundQueue) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    pub fn router(mut self, router: impl MessageRouter) -> Self {
        self.router = Some(Arc::new(router));
        self
    }

    /// Process-wide aggregate mirroring every per-gateway increment. Pass
    /// the same `Arc` to every gateway in the system.
    pub fn global_statistics(mut self, statistics: Arc<Statistics>) -> Self {
        self.global_statistics = Some(statistics);
        self
    }

    pub fn build(self) -> Result<Gateway> {
        let config = self
            .config
            .ok_or_else(|| GatewayError::InvalidConfig("config missing".into()))?;
        let transport = self
            .transport
            .ok_or_else(|| GatewayError::InvalidConfig("transport missing".into()))?;
        let (status_tx, _) = broadcast::channel(STATUS_EVENT_CAPACITY);
        Ok(Gateway {
            inner: Arc::new(Inner {
                transport,
                queue: self
                    .queue
                    .unwrap_or_else(|| Arc::new(MemoryOutboundQueue::default())),
                router: self.router.unwrap_or_else(|| Arc::new(DiscardRouter)),
                statistics: Arc::new(Statistics::default()),
                global_statistics: self.global_statistics.unwrap_or_default(),
                status: RwLock::new(GatewayStatus::Stopped),
                status_tx,
                lifecycle: AsyncMutex::new(Workers::default()),
                gate: Semaphore::new(config.concurrency_level),
                multipart_ref: Mutex::new(0),
                config,
            }),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::routing::ChannelRouter;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::{sleep, Duration};

    /// Transport whose connect/send outcomes are scripted per call; any
    /// unscripted call succeeds.
    #[derive(Default)]
    struct ScriptedTransport {
        connect_results: Mutex<VecDeque<Result<()>>>,
        send_results: Mutex<VecDeque<Result<bool>>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        send_delay: Option<Duration>,
    }

    impl ScriptedTransport {
        fn with_send_results(results: Vec<Result<bool>>) -> Self {
            Self {
                send_results: Mutex::new(results.into()),
                ..Default::default()
            }
        }

        fn with_connect_results(results: Vec<Result<()>>) -> Self {
            Self {
                connect_results: Mutex::new(results.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl GatewayTransport for ScriptedTransport {
        async fn connect(&self) -> Result<()> {
            self.connect_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(()))
        }

        async fn disconnect(&self) -> Result<()> {
            Ok(())
        }

        async fn send(&self, _message: &mut OutboundMessage) -> Result<bool> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            if let Some(delay) = self.send_delay {
                sleep(delay).await;
            }
            let result = self
                .send_results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(true));
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        }

        async fn delete(&self, _message: &InboundMessage) -> Result<bool> {
            Ok(true)
        }

        async fn query_delivery_status(&self, _operator_message_id: &str) -> Result<DeliveryStatus> {
            Ok(DeliveryStatus::Delivered)
        }

        async fn query_credit_balance(&self) -> Result<CreditBalance> {
            Ok(CreditBalance { credits: 10.0 })
        }

        async fn query_coverage(&self, mut request: Coverage) -> Result<Coverage> {
            request.set_covered(true);
            Ok(request)
        }
    }

    fn gateway_with(transport: ScriptedTransport, concurrency_level: usize) -> Gateway {
        let config = GatewayConfig::builder()
            .gateway_id("test-gw")
            .description("unit test gateway")
            .concurrency_level(concurrency_level)
            .dispatchers(0)
            .build()
            .unwrap();
        Gateway::builder()
            .config(config)
            .transport(transport)
            .build()
            .unwrap()
    }

    fn message() -> OutboundMessage {
        OutboundMessage::new("+491710000", "test")
    }

    #[tokio::test]
    async fn test_start_and_stop_are_idempotent() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);

        // stop() on a never-started gateway is a successful no-op
        assert!(gateway.stop().await);
        assert_eq!(gateway.status(), GatewayStatus::Stopped);

        assert!(gateway.start().await);
        assert!(gateway.start().await);
        assert_eq!(gateway.status(), GatewayStatus::Started);

        assert!(gateway.stop().await);
        assert!(gateway.stop().await);
        assert_eq!(gateway.status(), GatewayStatus::Stopped);
    }

    #[tokio::test]
    async fn test_send_requires_started_gateway() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        let mut msg = message();

        assert!(!gateway.send(&mut msg).await.unwrap());
        assert_eq!(gateway.statistics().snapshot(), Default::default());
    }

    #[tokio::test]
    async fn test_delete_requires_started_gateway() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        let inbound = InboundMessage::new("+4912345", "hi", "SM-3");
        assert!(!gateway.delete(&inbound).await.unwrap());
    }

    #[tokio::test]
    async fn test_send_outcomes_map_to_statistics() {
        let transport = ScriptedTransport::with_send_results(vec![
            Ok(true),
            Ok(true),
            Ok(false),
            Err(GatewayError::Transport("SMSC rejected bind".into())),
        ]);
        let global = Arc::new(Statistics::default());
        let config = GatewayConfig::builder()
            .gateway_id("stats-gw")
            .concurrency_level(1)
            .dispatchers(0)
            .build()
            .unwrap();
        let gateway = Gateway::builder()
            .config(config)
            .transport(transport)
            .global_statistics(global.clone())
            .build()
            .unwrap();
        gateway.start().await;

        assert!(gateway.send(&mut message()).await.unwrap());
        assert!(gateway.send(&mut message()).await.unwrap());
        assert!(!gateway.send(&mut message()).await.unwrap());
        let err = gateway.send(&mut message()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport(_)));

        let snapshot = gateway.statistics().snapshot();
        assert_eq!(snapshot.total_sent, 2);
        assert_eq!(snapshot.total_failed, 1);
        assert_eq!(snapshot.total_failures, 1);
        assert_eq!(global.snapshot(), snapshot);
    }

    #[tokio::test]
    async fn test_global_statistics_aggregate_across_gateways() {
        let global = Arc::new(Statistics::default());
        let mut gateways = Vec::new();
        for i in 0..2 {
            let config = GatewayConfig::builder()
                .gateway_id(format!("gw-{i}"))
                .concurrency_level(1)
                .dispatchers(0)
                .build()
                .unwrap();
            let gateway = Gateway::builder()
                .config(config)
                .transport(ScriptedTransport::default())
                .global_statistics(global.clone())
                .build()
                .unwrap();
            gateway.start().await;
            gateways.push(gateway);
        }

        for gateway in &gateways {
            assert!(gateway.send(&mut message()).await.unwrap());
        }

        let per_gateway: u64 = gateways
            .iter()
            .map(|g| g.statistics().total_sent())
            .sum();
        assert_eq!(per_gateway, 2);
        assert_eq!(global.total_sent(), 2);
    }

    #[tokio::test]
    async fn test_failed_start_forces_error_then_recovers() {
        let transport = ScriptedTransport::with_connect_results(vec![Err(
            GatewayError::Transport("modem did not answer".into()),
        )]);
        let gateway = gateway_with(transport, 1);

        assert!(!gateway.start().await);
        assert_eq!(gateway.status(), GatewayStatus::Error);

        // start() is allowed again from Error; the next connect succeeds
        assert!(gateway.start().await);
        assert_eq!(gateway.status(), GatewayStatus::Started);
    }

    #[tokio::test]
    async fn test_status_transitions_are_observable() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        let mut events = gateway.subscribe_status();

        gateway.start().await;
        gateway.stop().await;

        let expected = [
            (GatewayStatus::Stopped, GatewayStatus::Starting),
            (GatewayStatus::Starting, GatewayStatus::Started),
            (GatewayStatus::Started, GatewayStatus::Stopping),
            (GatewayStatus::Stopping, GatewayStatus::Stopped),
        ];
        for (old, new) in expected {
            let event = events.recv().await.unwrap();
            assert_eq!((event.old, event.new), (old, new));
            assert_eq!(event.gateway_id, "test-gw");
        }
    }

    #[tokio::test]
    async fn test_stop_drains_queue_to_router() {
        let (router, mut rerouted) = ChannelRouter::new();
        let config = GatewayConfig::builder()
            .gateway_id("drain-gw")
            .concurrency_level(1)
            .dispatchers(0)
            .build()
            .unwrap();
        let gateway = Gateway::builder()
            .config(config)
            .transport(ScriptedTransport::default())
            .router(router)
            .build()
            .unwrap();
        gateway.start().await;

        let ids: Vec<_> = (0..3)
            .map(|_| {
                let msg = message();
                let id = msg.id();
                gateway.enqueue(msg).unwrap();
                id
            })
            .collect();
        assert_eq!(gateway.queue_len(), 3);

        assert!(gateway.stop().await);
        assert_eq!(gateway.queue_len(), 0);
        for id in ids {
            assert_eq!(rerouted.recv().await.unwrap().id(), id);
        }
        assert!(rerouted.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_enqueue_requires_started_queue() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        assert!(matches!(
            gateway.enqueue(message()),
            Err(GatewayError::QueueStopped)
        ));

        gateway.start().await;
        assert!(gateway.enqueue(message()).unwrap());
    }

    #[tokio::test]
    async fn test_query_delivery_status_needs_operator_id() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        gateway.start().await;

        let mut msg = message();
        assert!(matches!(
            gateway.query_delivery_status(&msg).await,
            Err(GatewayError::NoOperatorMessageId(_))
        ));

        msg.add_operator_message_id("op-77");
        assert_eq!(
            gateway.query_delivery_status(&msg).await.unwrap(),
            DeliveryStatus::Delivered
        );
    }

    #[tokio::test]
    async fn test_query_coverage_round_trips_through_driver() {
        let gateway = gateway_with(ScriptedTransport::default(), 1);
        gateway.start().await;

        let coverage = gateway
            .query_coverage(Coverage::new("+31612345"))
            .await
            .unwrap();
        assert!(coverage.is_covered());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_gate_high_water_mark_never_exceeds_limit() {
        let transport = Arc::new(ScriptedTransport {
            send_delay: Some(Duration::from_millis(25)),
            ..Default::default()
        });
        let config = GatewayConfig::builder()
            .gateway_id("gate-gw")
            .concurrency_level(2)
            .dispatchers(0)
            .build()
            .unwrap();
        let gateway = Gateway::builder()
            .config(config)
            .transport(transport.clone())
            .build()
            .unwrap();
        gateway.start().await;

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let gateway = gateway.clone();
                tokio::spawn(async move {
                    let mut msg = message();
                    gateway.send(&mut msg).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert!(transport.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(gateway.statistics().total_sent(), 6);
    }

    #[test]
    fn test_multipart_reference_cycles_through_full_window() {
        let config = GatewayConfig::builder()
            .gateway_id("ref-gw")
            .build()
            .unwrap();
        let gateway = Gateway::builder()
            .config(config)
            .transport(ScriptedTransport::default())
            .build()
            .unwrap();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..65535 {
            let reference = gateway.next_multipart_reference();
            assert_ne!(reference, 0);
            assert!(seen.insert(reference), "reference {reference} repeated");
        }
        // Full window visited; the next call must wrap into a repeat.
        assert_eq!(seen.len(), 65535);
        assert!(seen.contains(&gateway.next_multipart_reference()));
    }
}
