use crate::error::{GatewayError, Result};
use crate::message::MsIsdn;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// What a concrete gateway driver is able to do.
    ///
    /// Routing layers consult these before picking a gateway for a message;
    /// the dispatch core itself only carries them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Capabilities: u16 {
        const SEND_MESSAGE            = 1 << 0;
        const RECEIVE_MESSAGE         = 1 << 1;
        const SEND_BINARY             = 1 << 2;
        const SEND_UNICODE            = 1 << 3;
        const SEND_FLASH              = 1 << 4;
        const SPLIT_MESSAGES          = 1 << 5;
        const SET_SENDER_ID           = 1 << 6;
        const REQUEST_DELIVERY_REPORT = 1 << 7;
        const QUERY_DELIVERY_STATUS   = 1 << 8;
        const QUERY_CREDIT_BALANCE    = 1 << 9;
        const QUERY_COVERAGE          = 1 << 10;
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::empty()
    }
}

/// Static configuration of one gateway, fixed at construction.
///
/// `concurrency_level` bounds how many operations may touch the channel at
/// once; `dispatchers` sizes the background worker pool. Neither can change
/// for the lifetime of the gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Unique id of this gateway within a running system
    pub gateway_id: String,
    /// Free-form description, shown in logs
    pub description: String,
    /// Originator address stamped on outbound messages, where the channel
    /// supports it
    pub sender_id: MsIsdn,
    /// Relative weight used by external routing; not interpreted here
    pub priority: i32,
    /// Upper bound on the parts one logical message may be split into
    pub max_message_parts: u32,
    /// Ask the operator for delivery reports on submitted messages
    pub request_delivery_report: bool,
    /// Feature set of the underlying driver
    pub capabilities: Capabilities,
    /// Maximum number of concurrently in-flight channel operations
    pub concurrency_level: usize,
    /// Number of background dispatch workers
    pub dispatchers: usize,
}

impl GatewayConfig {
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }
}

/// Builder for [`GatewayConfig`] with validation and defaults.
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    gateway_id: Option<String>,
    description: Option<String>,
    sender_id: Option<MsIsdn>,
    priority: Option<i32>,
    max_message_parts: Option<u32>,
    request_delivery_report: Option<bool>,
    capabilities: Option<Capabilities>,
    concurrency_level: Option<usize>,
    dispatchers: Option<usize>,
}

impl GatewayConfigBuilder {
    pub fn gateway_id(mut self, v: impl Into<String>) -> Self {
        self.gateway_id = Some(v.into());
        self
    }
    pub fn description(mut self, v: impl Into<String>) -> Self {
        self.description = Some(v.into());
        self
    }
    pub fn sender_id(mut self, v: impl Into<MsIsdn>) -> Self {
        self.sender_id = Some(v.into());
        self
    }
    pub fn priority(mut self, v: i32) -> Self {
        self.priority = Some(v);
        self
    }
    pub fn max_message_parts(mut self, v: u32) -> Self {
        self.max_message_parts = Some(v);
        self
    }
    pub fn request_delivery_report(mut self, v: bool) -> Self {
        self.request_delivery_report = Some(v);
        self
    }
    pub fn capabilities(mut self, v: Capabilities) -> Self {
        self.capabilities = Some(v);
        self
    }
    pub fn concurrency_level(mut self, v: usize) -> Self {
        self.concurrency_level = Some(v);
        self
    }

    /// Size of the background dispatcher pool.
    ///
    /// When left unset the pool is sized `concurrency_level - 1`, leaving
    /// one permit free for callers that invoke `send` directly. Note that a
    /// gateway with `concurrency_level == 1` then runs **no** background
    /// dispatchers at all: queued messages sit in the outbound queue until
    /// `stop()` drains them. Set an explicit count if that is not what you
    /// want.
    pub fn dispatchers(mut self, v: usize) -> Self {
        self.dispatchers = Some(v);
        self
    }

    pub fn build(self) -> Result<GatewayConfig> {
        let gateway_id = self
            .gateway_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| GatewayError::InvalidConfig("gateway_id missing".into()))?;
        let concurrency_level = self.concurrency_level.unwrap_or(1);
        if concurrency_level == 0 {
            return Err(GatewayError::InvalidConfig(
                "concurrency_level must be at least 1".into(),
            ));
        }
        let max_message_parts = self.max_message_parts.unwrap_or(1);
        if max_message_parts == 0 {
            return Err(GatewayError::InvalidConfig(
                "max_message_parts must be at least 1".into(),
            ));
        }
        Ok(GatewayConfig {
            gateway_id,
            description: self.description.unwrap_or_default(),
            sender_id: self.sender_id.unwrap_or_default(),
            priority: self.priority.unwrap_or(0),
            max_message_parts,
            request_delivery_report: self.request_delivery_report.unwrap_or(false),
            capabilities: self.capabilities.unwrap_or_default(),
            concurrency_level,
            dispatchers: self.dispatchers.unwrap_or(concurrency_level - 1),
        })
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, 0)]
    #[case(2, 1)]
    #[case(8, 7)]
    fn test_dispatchers_default_to_concurrency_minus_one(
        #[case] concurrency_level: usize,
        #[case] expected_dispatchers: usize,
    ) {
        let config = GatewayConfig::builder()
            .gateway_id("g1")
            .concurrency_level(concurrency_level)
            .build()
            .unwrap();
        assert_eq!(config.dispatchers, expected_dispatchers);
    }

    #[test]
    fn test_explicit_dispatcher_count_wins() {
        let config = GatewayConfig::builder()
            .gateway_id("g1")
            .concurrency_level(2)
            .dispatchers(5)
            .build()
            .unwrap();
        assert_eq!(config.dispatchers, 5);
    }

    #[test]
    fn test_gateway_id_is_required() {
        assert!(matches!(
            GatewayConfig::builder().build(),
            Err(GatewayError::InvalidConfig(_))
        ));
        assert!(matches!(
            GatewayConfig::builder().gateway_id("").build(),
            Err(GatewayError::InvalidConfig(_))
        ));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(1, 0)]
    fn test_zero_bounds_are_rejected(
        #[case] concurrency_level: usize,
        #[case] max_message_parts: u32,
    ) {
        let result = GatewayConfig::builder()
            .gateway_id("g1")
            .concurrency_level(concurrency_level)
            .max_message_parts(max_message_parts)
            .build();
        assert!(matches!(result, Err(GatewayError::InvalidConfig(_))));
    }

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::builder().gateway_id("g1").build().unwrap();
        assert_eq!(config.concurrency_level, 1);
        assert_eq!(config.max_message_parts, 1);
        assert_eq!(config.priority, 0);
        assert!(!config.request_delivery_report);
        assert!(config.capabilities.is_empty());
        assert!(config.sender_id.is_empty());
    }
}
