#![doc = include_str!("../README.md")]
#![warn(rustdoc::broken_intra_doc_links)]
#![deny(warnings)]
pub mod config;
mod dispatcher;
pub mod error;
pub mod gateway;
pub mod message;
pub mod queue;
pub mod routing;
pub mod statistics;
pub mod transport;

pub use config::{Capabilities, GatewayConfig, GatewayConfigBuilder};
pub use error::{GatewayError, Result};
pub use gateway::{Gateway, GatewayBuilder, GatewayStatus, StatusChange};
pub use message::{
    Coverage, CreditBalance, DeliveryStatus, InboundMessage, MsIsdn, OutboundMessage, Payload,
};
pub use queue::{MemoryOutboundQueue, OutboundQueue};
pub use routing::{ChannelRouter, DiscardRouter, MessageRouter};
pub use statistics::{Statistics, StatisticsSnapshot};
pub use transport::GatewayTransport;
