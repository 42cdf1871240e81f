use thiserror::Error;
use uuid::Uuid;

/// Error types that can occur in the gateway dispatch core.
///
/// This enum represents the error conditions that can arise while driving
/// a messaging channel: transport failures surfaced by a concrete gateway
/// driver, lifecycle sequencing problems, and local misuse such as invalid
/// configuration.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The underlying channel reported a transport-level failure
    #[error("transport error: {0}")]
    Transport(String),

    /// The channel returned a response the driver could not parse
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// An operation exceeded the driver's internal deadline
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// The caller was cancelled while waiting for admission or inside a driver
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration validation failed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The outbound queue is not accepting messages
    #[error("outbound queue is stopped")]
    QueueStopped,

    /// The message has not been assigned an operator message id yet
    #[error("no operator message id recorded for message {0}")]
    NoOperatorMessageId(Uuid),

    /// An unexpected failure during start/stop sequencing
    #[error("lifecycle error: {0}")]
    Lifecycle(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
