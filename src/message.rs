use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A normalized phone-number-like identifier (MSISDN).
///
/// Separator characters are stripped on construction so that two spellings
/// of the same number compare equal; a leading `+` is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MsIsdn(String);

impl MsIsdn {
    pub fn new(address: impl AsRef<str>) -> Self {
        let raw = address.as_ref().trim();
        let mut normalized = String::with_capacity(raw.len());
        for (i, c) in raw.chars().enumerate() {
            if (c == '+' && i == 0) || c.is_ascii_digit() {
                normalized.push(c);
            }
        }
        MsIsdn(normalized)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MsIsdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MsIsdn {
    fn from(address: &str) -> Self {
        MsIsdn::new(address)
    }
}

impl From<String> for MsIsdn {
    fn from(address: String) -> Self {
        MsIsdn::new(address)
    }
}

/// Body of an outbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    /// Plain text, encoded by the driver as the channel requires
    Text(String),
    /// Raw binary content sent as-is (ringtones, WAP push, vendor blobs)
    Binary(Bytes),
}

/// One message waiting to be, or already, submitted through a gateway.
///
/// The submitting driver records the operator-assigned message ids after a
/// successful handoff; those ids key later delivery-status queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundMessage {
    id: Uuid,
    recipient: MsIsdn,
    payload: Payload,
    created_at: DateTime<Utc>,
    operator_message_ids: Vec<String>,
}

impl OutboundMessage {
    pub fn new(recipient: impl Into<MsIsdn>, text: impl Into<String>) -> Self {
        Self::with_payload(recipient, Payload::Text(text.into()))
    }

    pub fn binary(recipient: impl Into<MsIsdn>, payload: Bytes) -> Self {
        Self::with_payload(recipient, Payload::Binary(payload))
    }

    fn with_payload(recipient: impl Into<MsIsdn>, payload: Payload) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: recipient.into(),
            payload,
            created_at: Utc::now(),
            operator_message_ids: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn recipient(&self) -> &MsIsdn {
        &self.recipient
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Text body, if this is a text message.
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Ids the operator assigned on submission, one per transmitted part.
    pub fn operator_message_ids(&self) -> &[String] {
        &self.operator_message_ids
    }

    pub fn add_operator_message_id(&mut self, operator_message_id: impl Into<String>) {
        self.operator_message_ids.push(operator_message_id.into());
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.id, self.recipient)
    }
}

/// A message received through a gateway's channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    originator: MsIsdn,
    text: String,
    received_at: DateTime<Utc>,
    /// Where the channel holds the message (SIM slot, provider handle);
    /// needed to delete it from the channel's store.
    memory_location: String,
}

impl InboundMessage {
    pub fn new(
        originator: impl Into<MsIsdn>,
        text: impl Into<String>,
        memory_location: impl Into<String>,
    ) -> Self {
        Self {
            originator: originator.into(),
            text: text.into(),
            received_at: Utc::now(),
            memory_location: memory_location.into(),
        }
    }

    pub fn originator(&self) -> &MsIsdn {
        &self.originator
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }

    pub fn memory_location(&self) -> &str {
        &self.memory_location
    }
}

impl fmt::Display for InboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.originator, self.memory_location)
    }
}

/// Delivery state of a previously submitted message, as reported by the
/// operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryStatus {
    /// The operator does not know the message
    Unknown,
    /// Accepted by the operator, not yet delivered
    Pending,
    /// Delivered to the handset
    Delivered,
    /// The operator gave up on delivery
    Failed,
    /// The message aged out before delivery
    Expired,
}

/// Remaining account balance with the operator, in operator-defined credits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CreditBalance {
    pub credits: f64,
}

impl fmt::Display for CreditBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} credits", self.credits)
    }
}

/// A coverage query: can this operator reach `msisdn`?
///
/// Built by the caller with the destination to probe; the driver fills in
/// the answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    msisdn: MsIsdn,
    covered: bool,
}

impl Coverage {
    pub fn new(msisdn: impl Into<MsIsdn>) -> Self {
        Self {
            msisdn: msisdn.into(),
            covered: false,
        }
    }

    pub fn msisdn(&self) -> &MsIsdn {
        &self.msisdn
    }

    pub fn is_covered(&self) -> bool {
        self.covered
    }

    pub fn set_covered(&mut self, covered: bool) {
        self.covered = covered;
    }
}
