use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A text message that arrived from `source`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceivedEvent {
    pub source: String,
    pub message: String,
    pub timestamp: i64,
}

/// Delivery/read status for messages we sent to `source`, identified by
/// their sender timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptEvent {
    pub source: String,
    pub is_delivery: bool,
    pub is_read: bool,
    pub timestamps: Vec<i64>,
}

// signal-cli json-rpc envelope, as forwarded by the REST daemon's websocket.

#[derive(Debug, Deserialize)]
pub struct IncomingEvent {
    #[serde(default)]
    pub envelope: Option<Envelope>,
    #[serde(default)]
    pub account: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub source_number: Option<String>,
    #[serde(default)]
    pub source_name: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub data_message: Option<DataMessage>,
    #[serde(default)]
    pub receipt_message: Option<ReceiptMessage>,
}

#[derive(Debug, Deserialize)]
pub struct DataMessage {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptMessage {
    #[serde(default)]
    pub when: Option<i64>,
    #[serde(default)]
    pub is_delivery: bool,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub timestamps: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct SendRequest<'a> {
    pub message: &'a str,
    pub number: &'a str,
    pub recipients: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub timestamp: Value,
}

impl SendResponse {
    /// The daemon reports the timestamp as a string; older versions use a number.
    pub fn timestamp(&self) -> Option<i64> {
        match &self.timestamp {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}
