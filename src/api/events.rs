use super::models::{Envelope, IncomingEvent, ReceiptEvent, ReceivedEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Received(ReceivedEvent),
    Receipt(ReceiptEvent),
}

/// Decode one websocket frame.
///
/// Frames that carry neither a text message nor a receipt (typing
/// indicators, sync messages, attachment-only messages) decode to `None`.
pub fn parse_event(text: &str) -> Result<Option<TransportEvent>, serde_json::Error> {
    let incoming: IncomingEvent = serde_json::from_str(text)?;
    Ok(incoming.envelope.and_then(from_envelope))
}

/// Prefer the E.164 number; privacy-enabled senders only have a uuid in `source`.
fn sender(envelope: &Envelope) -> Option<String> {
    envelope
        .source_number
        .as_deref()
        .or(envelope.source.as_deref())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn from_envelope(envelope: Envelope) -> Option<TransportEvent> {
    let source = sender(&envelope)?;

    if let Some(receipt) = envelope.receipt_message {
        return Some(TransportEvent::Receipt(ReceiptEvent {
            source,
            is_delivery: receipt.is_delivery,
            is_read: receipt.is_read,
            timestamps: receipt.timestamps,
        }));
    }

    let data = envelope.data_message?;
    let message = data.message.filter(|m| !m.is_empty())?;
    let timestamp = data.timestamp.or(envelope.timestamp)?;
    Some(TransportEvent::Received(ReceivedEvent {
        source,
        message,
        timestamp,
    }))
}
