//! In-memory transport for tests and offline use.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use super::events::TransportEvent;
use super::models::{ReceiptEvent, ReceivedEvent};
use super::{Handlers, ReceiptCallback, ReceivedCallback, Transport};
use crate::error::{Result, TransportError};

enum SendOutcome {
    Confirm(i64),
    Fail(String),
}

/// Records outgoing messages and replays queued events on `receive`.
///
/// Sends succeed without a timestamp unless an outcome was scripted with
/// [`confirm_next_send`](Self::confirm_next_send) or
/// [`fail_next_send`](Self::fail_next_send).
#[derive(Default)]
pub struct MockTransport {
    handlers: Handlers,
    sent: Mutex<Vec<(String, String)>>,
    outcomes: Mutex<VecDeque<SendOutcome>>,
    inbox: Mutex<VecDeque<TransportEvent>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn confirm_next_send(&self, timestamp: i64) {
        lock(&self.outcomes).push_back(SendOutcome::Confirm(timestamp));
    }

    pub fn fail_next_send(&self, reason: impl Into<String>) {
        lock(&self.outcomes).push_back(SendOutcome::Fail(reason.into()));
    }

    /// Queue an event for the next `receive` call.
    pub fn push(&self, event: TransportEvent) {
        lock(&self.inbox).push_back(event);
    }

    /// Run the callbacks for a received message right away.
    pub fn deliver(&self, event: ReceivedEvent) -> Result<()> {
        self.handlers.dispatch(TransportEvent::Received(event))
    }

    /// Run the callbacks for a receipt right away.
    pub fn deliver_receipt(&self, event: ReceiptEvent) -> Result<()> {
        self.handlers.dispatch(TransportEvent::Receipt(event))
    }

    /// `(number, text)` pairs handed to `send`, including failed ones.
    pub fn sent(&self) -> Vec<(String, String)> {
        lock(&self.sent).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, number: &str, text: &str) -> Result<Option<i64>, TransportError> {
        lock(&self.sent).push((number.to_string(), text.to_string()));
        let outcome = lock(&self.outcomes).pop_front();
        match outcome {
            Some(SendOutcome::Confirm(ts)) => Ok(Some(ts)),
            Some(SendOutcome::Fail(reason)) => Err(TransportError::Other(reason)),
            None => Ok(None),
        }
    }

    async fn receive(&self) -> Result<(), TransportError> {
        loop {
            let next = lock(&self.inbox).pop_front();
            let Some(event) = next else {
                return Ok(());
            };
            if let Err(e) = self.handlers.dispatch(event) {
                return Err(TransportError::Other(e.to_string()));
            }
        }
    }

    fn on_received(&self, callback: ReceivedCallback) {
        self.handlers.add_received(callback);
    }

    fn on_receipt(&self, callback: ReceiptCallback) {
        self.handlers.add_receipt(callback);
    }
}
