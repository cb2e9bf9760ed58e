pub mod client;
pub mod events;
pub mod mock;
pub mod models;

use async_trait::async_trait;
use log::warn;
use std::sync::{PoisonError, RwLock};

use crate::error::{Result, TransportError};
use events::TransportEvent;
use models::{ReceiptEvent, ReceivedEvent};

pub type ReceivedCallback = Box<dyn Fn(ReceivedEvent) -> Result<()> + Send + Sync>;
pub type ReceiptCallback = Box<dyn Fn(ReceiptEvent) -> Result<()> + Send + Sync>;

/// What the session needs from a messaging backend.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `text` to `number`. Returns the sender timestamp the backend
    /// assigned, when it reports one.
    async fn send(&self, number: &str, text: &str) -> Result<Option<i64>, TransportError>;

    /// Pump incoming events into the registered callbacks until the stream ends.
    async fn receive(&self) -> Result<(), TransportError>;

    fn on_received(&self, callback: ReceivedCallback);

    fn on_receipt(&self, callback: ReceiptCallback);
}

/// Callback registrations shared by the transport implementations.
#[derive(Default)]
pub struct Handlers {
    received: RwLock<Vec<ReceivedCallback>>,
    receipt: RwLock<Vec<ReceiptCallback>>,
}

impl Handlers {
    pub fn add_received(&self, callback: ReceivedCallback) {
        self.received
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    pub fn add_receipt(&self, callback: ReceiptCallback) {
        self.receipt
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Hand an event to every matching callback. The first callback error is
    /// returned after all callbacks ran.
    pub fn dispatch(&self, event: TransportEvent) -> Result<()> {
        let mut first_err = None;
        match event {
            TransportEvent::Received(ev) => {
                let callbacks = self.received.read().unwrap_or_else(PoisonError::into_inner);
                for cb in callbacks.iter() {
                    if let Err(e) = cb(ev.clone()) {
                        warn!("received callback failed: {e}");
                        first_err.get_or_insert(e);
                    }
                }
            }
            TransportEvent::Receipt(ev) => {
                let callbacks = self.receipt.read().unwrap_or_else(PoisonError::into_inner);
                for cb in callbacks.iter() {
                    if let Err(e) = cb(ev.clone()) {
                        warn!("receipt callback failed: {e}");
                        first_err.get_or_insert(e);
                    }
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
