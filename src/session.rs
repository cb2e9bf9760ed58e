use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::api::Transport;
use crate::api::models::{ReceiptEvent, ReceivedEvent};
use crate::app::AppConfig;
use crate::error::{Error, Result};
use crate::model::{Contact, Conversation, Message, Registry};
use crate::observer::{Observer, Observers};

/// State shared between the session and the transport callbacks.
struct Core {
    registry: Mutex<Registry>,
    observers: Observers,
    // provisional keys for local messages count down from -1 so they
    // never collide with sender timestamps
    next_local: AtomicI64,
}

impl Core {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_provisional_key(&self) -> i64 {
        self.next_local.fetch_sub(1, Ordering::Relaxed) - 1
    }

    fn on_received(&self, event: ReceivedEvent) -> Result<()> {
        let snapshot = {
            let mut registry = self.registry();
            let contact = registry.resolve_contact(&event.source);
            let message = Message::received(event.message, contact.display_name(), event.timestamp);
            let conversation = registry.resolve_conversation(&contact);
            conversation.add_message(message);
            conversation.clone()
        };
        self.observers.new_info(&snapshot);
        Ok(())
    }

    fn on_receipt(&self, event: ReceiptEvent) -> Result<()> {
        let snapshot = {
            let mut registry = self.registry();
            let contact = registry.resolve_contact(&event.source);
            let conversation = registry.resolve_conversation(&contact);
            let mut changed = false;
            for ts in &event.timestamps {
                if conversation.apply_receipt(*ts, event.is_delivery, event.is_read) {
                    changed = true;
                } else {
                    debug!("receipt from {} for unknown message {ts}", contact.number);
                }
            }
            changed.then(|| conversation.clone())
        };
        if let Some(conversation) = snapshot {
            self.observers.status_changed(&conversation);
        }
        Ok(())
    }
}

/// The conversation model of one running client.
///
/// Owns the contact and conversation registries, records outgoing messages
/// and folds incoming messages and receipts from the transport into them.
pub struct Session {
    config: AppConfig,
    core: Arc<Core>,
    transport: Arc<dyn Transport>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, config: AppConfig) -> Self {
        Self::with_registry(transport, config.clone(), Registry::seeded(&config))
    }

    /// Start from a registry loaded elsewhere.
    pub fn with_registry(
        transport: Arc<dyn Transport>,
        config: AppConfig,
        registry: Registry,
    ) -> Self {
        let core = Arc::new(Core {
            registry: Mutex::new(registry),
            observers: Observers::default(),
            next_local: AtomicI64::new(0),
        });

        let received = Arc::clone(&core);
        transport.on_received(Box::new(move |event| received.on_received(event)));
        let receipts = Arc::clone(&core);
        transport.on_receipt(Box::new(move |event| receipts.on_receipt(event)));

        Self {
            config,
            core,
            transport,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn subscribe(&self, observer: Arc<dyn Observer>) {
        self.core.observers.add(observer);
    }

    /// Sends a message to a contact.
    ///
    /// The message is recorded under a provisional key before the transport
    /// is called and stays in the conversation even if sending fails. When the
    /// transport reports the real timestamp the message is rekeyed to it, so
    /// later receipts find it.
    pub async fn send(&self, text: &str, contact: &Contact) -> Result<()> {
        let provisional = self.core.next_provisional_key();
        let message = Message::new(text, self.config.user_name.as_str(), provisional);
        let (contact, snapshot) = {
            let mut registry = self.core.registry();
            let contact = registry.resolve_contact(&contact.number);
            let conversation = registry.resolve_conversation(&contact);
            conversation.add_message(message.clone());
            (contact, conversation.clone())
        };
        self.on_send(&message, &snapshot);

        match self.transport.send(&contact.number, text).await {
            Ok(Some(timestamp)) => {
                let confirmed = {
                    let mut registry = self.core.registry();
                    match registry.conversation_mut(&contact) {
                        Some(conv) => conv
                            .confirm_timestamp(provisional, timestamp)
                            .then(|| conv.clone()),
                        None => None,
                    }
                };
                if let Some(conversation) = confirmed {
                    self.core.observers.status_changed(&conversation);
                }
                Ok(())
            }
            Ok(None) => {
                debug!("transport did not report a timestamp for message {provisional}");
                Ok(())
            }
            Err(e) => {
                warn!("sending to {} failed: {e}", contact.number);
                Err(Error::Send(e))
            }
        }
    }

    fn on_send(&self, message: &Message, conversation: &Conversation) {
        self.core.observers.sending(message, conversation);
    }

    pub async fn receive(&self) -> Result<()> {
        self.transport.receive().await?;
        info!("transport stream ended");
        Ok(())
    }

    /// The registered contact for `number`, registering it if it is new.
    pub fn contact(&self, number: &str) -> Contact {
        self.core.registry().resolve_contact(number)
    }

    pub fn contacts(&self) -> HashMap<String, Contact> {
        self.core.registry().contacts().clone()
    }

    pub fn conversations(&self) -> HashMap<Contact, Conversation> {
        self.core
            .registry()
            .conversations()
            .map(|conv| (conv.contact().clone(), conv.clone()))
            .collect()
    }

    pub fn conversation(&self, contact: &Contact) -> Option<Conversation> {
        self.core.registry().conversation(contact).cloned()
    }

    /// Clear the new-message flag once the conversation has been looked at.
    pub fn mark_seen(&self, contact: &Contact) {
        if let Some(conversation) = self.core.registry().conversation_mut(contact) {
            conversation.clear_new_message();
        }
    }
}
