use log::{debug, warn};
use std::collections::{HashMap, VecDeque};
use std::fmt;

use super::{Contact, Message};

/// Receipts held back for sends that are still waiting on their timestamp.
const MAX_HELD_RECEIPTS: usize = 64;

/// Messages exchanged with one contact, kept in arrival order.
///
/// `order` holds every key of `messages` exactly once, in the order the key
/// was first inserted. Timestamps are not sorted: out-of-order arrival is normal.
#[derive(Debug, Clone)]
pub struct Conversation {
    contact: Contact,
    messages: HashMap<i64, Message>,
    order: Vec<i64>,
    has_new_message: bool,
    // receipts that matched nothing while a send was unconfirmed, oldest first
    held_receipts: HashMap<i64, (bool, bool)>,
    held_order: VecDeque<i64>,
}

impl Conversation {
    pub fn new(contact: Contact) -> Self {
        Self {
            contact,
            messages: HashMap::new(),
            order: Vec::new(),
            has_new_message: false,
            held_receipts: HashMap::new(),
            held_order: VecDeque::new(),
        }
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    /// Insert a message keyed by its timestamp.
    ///
    /// A known timestamp replaces the stored message wholesale and leaves the
    /// ordering and the new-message flag alone.
    pub fn add_message(&mut self, message: Message) {
        let ts = message.timestamp();
        if self.messages.insert(ts, message).is_none() {
            self.order.push(ts);
            self.has_new_message = true;
        }
    }

    /// Update the status flags of an existing message in place.
    /// Returns false when no message carries `timestamp`.
    ///
    /// While a local message is still under its provisional key, an unmatched
    /// receipt is held and applied by [`confirm_timestamp`](Self::confirm_timestamp)
    /// if the send turns out to carry that timestamp.
    pub fn apply_receipt(&mut self, timestamp: i64, delivered: bool, read: bool) -> bool {
        match self.messages.get_mut(&timestamp) {
            Some(message) => {
                message.set_status(delivered, read);
                true
            }
            None => {
                if self.has_provisional() {
                    self.hold_receipt(timestamp, delivered, read);
                }
                false
            }
        }
    }

    fn has_provisional(&self) -> bool {
        self.order.iter().any(|&ts| ts < 0)
    }

    fn hold_receipt(&mut self, timestamp: i64, delivered: bool, read: bool) {
        if self.held_receipts.insert(timestamp, (delivered, read)).is_some() {
            return;
        }
        self.held_order.push_back(timestamp);
        while self.held_order.len() > MAX_HELD_RECEIPTS {
            if let Some(oldest) = self.held_order.pop_front() {
                debug!("dropping held receipt for {oldest}");
                self.held_receipts.remove(&oldest);
            }
        }
    }

    fn take_held_receipt(&mut self, timestamp: i64) -> Option<(bool, bool)> {
        let status = self.held_receipts.remove(&timestamp)?;
        self.held_order.retain(|&ts| ts != timestamp);
        Some(status)
    }

    /// Number of receipts waiting for a send to be confirmed.
    pub fn held_receipts(&self) -> usize {
        self.held_receipts.len()
    }

    /// Move a locally sent message from its provisional key to the timestamp
    /// the transport reported, keeping its place in the ordering. A receipt
    /// for `confirmed` that arrived early is applied now.
    ///
    /// If `confirmed` is already present the stored message wins and the
    /// provisional entry is dropped.
    pub fn confirm_timestamp(&mut self, provisional: i64, confirmed: i64) -> bool {
        let Some(pos) = self.order.iter().position(|&ts| ts == provisional) else {
            return false;
        };
        let Some(message) = self.messages.remove(&provisional) else {
            return false;
        };
        let held = self.take_held_receipt(confirmed);
        if self.messages.contains_key(&confirmed) {
            warn!(
                "sent message {provisional} to {} collides with stored {confirmed}, dropping it",
                self.contact.number
            );
            self.order.remove(pos);
        } else {
            let mut message = message.rekeyed(confirmed);
            if let Some((delivered, read)) = held {
                message.set_status(delivered, read);
            }
            self.order[pos] = confirmed;
            self.messages.insert(confirmed, message);
        }
        if !self.has_provisional() {
            self.held_receipts.clear();
            self.held_order.clear();
        }
        true
    }

    pub fn get(&self, timestamp: i64) -> Option<&Message> {
        self.messages.get(&timestamp)
    }

    /// Messages in display order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.order.iter().filter_map(|ts| self.messages.get(ts))
    }

    pub fn order(&self) -> &[i64] {
        &self.order
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.order.last().and_then(|ts| self.messages.get(ts))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn has_new_message(&self) -> bool {
        self.has_new_message
    }

    pub fn clear_new_message(&mut self) {
        self.has_new_message = false;
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for message in self.messages() {
            write!(f, "{message}")?;
        }
        Ok(())
    }
}
