use std::sync::{Arc, PoisonError, RwLock};

use crate::model::{Conversation, Message};

/// Receives snapshots of conversations as they change.
///
/// Called without any session lock held, so implementations may call back
/// into the session.
pub trait Observer: Send + Sync {
    /// A conversation gained a message.
    fn new_info(&self, conversation: &Conversation);

    /// Delivery/read status or the key of a sent message changed.
    fn status_changed(&self, _conversation: &Conversation) {}

    /// A local message was recorded and is about to go out.
    fn sending(&self, _message: &Message, _conversation: &Conversation) {}
}

impl<F> Observer for F
where
    F: Fn(&Conversation) + Send + Sync,
{
    fn new_info(&self, conversation: &Conversation) {
        self(conversation)
    }
}

#[derive(Default)]
pub(crate) struct Observers {
    list: RwLock<Vec<Arc<dyn Observer>>>,
}

impl Observers {
    pub(crate) fn add(&self, observer: Arc<dyn Observer>) {
        self.list
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    // copy out so no lock is held while observers run
    fn snapshot(&self) -> Vec<Arc<dyn Observer>> {
        self.list
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn new_info(&self, conversation: &Conversation) {
        for observer in self.snapshot() {
            observer.new_info(conversation);
        }
    }

    pub(crate) fn status_changed(&self, conversation: &Conversation) {
        for observer in self.snapshot() {
            observer.status_changed(conversation);
        }
    }

    pub(crate) fn sending(&self, message: &Message, conversation: &Conversation) {
        for observer in self.snapshot() {
            observer.sending(message, conversation);
        }
    }
}
