use std::collections::HashMap;

use log::info;

use super::{Contact, Conversation};
use crate::app::AppConfig;

/// Contacts keyed by number, and one conversation per contact.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    contacts: HashMap<String, Contact>,
    conversations: HashMap<String, Conversation>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One conversation per contact, all empty.
    pub fn with_contacts(contacts: impl IntoIterator<Item = Contact>) -> Self {
        let mut registry = Self::new();
        for contact in contacts {
            info!("adding conversation for {}", contact.number);
            registry
                .conversations
                .insert(contact.number.clone(), Conversation::new(contact.clone()));
            registry.contacts.insert(contact.number.clone(), contact);
        }
        registry
    }

    /// Starting state for a session: the local user and their own conversation.
    pub fn seeded(config: &AppConfig) -> Self {
        Self::with_contacts([Contact::named(&config.user_number, &config.user_name)])
    }

    /// Look a number up, registering an unnamed contact the first time it is seen.
    pub fn resolve_contact(&mut self, number: &str) -> Contact {
        self.contacts
            .entry(number.to_string())
            .or_insert_with(|| {
                info!("new contact: {number}");
                Contact::new(number)
            })
            .clone()
    }

    /// The conversation for `contact`, created empty if there is none yet.
    pub fn resolve_conversation(&mut self, contact: &Contact) -> &mut Conversation {
        if !self.contacts.contains_key(&contact.number) {
            self.contacts.insert(contact.number.clone(), contact.clone());
        }
        self.conversations
            .entry(contact.number.clone())
            .or_insert_with(|| {
                info!("new conversation for contact: {}", contact.number);
                Conversation::new(contact.clone())
            })
    }

    pub fn contact(&self, number: &str) -> Option<&Contact> {
        self.contacts.get(number)
    }

    pub fn conversation(&self, contact: &Contact) -> Option<&Conversation> {
        self.conversations.get(&contact.number)
    }

    pub fn conversation_mut(&mut self, contact: &Contact) -> Option<&mut Conversation> {
        self.conversations.get_mut(&contact.number)
    }

    pub fn contacts(&self) -> &HashMap<String, Contact> {
        &self.contacts
    }

    pub fn conversations(&self) -> impl Iterator<Item = &Conversation> + '_ {
        self.conversations.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_registry_holds_the_local_user() {
        let config = AppConfig {
            user_number: "+1000".into(),
            ..AppConfig::default()
        };
        let registry = Registry::seeded(&config);

        let me = registry.contact("+1000").cloned();
        assert_eq!(me.as_ref().map(Contact::display_name), Some("me"));
        assert!(me.as_ref().and_then(|c| registry.conversation(c)).is_some());
    }

    #[test]
    fn resolve_contact_is_an_upsert() {
        let mut registry = Registry::new();
        let first = registry.resolve_contact("+1555");
        let second = registry.resolve_contact("+1555");

        assert_eq!(first, second);
        assert_eq!(first.name, None);
        assert_eq!(registry.contacts().len(), 1);
    }

    #[test]
    fn resolve_conversation_is_an_upsert() {
        let mut registry = Registry::new();
        let contact = registry.resolve_contact("+1555");
        registry
            .resolve_conversation(&contact)
            .add_message(crate::model::Message::received("hi", "+1555", 1));
        let again = registry.resolve_conversation(&contact);

        assert_eq!(again.len(), 1);
        assert_eq!(registry.conversations().count(), 1);
    }

    #[test]
    fn resolve_conversation_keeps_contacts_consistent() {
        let mut registry = Registry::new();
        registry.resolve_conversation(&Contact::named("+1777", "Bo"));

        assert_eq!(
            registry.contact("+1777").map(Contact::display_name),
            Some("Bo")
        );
    }

    #[test]
    fn existing_name_wins_over_an_ad_hoc_contact() {
        let mut registry = Registry::with_contacts([Contact::named("+1555", "Ada")]);
        let resolved = registry.resolve_contact("+1555");
        assert_eq!(resolved.display_name(), "Ada");
    }
}
