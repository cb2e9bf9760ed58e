pub mod contact;
pub mod conversation;
pub mod message;
pub mod registry;

pub use contact::Contact;
pub use conversation::Conversation;
pub use message::Message;
pub use registry::Registry;
