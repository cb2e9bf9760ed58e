pub mod api;
pub mod app;
pub mod error;
pub mod model;
pub mod observer;
pub mod session;
pub mod utils;
pub mod version;

pub use error::{Error, Result};
pub use model::{Contact, Conversation, Message};
pub use observer::Observer;
pub use session::Session;
