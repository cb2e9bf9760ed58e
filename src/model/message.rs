use serde::{Deserialize, Serialize};
use std::fmt;

const fn delivery_glyph(delivered: bool) -> char {
    if delivered { '<' } else { '?' }
}

const fn read_glyph(read: bool) -> char {
    if read { '>' } else { '?' }
}

/// One text exchange. Content, sender and timestamp are fixed at creation;
/// only the status flags change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    content: String,
    from: String,
    timestamp: i64,
    pub is_delivered: bool,
    pub is_read: bool,
}

impl Message {
    /// A message that has not been delivered or read yet.
    pub fn new(content: impl Into<String>, from: impl Into<String>, timestamp: i64) -> Self {
        Self {
            content: content.into(),
            from: from.into(),
            timestamp,
            is_delivered: false,
            is_read: false,
        }
    }

    /// An inbound message: it reached us, so it counts as delivered.
    pub fn received(content: impl Into<String>, from: impl Into<String>, timestamp: i64) -> Self {
        Self {
            is_delivered: true,
            ..Self::new(content, from, timestamp)
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Locally sent and still waiting for the transport to hand back its real timestamp.
    pub fn is_provisional(&self) -> bool {
        self.timestamp < 0
    }

    pub fn set_status(&mut self, delivered: bool, read: bool) {
        self.is_delivered = delivered;
        self.is_read = read;
    }

    pub(crate) fn rekeyed(self, timestamp: i64) -> Self {
        Self { timestamp, ..self }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}|{}{} {}: {}",
            self.timestamp,
            delivery_glyph(self.is_delivered),
            read_glyph(self.is_read),
            self.from,
            self.content
        )
    }
}
