use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A remote party, identified by its number.
///
/// Equality and hashing only look at `number`, so two records for the same
/// number collapse into one key in the registries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub number: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Contact {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: None,
        }
    }

    pub fn named(number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            name: Some(name.into()),
        }
    }

    /// Name to show next to this contact's messages; falls back to the raw number.
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => &self.number,
        }
    }
}

impl PartialEq for Contact {
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
    }
}

impl Eq for Contact {}

impl Hash for Contact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.number.hash(state);
    }
}
