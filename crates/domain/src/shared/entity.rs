use std::fmt::Display;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub trait Entity<T: PartialEq> {
    fn id(&self) -> T;
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// ID - an opaque, lexicographically sortable identifier for an entity.
///
/// Freshly generated ids are UUID v7 strings (timestamp-prefixed, so the
/// textual form sorts by creation time). Ids read from external sources
/// (ICS `UID`) are kept verbatim. The empty id marks "not yet assigned";
/// the persistence layer generates one on insert.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ID(String);

impl ID {
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ID {
    fn from(e: String) -> Self {
        Self(e)
    }
}

impl From<&str> for ID {
    fn from(e: &str) -> Self {
        Self(e.to_string())
    }
}

impl Display for ID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
