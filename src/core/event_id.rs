//! Event identifiers attached to log calls

use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric event id with an optional name.
///
/// `0` is the "no event" id. Ids `0` and `-1` are treated as unset when a sink
/// only includes valid ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub id: i32,
    pub name: Option<String>,
}

impl EventId {
    pub const fn new(id: i32) -> Self {
        Self { id, name: None }
    }

    pub fn named(id: i32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: Some(name.into()),
        }
    }

    /// Whether the id carries information (neither `0` nor `-1`).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.id != 0 && self.id != -1
    }
}

impl From<i32> for EventId {
    fn from(id: i32) -> Self {
        EventId::new(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", self.id, name),
            None => write!(f, "{}", self.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validity() {
        assert!(!EventId::default().is_valid());
        assert!(!EventId::new(-1).is_valid());
        assert!(EventId::new(42).is_valid());
        assert!(EventId::new(-7).is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(EventId::new(5).to_string(), "5");
        assert_eq!(EventId::named(5, "Started").to_string(), "5 (Started)");
    }
}
