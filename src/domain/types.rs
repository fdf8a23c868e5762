//! Identifier types for domain entities.
//!
//! The newtype wrapper provides type safety for message identifiers,
//! preventing accidental mixing with other strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an archived mail message.
///
/// Sourced from the RFC 5322 Message-ID header when the message carries
/// one; otherwise derived from a content hash and prefixed `generated-`
/// so synthetic identifiers are distinguishable from server-issued ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Returns whether this identifier was derived from message content
    /// rather than taken from a Message-ID header.
    pub fn is_synthetic(&self) -> bool {
        self.0.starts_with("generated-")
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}
