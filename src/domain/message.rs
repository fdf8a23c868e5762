//! The canonical mail record.
//!
//! Represents one archived message after normalization, ready for storage.

use serde::{Deserialize, Serialize};

use super::MessageId;

/// A normalized mail message as stored in the index.
///
/// Produced by the record normalizer from raw mbox bytes. Once upserted,
/// the storage layer owns the record; the pipeline only holds it
/// transiently during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailRecord {
    /// Unique identifier, primary key in storage.
    pub message_id: MessageId,
    /// Subject line, possibly empty.
    pub subject: String,
    /// All plain-text parts of the message, joined by blank lines.
    /// Attachments and non-text parts are excluded.
    pub body: String,
    /// Bare sender addresses, comma-joined. Display names are dropped.
    pub from_addr: Option<String>,
    /// Bare recipient addresses, comma-joined.
    pub to_addr: Option<String>,
    /// RFC 3339 timestamp at the local offset when the Date header parsed,
    /// otherwise the raw header text preserved verbatim.
    pub date: Option<String>,
}

impl MailRecord {
    /// Returns the text an embedding is computed from: subject and body,
    /// subject first, separated by a blank line, surrounding whitespace
    /// trimmed.
    pub fn embedding_text(&self) -> String {
        format!("{}\n\n{}", self.subject, self.body)
            .trim()
            .to_string()
    }
}
