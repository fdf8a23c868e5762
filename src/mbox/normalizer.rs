//! Raw message normalization.
//!
//! Converts one raw MIME message into a canonical [`MailRecord`]: plain
//! text body extraction, bare address lists, date normalization, and
//! identifier assignment.

use chrono::{DateTime, Local, SecondsFormat};
use mail_parser::{Addr, Address, Message, MessageParser};
use sha2::{Digest, Sha256};

use crate::domain::{MailRecord, MessageId};

/// Normalizes a raw message into a canonical record.
///
/// Returns `None` only when the bytes cannot be parsed as a message at
/// all. Undecodable parts and malformed headers never fail the message:
/// bad charsets are decoded lossily by the MIME parser, a bad date is
/// preserved verbatim, and a missing Message-ID is replaced with a
/// content-derived synthetic identifier.
pub fn normalize(raw: &[u8]) -> Option<MailRecord> {
    let message = MessageParser::default().parse(raw)?;

    let subject = message.subject().unwrap_or_default().to_string();
    let body = extract_text_body(&message);
    let from_addr = join_addresses(message.from());
    let to_addr = join_addresses(message.to());
    let date = normalize_date(&message);

    let message_id = match message.message_id() {
        Some(id) => MessageId::from(id.to_string()),
        None => MessageId::from(synthetic_id(
            &subject,
            date.as_deref().unwrap_or(""),
            &body,
        )),
    };

    Some(MailRecord {
        message_id,
        subject,
        body,
        from_addr,
        to_addr,
        date,
    })
}

/// Joins all plain-text body parts with a blank line.
///
/// Attachments and non-text parts are not body parts and are excluded by
/// the parser's classification.
fn extract_text_body(message: &Message) -> String {
    let parts: Vec<&str> = message
        .text_bodies()
        .filter_map(|part| part.text_contents())
        .filter(|text| !text.is_empty())
        .collect();
    parts.join("\n\n")
}

/// Flattens an address header to bare, comma-joined addresses.
///
/// Display names are dropped; empty mailboxes are discarded. Returns
/// `None` when the header is absent or nothing survives.
fn join_addresses(header: Option<&Address>) -> Option<String> {
    let list = header?.as_list()?;
    let addresses: Vec<&str> = list
        .iter()
        .filter_map(Addr::address)
        .filter(|address| !address.is_empty())
        .collect();
    if addresses.is_empty() {
        None
    } else {
        Some(addresses.join(", "))
    }
}

/// Normalizes the Date header to RFC 3339 at the local offset.
///
/// A header that fails RFC 2822 parsing is passed through verbatim, never
/// dropped.
fn normalize_date(message: &Message) -> Option<String> {
    let raw = message.header_raw("Date")?.trim();
    match DateTime::parse_from_rfc2822(raw) {
        Ok(parsed) => Some(
            parsed
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Secs, false),
        ),
        Err(_) => Some(raw.to_string()),
    }
}

/// Derives a stable identifier from message content.
///
/// Re-deriving from identical input always yields the same identifier,
/// which keeps re-ingestion idempotent for messages without a Message-ID.
fn synthetic_id(subject: &str, date: &str, body: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(subject.as_bytes());
    hasher.update(date.as_bytes());
    hasher.update(body.as_bytes());
    format!("generated-{}", hex::encode(hasher.finalize()))
}
