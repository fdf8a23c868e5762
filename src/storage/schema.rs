//! SQL schema definitions as const strings.
//!
//! Contains the complete SQLite schema for the mail index.

/// SQL to create the messages table.
pub const CREATE_MESSAGES: &str = r#"
CREATE TABLE IF NOT EXISTS messages (
    message_id TEXT PRIMARY KEY,
    subject TEXT NOT NULL,
    body TEXT NOT NULL,
    from_addr TEXT,
    to_addr TEXT,
    date TEXT
)
"#;

/// SQL to create the FTS5 virtual table for lexical search.
///
/// The table is maintained explicitly (delete-then-insert on every
/// upsert) rather than through triggers, so stale and fresh entries can
/// never coexist for one identifier.
pub const CREATE_MESSAGES_FTS: &str = r#"
CREATE VIRTUAL TABLE IF NOT EXISTS messages_fts USING fts5(
    message_id UNINDEXED,
    subject,
    body,
    tokenize='porter'
)
"#;

/// SQL to create the embedding vectors table.
///
/// Vectors are keyed by (backend, message_id): one vector per record per
/// backend configuration, replaced wholesale on re-ingestion.
pub const CREATE_VECTORS: &str = r#"
CREATE TABLE IF NOT EXISTS vectors (
    backend TEXT NOT NULL,
    message_id TEXT NOT NULL,
    embedding BLOB NOT NULL,
    PRIMARY KEY (backend, message_id)
)
"#;

/// SQL to create the vectors index.
pub const CREATE_VECTORS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_vectors_backend ON vectors(backend)
"#;

/// Returns all schema creation statements in order.
pub fn all_migrations() -> Vec<&'static str> {
    vec![
        CREATE_MESSAGES,
        CREATE_MESSAGES_FTS,
        CREATE_VECTORS,
        CREATE_VECTORS_INDEX,
    ]
}
