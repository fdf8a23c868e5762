//! Canonical record storage and lexical matching.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::domain::{MailRecord, MessageId};
use crate::storage::database::Result;

/// A row returned by lexical matching.
///
/// `score` is the FTS rank: smaller values mean stronger matches.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub message_id: MessageId,
    pub subject: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub date: Option<String>,
    pub snippet: String,
    pub score: f64,
}

/// Inserts or fully replaces a batch of records.
///
/// Every field of an existing record is overwritten, and its lexical
/// index entry is rebuilt by deleting and re-inserting the FTS row. The
/// ranking structures do not support partial updates, so delete-then-
/// insert is required, not an optimization.
///
/// Callers are expected to run this inside a transaction; the function
/// itself is a plain sequence of statements.
pub fn upsert_batch(conn: &Connection, records: &[MailRecord]) -> Result<usize> {
    let mut upsert = conn.prepare(
        r#"
        INSERT INTO messages (message_id, subject, body, from_addr, to_addr, date)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(message_id) DO UPDATE SET
            subject = excluded.subject,
            body = excluded.body,
            from_addr = excluded.from_addr,
            to_addr = excluded.to_addr,
            date = excluded.date
        "#,
    )?;
    let mut delete_fts = conn.prepare("DELETE FROM messages_fts WHERE message_id = ?1")?;
    let mut insert_fts = conn.prepare(
        "INSERT INTO messages_fts (message_id, subject, body) VALUES (?1, ?2, ?3)",
    )?;

    let mut count = 0;
    for record in records {
        upsert.execute(params![
            record.message_id.0,
            record.subject,
            record.body,
            record.from_addr,
            record.to_addr,
            record.date,
        ])?;
        delete_fts.execute([&record.message_id.0])?;
        insert_fts.execute(params![record.message_id.0, record.subject, record.body])?;
        count += 1;
    }
    Ok(count)
}

/// Runs a full-text match query, ranked best-first.
pub fn match_query(conn: &Connection, query: &str, limit: usize) -> Result<Vec<LexicalHit>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT
            m.message_id,
            m.subject,
            m.from_addr,
            m.to_addr,
            m.date,
            snippet(messages_fts, 2, '<b>', '</b>', ' … ', 16) AS snippet,
            bm25(messages_fts) AS score
        FROM messages_fts
        JOIN messages AS m USING(message_id)
        WHERE messages_fts MATCH ?1
        ORDER BY score
        LIMIT ?2
        "#,
    )?;

    let rows = stmt.query_map(params![query, limit as i64], row_to_hit)?;
    let hits: std::result::Result<Vec<_>, _> = rows.collect();
    Ok(hits?)
}

/// Retrieves a record by its identifier.
pub fn fetch(conn: &Connection, message_id: &MessageId) -> Result<Option<MailRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT message_id, subject, body, from_addr, to_addr, date
        FROM messages
        WHERE message_id = ?1
        "#,
    )?;

    let record = stmt.query_row([&message_id.0], row_to_record).optional()?;
    Ok(record)
}

fn row_to_hit(row: &Row<'_>) -> std::result::Result<LexicalHit, rusqlite::Error> {
    Ok(LexicalHit {
        message_id: MessageId(row.get(0)?),
        subject: row.get(1)?,
        from_addr: row.get(2)?,
        to_addr: row.get(3)?,
        date: row.get(4)?,
        snippet: row.get(5)?,
        score: row.get(6)?,
    })
}

fn row_to_record(row: &Row<'_>) -> std::result::Result<MailRecord, rusqlite::Error> {
    Ok(MailRecord {
        message_id: MessageId(row.get(0)?),
        subject: row.get(1)?,
        body: row.get(2)?,
        from_addr: row.get(3)?,
        to_addr: row.get(4)?,
        date: row.get(5)?,
    })
}
