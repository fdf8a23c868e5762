//! Embedding vector storage.
//!
//! Vectors are namespaced by the identifier of the backend that produced
//! them; a query-time backend only ever reads its own namespace.

use rusqlite::{params, Connection, Row};

use crate::domain::MessageId;
use crate::embedding::vector;
use crate::storage::database::Result;

/// A stored vector joined with the display fields of its record.
#[derive(Debug, Clone)]
pub struct StoredVector {
    pub message_id: MessageId,
    pub vector: Vec<f32>,
    pub subject: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub date: Option<String>,
    pub body: String,
}

/// Inserts or replaces vectors for a backend in one pass.
///
/// A record's prior vector under the same backend is overwritten
/// wholesale; vectors under other backends are untouched.
pub fn store_batch(
    conn: &Connection,
    backend: &str,
    embeddings: &[(MessageId, Vec<f32>)],
) -> Result<()> {
    let mut stmt = conn.prepare(
        r#"
        INSERT INTO vectors (backend, message_id, embedding)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(backend, message_id) DO UPDATE SET
            embedding = excluded.embedding
        "#,
    )?;

    for (message_id, embedding) in embeddings {
        stmt.execute(params![backend, message_id.0, vector::to_blob(embedding)])?;
    }
    Ok(())
}

/// Lists the backend identifiers that have stored vectors.
pub fn list_backends(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT DISTINCT backend FROM vectors ORDER BY backend")?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let backends: std::result::Result<Vec<_>, _> = rows.collect();
    Ok(backends?)
}

/// Fetches every vector stored under a backend, with display fields.
pub fn fetch_all(conn: &Connection, backend: &str) -> Result<Vec<StoredVector>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT v.message_id, v.embedding, m.subject, m.from_addr, m.to_addr, m.date, m.body
        FROM vectors AS v
        JOIN messages AS m USING(message_id)
        WHERE v.backend = ?1
        "#,
    )?;

    let rows = stmt.query_map([backend], row_to_stored)?;
    let vectors: std::result::Result<Vec<_>, _> = rows.collect();
    Ok(vectors?)
}

fn row_to_stored(row: &Row<'_>) -> std::result::Result<StoredVector, rusqlite::Error> {
    let blob: Vec<u8> = row.get(1)?;
    Ok(StoredVector {
        message_id: MessageId(row.get(0)?),
        vector: vector::from_blob(&blob),
        subject: row.get(2)?,
        from_addr: row.get(3)?,
        to_addr: row.get(4)?,
        date: row.get(5)?,
        body: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MailRecord;
    use crate::storage::queries::messages;
    use crate::storage::Database;

    fn seed_record(db: &Database, id: &str) {
        let record = MailRecord {
            message_id: MessageId::from(id),
            subject: "Subject".to_string(),
            body: "Body text.".to_string(),
            from_addr: None,
            to_addr: None,
            date: None,
        };
        messages::upsert_batch(db.conn(), &[record]).unwrap();
    }

    #[test]
    fn store_and_fetch_round_trip() {
        let db = Database::open_in_memory().unwrap();
        seed_record(&db, "<m1@example.com>");

        let embedding = vec![0.25, -0.5, 1.0];
        store_batch(
            db.conn(),
            "hash/3",
            &[(MessageId::from("<m1@example.com>"), embedding.clone())],
        )
        .unwrap();

        let stored = fetch_all(db.conn(), "hash/3").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].vector, embedding);
        assert_eq!(stored[0].subject, "Subject");
        assert_eq!(stored[0].body, "Body text.");
    }

    #[test]
    fn store_replaces_existing_vector() {
        let db = Database::open_in_memory().unwrap();
        seed_record(&db, "<m1@example.com>");

        store_batch(
            db.conn(),
            "hash/2",
            &[(MessageId::from("<m1@example.com>"), vec![1.0, 0.0])],
        )
        .unwrap();
        store_batch(
            db.conn(),
            "hash/2",
            &[(MessageId::from("<m1@example.com>"), vec![0.0, 1.0])],
        )
        .unwrap();

        let stored = fetch_all(db.conn(), "hash/2").unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].vector, vec![0.0, 1.0]);
    }

    #[test]
    fn backends_are_isolated_namespaces() {
        let db = Database::open_in_memory().unwrap();
        seed_record(&db, "<m1@example.com>");

        store_batch(
            db.conn(),
            "hash/2",
            &[(MessageId::from("<m1@example.com>"), vec![1.0, 0.0])],
        )
        .unwrap();
        store_batch(
            db.conn(),
            "hash/4",
            &[(
                MessageId::from("<m1@example.com>"),
                vec![0.5, 0.5, 0.5, 0.5],
            )],
        )
        .unwrap();

        assert_eq!(list_backends(db.conn()).unwrap(), vec!["hash/2", "hash/4"]);
        assert_eq!(fetch_all(db.conn(), "hash/2").unwrap().len(), 1);
        assert_eq!(fetch_all(db.conn(), "hash/2").unwrap()[0].vector.len(), 2);
    }

    #[test]
    fn list_backends_empty_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(list_backends(db.conn()).unwrap().is_empty());
    }

    #[test]
    fn fetch_all_unknown_backend_is_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(fetch_all(db.conn(), "hash/999").unwrap().is_empty());
    }
}
