//! Ingestion pipeline.
//!
//! Drives normalization over every message of an mbox archive, upserts
//! the canonical records, and persists one embedding per record when a
//! backend is available. All storage mutations for one batch run inside
//! a single transaction.

use std::path::Path;

use thiserror::Error;

use crate::domain::{MailRecord, MessageId};
use crate::embedding::{EmbeddingBackend, EmbeddingError};
use crate::mbox::{normalize, MboxReader};
use crate::storage::queries::{messages, vectors};
use crate::storage::{Database, DatabaseError};

/// Errors that can occur during ingestion.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to read mbox: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Summary of one indexing run.
#[derive(Debug, Clone)]
pub struct IndexOutcome {
    /// Number of raw messages read from the archive.
    pub processed: usize,
    /// Number of canonical records inserted or replaced.
    pub inserted: usize,
    /// Identifier of the backend vectors were stored under, if any.
    pub backend: Option<String>,
}

/// Ingests mbox archives into the index.
pub struct IndexService<'db> {
    database: &'db mut Database,
    backend: Option<Box<dyn EmbeddingBackend>>,
}

impl<'db> IndexService<'db> {
    /// Creates an index service. Pass `None` to skip embeddings.
    pub fn new(database: &'db mut Database, backend: Option<Box<dyn EmbeddingBackend>>) -> Self {
        Self { database, backend }
    }

    /// Indexes the content of an mbox file.
    ///
    /// Re-running over the same file is idempotent: records with a known
    /// identifier are fully replaced, as are their lexical entries and
    /// vectors. A message the MIME parser rejects is logged and skipped
    /// without aborting the batch.
    pub fn index_mbox(&mut self, path: impl AsRef<Path>) -> Result<IndexOutcome, IndexError> {
        let path = path.as_ref();
        let mut processed = 0;
        let mut records: Vec<MailRecord> = Vec::new();

        for raw in MboxReader::open(path)? {
            let raw = raw?;
            processed += 1;
            match normalize(&raw) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(position = processed, "skipping unparseable message");
                }
            }
        }

        // Embeddings are computed before the transaction opens, so a
        // backend failure leaves storage untouched.
        let embeddings = self.compute_embeddings(&records)?;
        let backend_id = self.backend.as_ref().map(|b| b.identifier().to_string());

        let inserted = self.database.transaction(|tx| {
            let inserted = messages::upsert_batch(tx, &records)?;
            if let (Some(backend), Some(pairs)) = (&backend_id, &embeddings) {
                vectors::store_batch(tx, backend, pairs)?;
            }
            Ok(inserted)
        })?;

        tracing::info!(
            source = %path.display(),
            processed,
            inserted,
            backend = backend_id.as_deref().unwrap_or("none"),
            "indexed mbox archive"
        );

        Ok(IndexOutcome {
            processed,
            inserted,
            backend: backend_id,
        })
    }

    fn compute_embeddings(
        &self,
        records: &[MailRecord],
    ) -> Result<Option<Vec<(MessageId, Vec<f32>)>>, EmbeddingError> {
        let backend = match &self.backend {
            Some(backend) if !records.is_empty() => backend,
            _ => return Ok(None),
        };

        let texts: Vec<String> = records.iter().map(MailRecord::embedding_text).collect();
        let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let embedded = backend.embed(&text_refs)?;

        Ok(Some(
            records
                .iter()
                .map(|record| record.message_id.clone())
                .zip(embedded)
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashBackend;
    use std::io::Write;

    const ARCHIVE: &str = "From alice@example.com Tue Feb 11 09:30:00 2025\n\
Subject: Weekly search sync\n\
From: alice@example.com\n\
To: bob@example.com\n\
Date: Tue, 11 Feb 2025 09:30:00 +0000\n\
Message-ID: <sync-1@example.com>\n\
\n\
Let's discuss the search engine milestones.\n\
\n\
From carol@example.com Tue Feb 11 12:00:00 2025\n\
Subject: Lunch invitation\n\
From: carol@example.com\n\
To: alice@example.com\n\
Message-ID: <lunch-1@example.com>\n\
\n\
Fancy some ramen today?\n";

    fn write_archive(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn indexes_all_messages_without_embeddings() {
        let file = write_archive(ARCHIVE);
        let mut db = Database::open_in_memory().unwrap();

        let outcome = IndexService::new(&mut db, None)
            .index_mbox(file.path())
            .unwrap();

        assert_eq!(outcome.processed, 2);
        assert_eq!(outcome.inserted, 2);
        assert_eq!(outcome.backend, None);

        let record = messages::fetch(db.conn(), &MessageId::from("sync-1@example.com"))
            .unwrap()
            .unwrap();
        assert_eq!(record.subject, "Weekly search sync");
    }

    #[test]
    fn stores_one_vector_per_record_under_backend_tag() {
        let file = write_archive(ARCHIVE);
        let mut db = Database::open_in_memory().unwrap();
        let backend = Box::new(HashBackend::new(64).unwrap());

        let outcome = IndexService::new(&mut db, Some(backend))
            .index_mbox(file.path())
            .unwrap();

        assert_eq!(outcome.backend.as_deref(), Some("hash/64"));
        let stored = vectors::fetch_all(db.conn(), "hash/64").unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|v| v.vector.len() == 64));
    }

    #[test]
    fn reingestion_is_idempotent() {
        let file = write_archive(ARCHIVE);
        let mut db = Database::open_in_memory().unwrap();

        IndexService::new(&mut db, Some(Box::new(HashBackend::new(32).unwrap())))
            .index_mbox(file.path())
            .unwrap();
        let second = IndexService::new(&mut db, Some(Box::new(HashBackend::new(32).unwrap())))
            .index_mbox(file.path())
            .unwrap();

        assert_eq!(second.processed, 2);
        assert_eq!(second.inserted, 2);

        let count: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);

        let stored = vectors::fetch_all(db.conn(), "hash/32").unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[test]
    fn empty_archive_yields_zero_counts() {
        let file = write_archive("");
        let mut db = Database::open_in_memory().unwrap();

        let outcome = IndexService::new(&mut db, None)
            .index_mbox(file.path())
            .unwrap();

        assert_eq!(outcome.processed, 0);
        assert_eq!(outcome.inserted, 0);
    }

    #[test]
    fn missing_archive_is_an_io_error() {
        let mut db = Database::open_in_memory().unwrap();
        let result = IndexService::new(&mut db, None).index_mbox("/nonexistent/archive.mbox");
        assert!(matches!(result, Err(IndexError::Io(_))));
    }
}
