//! Query engine.
//!
//! Purely functional over a query string and a target mode. Lexical mode
//! delegates ranking to the storage layer's FTS match; semantic mode
//! scores stored vectors by cosine similarity; hybrid mode fuses both
//! rankings by reciprocal rank.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::MessageId;
use crate::embedding::{vector, EmbeddingBackend, EmbeddingError};
use crate::storage::queries::{messages, vectors};
use crate::storage::{Database, DatabaseError};

/// Maximum length in characters of generated body previews.
const PREVIEW_LENGTH: usize = 160;

/// How a query should be answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Full-text term matching ranked by the storage layer.
    Lexical,
    /// Cosine similarity against stored embedding vectors.
    Semantic,
    /// Reciprocal-rank fusion of the lexical and semantic rankings.
    Hybrid,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lexical" => Ok(SearchMode::Lexical),
            "semantic" => Ok(SearchMode::Semantic),
            "hybrid" => Ok(SearchMode::Hybrid),
            other => Err(format!(
                "unknown search mode: {other}. Use lexical, semantic, or hybrid."
            )),
        }
    }
}

/// Errors that can occur answering a query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("no stored vectors for embedding backend {backend}; index with embeddings enabled first")]
    NoVectors { backend: String },

    #[error("semantic search requires an embedding backend")]
    BackendRequired,

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// One ranked query answer, display-ready.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub message_id: MessageId,
    pub subject: String,
    pub from_addr: Option<String>,
    pub to_addr: Option<String>,
    pub date: Option<String>,
    /// Highlighted FTS snippet for lexical hits, generated body preview
    /// for semantic hits.
    pub snippet: String,
    /// Mode-dependent: FTS rank (smaller is better) in lexical mode,
    /// cosine similarity in semantic mode, fused reciprocal-rank score
    /// in hybrid mode (both larger is better).
    pub score: f64,
}

/// Answers queries against the index.
pub struct SearchService<'db> {
    database: &'db Database,
    backend: Option<Box<dyn EmbeddingBackend>>,
}

impl<'db> SearchService<'db> {
    /// Creates a service for lexical-only querying.
    pub fn new(database: &'db Database) -> Self {
        Self {
            database,
            backend: None,
        }
    }

    /// Creates a service with an embedding backend for semantic and
    /// hybrid querying.
    pub fn with_backend(database: &'db Database, backend: Box<dyn EmbeddingBackend>) -> Self {
        Self {
            database,
            backend: Some(backend),
        }
    }

    /// Runs a query in the given mode, returning at most `limit` results
    /// ranked best-first.
    pub fn search(
        &self,
        query: &str,
        limit: usize,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, SearchError> {
        match mode {
            SearchMode::Lexical => self.lexical(query, limit),
            SearchMode::Semantic => self.semantic(query, limit),
            SearchMode::Hybrid => self.hybrid(query, limit),
        }
    }

    fn lexical(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let hits = messages::match_query(self.database.conn(), query, limit)?;
        Ok(hits
            .into_iter()
            .map(|hit| SearchResult {
                message_id: hit.message_id,
                subject: hit.subject,
                from_addr: hit.from_addr,
                to_addr: hit.to_addr,
                date: hit.date,
                snippet: hit.snippet,
                score: hit.score,
            })
            .collect())
    }

    /// Semantic mode is strict: querying a backend with no stored
    /// vectors is an error, not an empty result.
    fn semantic(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let backend = self.require_backend()?;
        self.ensure_vectors(backend.identifier())?;

        let embedded = backend.embed(&[query])?;
        let query_vector = embedded.into_iter().next().unwrap_or_default();
        if query_vector.iter().all(|component| *component == 0.0) {
            // A query that tokenizes to nothing has no meaningful
            // ranking; report no matches rather than a spurious one.
            return Ok(Vec::new());
        }

        let stored = vectors::fetch_all(self.database.conn(), backend.identifier())?;
        let mut results: Vec<SearchResult> = stored
            .into_iter()
            .filter_map(|row| {
                let similarity = vector::cosine_similarity(&query_vector, &row.vector);
                if similarity <= 0.0 {
                    return None;
                }
                Some(SearchResult {
                    message_id: row.message_id,
                    subject: row.subject,
                    from_addr: row.from_addr,
                    to_addr: row.to_addr,
                    date: row.date,
                    snippet: body_preview(&row.body, PREVIEW_LENGTH),
                    score: f64::from(similarity),
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        results.truncate(limit);
        Ok(results)
    }

    /// Hybrid mode degrades to pure lexical results when the backend has
    /// no stored vectors. This asymmetry with strict semantic mode is
    /// intentional.
    fn hybrid(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, SearchError> {
        let backend = self.require_backend()?;
        match self.ensure_vectors(backend.identifier()) {
            Ok(()) => {}
            Err(SearchError::NoVectors { .. }) => {
                tracing::debug!(
                    backend = backend.identifier(),
                    "no stored vectors; answering hybrid query lexically"
                );
                return self.lexical(query, limit);
            }
            Err(err) => return Err(err),
        }

        let lexical = self.lexical(query, limit * 2)?;
        let semantic = self.semantic(query, limit * 2)?;

        let mut fused = reciprocal_rank_fusion(lexical, semantic);
        fused.truncate(limit);
        Ok(fused)
    }

    fn require_backend(&self) -> Result<&dyn EmbeddingBackend, SearchError> {
        self.backend
            .as_deref()
            .ok_or(SearchError::BackendRequired)
    }

    fn ensure_vectors(&self, backend_id: &str) -> Result<(), SearchError> {
        let known = vectors::list_backends(self.database.conn())?;
        if known.iter().any(|candidate| candidate == backend_id) {
            Ok(())
        } else {
            Err(SearchError::NoVectors {
                backend: backend_id.to_string(),
            })
        }
    }
}

/// Fuses two rankings by summed reciprocal rank.
///
/// The item at 1-indexed rank `i` of a list contributes `1 / i`; an
/// identifier absent from a list contributes nothing from it. The fused
/// list is ordered by combined score descending; exact ties keep the
/// order identifiers were first encountered, lexical list first, which
/// also makes lexical display fields win when both lists carry a hit.
fn reciprocal_rank_fusion(
    lexical: Vec<SearchResult>,
    semantic: Vec<SearchResult>,
) -> Vec<SearchResult> {
    let mut order: Vec<MessageId> = Vec::new();
    let mut entries: HashMap<MessageId, SearchResult> = HashMap::new();
    let mut scores: HashMap<MessageId, f64> = HashMap::new();

    for ranking in [lexical, semantic] {
        for (rank, hit) in ranking.into_iter().enumerate() {
            let id = hit.message_id.clone();
            *scores.entry(id.clone()).or_insert(0.0) += 1.0 / (rank as f64 + 1.0);
            if !entries.contains_key(&id) {
                order.push(id.clone());
                entries.insert(id, hit);
            }
        }
    }

    let mut fused: Vec<SearchResult> = order
        .into_iter()
        .filter_map(|id| {
            let mut hit = entries.remove(&id)?;
            hit.score = scores.get(&id).copied().unwrap_or(0.0);
            Some(hit)
        })
        .collect();

    // Stable sort: equal scores keep first-encounter order.
    fused.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    fused
}

/// Returns a compact single-line preview of a body.
///
/// Whitespace is collapsed; text over the length limit is truncated and
/// marked with an ellipsis.
fn body_preview(text: &str, length: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= length {
        return collapsed;
    }
    let truncated: String = collapsed.chars().take(length.saturating_sub(1)).collect();
    format!("{}…", truncated.trim_end())
}
