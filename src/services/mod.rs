//! High-level services orchestrating the core operations.
//!
//! [`IndexService`] drives ingestion of an mbox archive into storage;
//! [`SearchService`] answers queries in lexical, semantic, or hybrid mode.

mod index_service;
mod search_service;

pub use index_service::{IndexError, IndexOutcome, IndexService};
pub use search_service::{SearchError, SearchMode, SearchResult, SearchService};
