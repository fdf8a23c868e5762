//! Local persistence for the mail index.
//!
//! A single SQLite database holds the canonical records, the FTS5 table
//! that powers lexical ranking, and the embedding vectors, namespaced by
//! backend identifier. All ingestion mutations run inside one transaction
//! so a failed batch leaves storage untouched.

pub mod database;
pub mod queries;
pub mod schema;

pub use database::{Database, DatabaseError};
