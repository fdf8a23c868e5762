//! mailsift - local full-text and semantic search over mbox mail archives
//!
//! This crate indexes archived mail into a local SQLite store and answers
//! text queries against it: lexical relevance via FTS5, vector similarity
//! via pluggable embedding backends, or a fused combination of both.

pub mod config;
pub mod domain;
pub mod embedding;
pub mod mbox;
pub mod services;
pub mod storage;
