//! Core domain types.
//!
//! The canonical mail record and its identifier newtype. Records are the
//! storage-ready representation of one archived message; everything the
//! indexing pipeline and query engine exchange is expressed in these types.

mod message;
mod types;

pub use message::MailRecord;
pub use types::MessageId;
