//! Versioned document store boundary.
//!
//! This module defines an infrastructure-facing abstraction for reading and
//! conditionally writing JSON documents without making any storage
//! assumptions. Concurrency control is optimistic: every document carries a
//! version, reads observe it, and commits fail on any version that moved.

pub mod in_memory;
pub mod r#trait;
pub mod transaction;

pub use in_memory::InMemoryDocumentStore;
pub use r#trait::{
    DocumentStore, DocumentUpdate, FieldValue, Precondition, StoreError, VersionedDocument,
    WriteOp,
};
pub use transaction::{MAX_TRANSACTION_ATTEMPTS, Transaction, TransactionError, run_transaction};
