use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use thiserror::Error;

/// A document together with the store version observed at read time.
///
/// Versions start at 1 for the first committed write and increase by one per
/// committed write to the document. Version 0 is reserved to mean "absent",
/// which lets a precondition pin the non-existence of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub data: JsonValue,
    pub version: u64,
}

/// Field-level update inside a merge.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Replace the field with a value.
    Set(JsonValue),
    /// Atomically add to a numeric field (missing field counts as 0).
    Increment(i64),
}

/// How a write changes a document.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentUpdate {
    /// Replace the whole document (creates it when absent).
    Set(JsonValue),
    /// Update individual fields of an existing document.
    Merge(BTreeMap<String, FieldValue>),
}

/// One staged write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteOp {
    pub collection: String,
    pub id: String,
    pub update: DocumentUpdate,
}

impl WriteOp {
    pub fn set(collection: impl Into<String>, id: impl Into<String>, data: JsonValue) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            update: DocumentUpdate::Set(data),
        }
    }

    pub fn merge(
        collection: impl Into<String>,
        id: impl Into<String>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
            update: DocumentUpdate::Merge(fields),
        }
    }
}

/// Version pin for a commit: the document must still be at `version`
/// (0 = must still be absent) when the commit applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Precondition {
    pub collection: String,
    pub id: String,
    pub version: u64,
}

/// Document store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A precondition failed: a concurrent writer moved an observed document.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    /// A merge targeted a document that does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// Backend failure (IO, serialization, poisoned state).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Versioned JSON document store with optimistic, all-or-nothing commits.
///
/// `commit` must check every precondition against current state and apply
/// either all writes or none. Implementations assign versions monotonically
/// per document and must never apply a write when any precondition fails.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document with its current version.
    async fn get(&self, collection: &str, id: &str)
    -> Result<Option<VersionedDocument>, StoreError>;

    /// Apply `writes` atomically, provided every precondition still holds.
    async fn commit(
        &self,
        writes: Vec<WriteOp>,
        preconditions: Vec<Precondition>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        (**self).get(collection, id).await
    }

    async fn commit(
        &self,
        writes: Vec<WriteOp>,
        preconditions: Vec<Precondition>,
    ) -> Result<(), StoreError> {
        (**self).commit(writes, preconditions).await
    }
}
