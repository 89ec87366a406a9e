use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use super::r#trait::{
    DocumentStore, DocumentUpdate, FieldValue, Precondition, StoreError, VersionedDocument,
    WriteOp,
};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DocKey {
    collection: String,
    id: String,
}

impl DocKey {
    fn new(collection: &str, id: &str) -> Self {
        Self {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    fn path(&self) -> String {
        format!("{}/{}", self.collection, self.id)
    }
}

/// In-memory versioned document store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<DocKey, VersionedDocument>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document outside any transaction (test/bootstrap convenience).
    pub fn seed(&self, collection: &str, id: &str, data: JsonValue) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.insert(
            DocKey::new(collection, id),
            VersionedDocument { data, version: 1 },
        );
    }

    /// Remove a document outside any transaction (test convenience).
    pub fn remove(&self, collection: &str, id: &str) {
        let mut documents = self.documents.write().unwrap_or_else(|e| e.into_inner());
        documents.remove(&DocKey::new(collection, id));
    }

    fn current_version(documents: &HashMap<DocKey, VersionedDocument>, key: &DocKey) -> u64 {
        documents.get(key).map(|d| d.version).unwrap_or(0)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<VersionedDocument>, StoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(documents.get(&DocKey::new(collection, id)).cloned())
    }

    async fn commit(
        &self,
        writes: Vec<WriteOp>,
        preconditions: Vec<Precondition>,
    ) -> Result<(), StoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;

        // Validate everything before mutating anything: commit is all-or-nothing.
        for pre in &preconditions {
            let key = DocKey::new(&pre.collection, &pre.id);
            let current = Self::current_version(&documents, &key);
            if current != pre.version {
                return Err(StoreError::Conflict(format!(
                    "{}: expected version {}, found {}",
                    key.path(),
                    pre.version,
                    current
                )));
            }
        }

        for write in &writes {
            if let DocumentUpdate::Merge(_) = write.update {
                let key = DocKey::new(&write.collection, &write.id);
                if !documents.contains_key(&key) {
                    return Err(StoreError::NotFound(key.path()));
                }
            }
        }

        for write in writes {
            let key = DocKey::new(&write.collection, &write.id);
            let next_version = Self::current_version(&documents, &key) + 1;
            match write.update {
                DocumentUpdate::Set(data) => {
                    documents.insert(
                        key,
                        VersionedDocument {
                            data,
                            version: next_version,
                        },
                    );
                }
                DocumentUpdate::Merge(fields) => {
                    // Existence checked above.
                    let doc = documents.get_mut(&key).ok_or_else(|| {
                        StoreError::Backend(format!("{} vanished mid-commit", key.path()))
                    })?;
                    if !doc.data.is_object() {
                        doc.data = JsonValue::Object(serde_json::Map::new());
                    }
                    let object = doc
                        .data
                        .as_object_mut()
                        .ok_or_else(|| StoreError::Backend("merge target not an object".to_string()))?;
                    for (field, value) in fields {
                        match value {
                            FieldValue::Set(v) => {
                                object.insert(field, v);
                            }
                            FieldValue::Increment(delta) => {
                                let current = object.get(&field).and_then(JsonValue::as_i64).unwrap_or(0);
                                object.insert(field, JsonValue::from(current + delta));
                            }
                        }
                    }
                    doc.version = next_version;
                }
            }
        }

        Ok(())
    }
}
