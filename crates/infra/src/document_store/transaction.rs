//! Snapshot transactions over a [`DocumentStore`].
//!
//! A [`Transaction`] records the version of every document it reads and stages
//! writes without applying them. Committing hands both to the store, which
//! applies the writes only if no observed document moved in the meantime.
//! [`run_transaction`] wraps this in the retry loop: on conflict the whole
//! read-check-write cycle reruns from a fresh snapshot.

use std::collections::BTreeMap;
use std::future::Future;

use serde_json::Value as JsonValue;
use thiserror::Error;

use super::r#trait::{DocumentStore, FieldValue, Precondition, StoreError, WriteOp};

/// Attempt limit before a conflicting transaction is surfaced as transient.
pub const MAX_TRANSACTION_ATTEMPTS: usize = 5;

/// One attempt of a read-check-write cycle.
///
/// The body receives the transaction by value and hands it back on success;
/// dropping it instead aborts the attempt with nothing written.
pub struct Transaction<'a, S: DocumentStore> {
    store: &'a S,
    observed: Vec<Precondition>,
    writes: Vec<WriteOp>,
}

impl<'a, S: DocumentStore> Transaction<'a, S> {
    fn new(store: &'a S) -> Self {
        Self {
            store,
            observed: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Read a document, pinning the observed version for the commit.
    ///
    /// All reads must happen before any write is staged; a staged write would
    /// otherwise be invisible to later reads of the same attempt.
    pub async fn get(&mut self, collection: &str, id: &str) -> Result<Option<JsonValue>, StoreError> {
        if !self.writes.is_empty() {
            return Err(StoreError::Backend(
                "transaction reads must precede writes".to_string(),
            ));
        }
        let doc = self.store.get(collection, id).await?;
        self.observed.push(Precondition {
            collection: collection.to_string(),
            id: id.to_string(),
            version: doc.as_ref().map(|d| d.version).unwrap_or(0),
        });
        Ok(doc.map(|d| d.data))
    }

    /// Stage a whole-document write.
    pub fn set(&mut self, collection: &str, id: &str, data: JsonValue) {
        self.writes.push(WriteOp::set(collection, id, data));
    }

    /// Stage a field-level merge.
    pub fn merge(&mut self, collection: &str, id: &str, fields: BTreeMap<String, FieldValue>) {
        self.writes.push(WriteOp::merge(collection, id, fields));
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.store.commit(self.writes, self.observed).await
    }
}

/// Transaction outcome beyond the body's own success value.
#[derive(Debug, Error)]
pub enum TransactionError<E>
where
    E: core::fmt::Debug,
{
    /// The body aborted; nothing was written.
    #[error("transaction aborted: {0:?}")]
    Aborted(E),

    /// Every attempt hit a concurrent writer. Callers surface this as a
    /// generic "please try again" transient failure.
    #[error("transaction retries exhausted after {0} attempts")]
    Exhausted(usize),

    /// Store failure other than a conflict.
    #[error(transparent)]
    Store(StoreError),
}

/// Run `body` as a snapshot transaction, retrying the whole cycle on conflict.
///
/// The body reads through the transaction handle, stages writes, and returns
/// the handle together with a value (commit follows), or an abort (nothing is
/// written, no retry). Conflicts below [`MAX_TRANSACTION_ATTEMPTS`] are
/// invisible to the caller.
pub async fn run_transaction<'a, S, F, Fut, T, E>(
    store: &'a S,
    mut body: F,
) -> Result<T, TransactionError<E>>
where
    S: DocumentStore,
    E: core::fmt::Debug,
    F: FnMut(Transaction<'a, S>) -> Fut,
    Fut: Future<Output = Result<(Transaction<'a, S>, T), E>>,
{
    for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
        let tx = Transaction::new(store);
        let (tx, value) = match body(tx).await {
            Ok(done) => done,
            Err(abort) => return Err(TransactionError::Aborted(abort)),
        };
        match tx.commit().await {
            Ok(()) => return Ok(value),
            Err(StoreError::Conflict(reason)) => {
                tracing::debug!(attempt, %reason, "transaction conflict, retrying");
            }
            Err(err) => return Err(TransactionError::Store(err)),
        }
    }
    Err(TransactionError::Exhausted(MAX_TRANSACTION_ATTEMPTS))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document_store::InMemoryDocumentStore;
    use serde_json::json;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    async fn bump<'a>(
        mut tx: Transaction<'a, InMemoryDocumentStore>,
    ) -> Result<(Transaction<'a, InMemoryDocumentStore>, i64), StoreError> {
        let doc = tx.get("counters", "c1").await?;
        let n = doc.and_then(|d| d["n"].as_i64()).unwrap_or(0);
        tx.set("counters", "c1", json!({ "n": n + 1 }));
        Ok((tx, n + 1))
    }

    #[test]
    fn commits_read_check_write_cycle() {
        let store = InMemoryDocumentStore::new();
        rt().block_on(async {
            let n = run_transaction(&store, bump).await.unwrap();
            assert_eq!(n, 1);
            let n = run_transaction(&store, bump).await.unwrap();
            assert_eq!(n, 2);
        });
    }

    #[test]
    fn abort_writes_nothing_and_does_not_retry() {
        let store = InMemoryDocumentStore::new();
        store.seed("counters", "c1", json!({ "n": 5 }));
        rt().block_on(async {
            let mut attempts = 0u32;
            let result: Result<(), TransactionError<&str>> = run_transaction(&store, |mut tx| {
                attempts += 1;
                async move {
                    let _ = tx.get("counters", "c1").await;
                    tx.set("counters", "c1", json!({ "n": 99 }));
                    Err("abort")
                }
            })
            .await;

            assert!(matches!(result, Err(TransactionError::Aborted("abort"))));
            assert_eq!(attempts, 1);
            let doc = store.get("counters", "c1").await.unwrap().unwrap();
            assert_eq!(doc.data["n"], json!(5));
        });
    }

    #[test]
    fn read_after_write_is_rejected() {
        let store = InMemoryDocumentStore::new();
        rt().block_on(async {
            let result: Result<(), TransactionError<StoreError>> =
                run_transaction(&store, |mut tx| async move {
                    tx.set("counters", "c1", json!({ "n": 1 }));
                    tx.get("counters", "c1").await?;
                    Ok((tx, ()))
                })
                .await;
            assert!(matches!(
                result,
                Err(TransactionError::Aborted(StoreError::Backend(_)))
            ));
        });
    }

    #[test]
    fn conflict_retries_from_fresh_snapshot() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let store = InMemoryDocumentStore::new();
        store.seed("counters", "c1", json!({ "n": 0 }));
        let raced = AtomicBool::new(false);
        rt().block_on(async {
            let store_ref = &store;
            let raced_ref = &raced;
            // Sneak a competing write in between the first read and commit.
            let result = run_transaction(store_ref, |mut tx| async move {
                let doc = tx.get("counters", "c1").await?;
                let n = doc.and_then(|d| d["n"].as_i64()).unwrap_or(0);
                if !raced_ref.swap(true, Ordering::SeqCst) {
                    store_ref
                        .commit(vec![WriteOp::set("counters", "c1", json!({ "n": 10 }))], vec![])
                        .await?;
                }
                tx.set("counters", "c1", json!({ "n": n + 1 }));
                Ok::<_, StoreError>((tx, n + 1))
            })
            .await
            .unwrap();

            // Second attempt saw the competing write's value.
            assert_eq!(result, 11);
        });
    }

    #[test]
    fn exhausted_attempts_surface_as_transient() {
        let store = InMemoryDocumentStore::new();
        store.seed("counters", "c1", json!({ "n": 0 }));
        rt().block_on(async {
            let store_ref = &store;
            // Every attempt loses the race.
            let result: Result<(), TransactionError<StoreError>> =
                run_transaction(store_ref, |mut tx| async move {
                    let _ = tx.get("counters", "c1").await?;
                    store_ref
                        .commit(vec![WriteOp::set("counters", "c1", json!({ "n": 1 }))], vec![])
                        .await?;
                    tx.set("counters", "c1", json!({ "n": 2 }));
                    Ok((tx, ()))
                })
                .await;

            assert!(matches!(
                result,
                Err(TransactionError::Exhausted(MAX_TRANSACTION_ATTEMPTS))
            ));
        });
    }
}
