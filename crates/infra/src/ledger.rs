//! Inventory ledger: transactional reservation and best-effort release.
//!
//! The only two code paths allowed to write `stock_quantity`. `reserve` is
//! all-or-nothing across every line item; `release` is per-item and
//! best-effort, so an order cancellation never fails because one product was
//! deleted in the meantime.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde_json::{Value as JsonValue, json};
use thiserror::Error;

use storefront_core::{DomainError, ProductId};
use storefront_inventory::{
    InsufficientStockError, InventoryLine, ProductStockRecord, RawStockRecord, plan_reservation,
    validate_lines,
};

use crate::document_store::{
    DocumentStore, FieldValue, StoreError, Transaction, TransactionError, WriteOp,
    run_transaction,
};
use crate::notify::{Notifier, StockEvent, spawn_notify};

/// Collection holding one stock document per product.
pub const STOCK_COLLECTION: &str = "product_stock";

/// Reservation failure, as seen by the checkout flow.
///
/// `InsufficientStock` is the expected, user-facing case; the caller converts
/// it into an "adjust your order" message before any payment is attempted.
#[derive(Debug, Error)]
pub enum ReserveError {
    #[error(transparent)]
    InsufficientStock(#[from] InsufficientStockError),

    #[error(transparent)]
    Invalid(#[from] DomainError),

    /// Concurrent reservations kept conflicting; safe to retry.
    #[error("reservation could not complete due to concurrent activity, please try again")]
    Transient,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Abort reasons inside one reservation attempt.
#[derive(Debug)]
enum ReserveAbort {
    Insufficient(InsufficientStockError),
    Store(StoreError),
}

impl From<StoreError> for ReserveAbort {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// All-or-nothing stock reservation over a document store.
pub struct InventoryLedger<S: DocumentStore> {
    store: S,
    collection: String,
    notifier: Option<Arc<dyn Notifier>>,
}

impl<S: DocumentStore> InventoryLedger<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            collection: STOCK_COLLECTION.to_string(),
            notifier: None,
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Attach a best-effort channel for depletion notices.
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Reserve stock for every line item, or none of them.
    ///
    /// Runs a snapshot transaction: read every requested product's stock
    /// document, check availability across all tracked lines, then write the
    /// decrements together with the derived `in_stock` flags in one commit.
    /// Conflicts with concurrent reservations retry the whole cycle; a
    /// shortfall aborts with the full violation list and no writes.
    pub async fn reserve(&self, lines: &[InventoryLine]) -> Result<(), ReserveError> {
        validate_lines(lines)?;

        let outcome = run_transaction(&self.store, |tx| {
            reserve_cycle(tx, self.collection.as_str(), lines)
        })
        .await;

        match outcome {
            Ok(depleted) => {
                if let Some(notifier) = &self.notifier {
                    for (product_id, product_name) in depleted {
                        spawn_notify(
                            notifier.clone(),
                            StockEvent::Depleted {
                                product_id,
                                product_name,
                            },
                        );
                    }
                }
                Ok(())
            }
            Err(TransactionError::Aborted(ReserveAbort::Insufficient(err))) => {
                Err(ReserveError::InsufficientStock(err))
            }
            Err(TransactionError::Aborted(ReserveAbort::Store(err))) => {
                Err(ReserveError::Store(err))
            }
            Err(TransactionError::Exhausted(attempts)) => {
                tracing::warn!(attempts, "reservation retries exhausted");
                Err(ReserveError::Transient)
            }
            Err(TransactionError::Store(err)) => Err(ReserveError::Store(err)),
        }
    }

    /// Return previously reserved quantities, one line at a time.
    ///
    /// Each line is independent: a failure (deleted product, backend error) is
    /// logged and the remaining lines still release. Uses the store's atomic
    /// field increment, so no read-modify-write race with `reserve`.
    pub async fn release(&self, lines: &[InventoryLine]) {
        for line in lines {
            if line.quantity < 1 {
                tracing::warn!(
                    product_id = %line.product_id,
                    quantity = line.quantity,
                    "skipping release with non-positive quantity"
                );
                continue;
            }
            match self.release_one(line).await {
                Ok(released) => {
                    if released {
                        tracing::debug!(
                            product_id = %line.product_id,
                            quantity = line.quantity,
                            "released stock"
                        );
                    }
                }
                Err(err) => {
                    tracing::warn!(
                        product_id = %line.product_id,
                        error = %err,
                        "inventory release failed, continuing with remaining items"
                    );
                }
            }
        }
    }

    async fn release_one(&self, line: &InventoryLine) -> Result<bool, StoreError> {
        let id = line.product_id.to_string();
        let Some(doc) = self.store.get(&self.collection, &id).await? else {
            // Product deleted since the reservation; nothing to release.
            return Ok(false);
        };
        let record = coerce_record(line.product_id, doc.data);
        if !record.track_inventory {
            return Ok(false);
        }

        let mut fields = BTreeMap::new();
        fields.insert(
            "stock_quantity".to_string(),
            FieldValue::Increment(line.quantity),
        );
        // A release always implies at least one unit became available.
        fields.insert("in_stock".to_string(), FieldValue::Set(json!(true)));
        self.store
            .commit(
                vec![WriteOp::merge(self.collection.as_str(), id, fields)],
                vec![],
            )
            .await?;
        Ok(true)
    }
}

/// One read-check-write attempt. Returns the tracked products that reached
/// zero, for depletion notices after commit.
async fn reserve_cycle<'a, S: DocumentStore>(
    mut tx: Transaction<'a, S>,
    collection: &str,
    lines: &[InventoryLine],
) -> Result<(Transaction<'a, S>, Vec<(ProductId, String)>), ReserveAbort> {
    let mut names: HashMap<ProductId, &str> = HashMap::new();
    let mut distinct: Vec<ProductId> = Vec::new();
    for line in lines {
        names.entry(line.product_id).or_insert(line.product_name.as_str());
        if !distinct.contains(&line.product_id) {
            distinct.push(line.product_id);
        }
    }

    // All reads first, under one snapshot.
    let mut records = HashMap::new();
    for product_id in &distinct {
        if let Some(data) = tx.get(collection, &product_id.to_string()).await? {
            records.insert(*product_id, coerce_record(*product_id, data));
        }
    }

    let writes = plan_reservation(lines, &records).map_err(ReserveAbort::Insufficient)?;

    let mut depleted = Vec::new();
    for write in &writes {
        let mut fields = BTreeMap::new();
        fields.insert(
            "stock_quantity".to_string(),
            FieldValue::Set(json!(write.new_quantity)),
        );
        fields.insert("in_stock".to_string(), FieldValue::Set(json!(write.in_stock)));
        tx.merge(collection, &write.product_id.to_string(), fields);

        if write.new_quantity == 0 {
            let name = names
                .get(&write.product_id)
                .map(|n| n.to_string())
                .unwrap_or_default();
            depleted.push((write.product_id, name));
        }
    }

    Ok((tx, depleted))
}

/// Coerce a stored stock document at the boundary. A document that is not an
/// object at all is treated like a missing record (untracked) and logged.
fn coerce_record(product_id: ProductId, data: JsonValue) -> ProductStockRecord {
    let raw: RawStockRecord = match serde_json::from_value(data) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%product_id, error = %err, "malformed stock document, treating as untracked");
            RawStockRecord::default()
        }
    };
    raw.into_record(product_id)
}
