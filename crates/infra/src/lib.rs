//! Infrastructure layer: document store, transactions, inventory ledger.

pub mod document_store;
pub mod ledger;
pub mod notify;


pub use document_store::{
    DocumentStore, DocumentUpdate, FieldValue, InMemoryDocumentStore, Precondition, StoreError,
    Transaction, TransactionError, VersionedDocument, WriteOp, run_transaction,
};
pub use ledger::{InventoryLedger, ReserveError, STOCK_COLLECTION};
pub use notify::{NoopNotifier, Notifier, StockEvent, spawn_notify};
