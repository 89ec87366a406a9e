//! `storefront-inventory` — stock records and reservation planning.
//!
//! Pure domain logic for all-or-nothing stock reservation: given a consistent
//! snapshot of stock records, either plan a decrement for every tracked line
//! or report every shortfall at once. Executing the plan transactionally is
//! the infrastructure layer's job.

pub mod reservation;
pub mod stock;

pub use reservation::{
    InsufficientStockError, InventoryLine, StockViolation, StockWrite, plan_reservation,
    validate_lines,
};
pub use stock::{ProductStockRecord, RawStockRecord};
