//! Reservation planning: all-or-nothing stock decrements.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use storefront_core::{DomainError, DomainResult, ProductId};

use crate::stock::ProductStockRecord;

/// One requested decrement, owned transiently by the checkout flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i64,
}

impl InventoryLine {
    pub fn new(product_id: ProductId, product_name: impl Into<String>, quantity: i64) -> Self {
        Self {
            product_id,
            product_name: product_name.into(),
            quantity,
        }
    }
}

/// Reject empty requests and non-positive quantities before planning.
pub fn validate_lines(lines: &[InventoryLine]) -> DomainResult<()> {
    if lines.is_empty() {
        return Err(DomainError::validation("reservation has no line items"));
    }
    for line in lines {
        if line.quantity < 1 {
            return Err(DomainError::validation(format!(
                "quantity for '{}' must be at least 1, got {}",
                line.product_name, line.quantity
            )));
        }
    }
    Ok(())
}

/// One line item the snapshot cannot satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockViolation {
    pub product_id: ProductId,
    pub product_name: String,
    pub requested: i64,
    pub available: i64,
}

/// Every shortfall in the request, collected in one pass so the caller can
/// report all problems in a single round trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("insufficient stock for {} line item(s): {}", .details.len(), format_violations(.details))]
pub struct InsufficientStockError {
    pub details: Vec<StockViolation>,
}

fn format_violations(details: &[StockViolation]) -> String {
    details
        .iter()
        .map(|v| format!("{} (requested {}, available {})", v.product_name, v.requested, v.available))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The planned write for one tracked product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWrite {
    pub product_id: ProductId,
    pub new_quantity: i64,
    pub in_stock: bool,
}

/// Plan an all-or-nothing reservation against a consistent snapshot.
///
/// Untracked products and products with no stock record are skipped: they have
/// unlimited apparent stock. Tracked lines are checked against the snapshot,
/// with duplicate product ids accumulated first so a request cannot dodge the
/// availability check by splitting a line. Either every tracked line fits and
/// a write is planned for each, or the error lists every shortfall and nothing
/// is planned.
pub fn plan_reservation(
    lines: &[InventoryLine],
    records: &HashMap<ProductId, ProductStockRecord>,
) -> Result<Vec<StockWrite>, InsufficientStockError> {
    // Accumulate per product, keeping first-seen order and name.
    let mut order: Vec<ProductId> = Vec::new();
    let mut requested: HashMap<ProductId, (String, i64)> = HashMap::new();
    for line in lines {
        match requested.get_mut(&line.product_id) {
            Some((_, total)) => *total = total.saturating_add(line.quantity),
            None => {
                order.push(line.product_id);
                requested.insert(line.product_id, (line.product_name.clone(), line.quantity));
            }
        }
    }

    let mut writes = Vec::new();
    let mut violations = Vec::new();
    for product_id in order {
        let (product_name, total) = &requested[&product_id];
        let Some(record) = records.get(&product_id) else {
            continue;
        };
        if !record.track_inventory {
            continue;
        }

        if record.stock_quantity >= *total {
            let new_quantity = record.stock_quantity - total;
            writes.push(StockWrite {
                product_id,
                new_quantity,
                in_stock: new_quantity > 0,
            });
        } else {
            violations.push(StockViolation {
                product_id,
                product_name: product_name.clone(),
                requested: *total,
                available: record.stock_quantity,
            });
        }
    }

    if violations.is_empty() {
        Ok(writes)
    } else {
        Err(InsufficientStockError { details: violations })
    }
}
