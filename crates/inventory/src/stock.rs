//! Per-product stock state as persisted in the document store.

use serde::{Deserialize, Serialize};

use storefront_core::ProductId;

/// Validated stock record for one product.
///
/// Invariant: when `track_inventory` is true, `stock_quantity >= 0` after any
/// committed reservation, and `in_stock` always equals `stock_quantity > 0`.
/// Both fields are written together by every writer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStockRecord {
    pub product_id: ProductId,
    pub track_inventory: bool,
    pub stock_quantity: i64,
    pub in_stock: bool,
}

impl ProductStockRecord {
    /// Record for a newly listed product.
    pub fn new(product_id: ProductId, track_inventory: bool, stock_quantity: i64) -> Self {
        let stock_quantity = stock_quantity.max(0);
        Self {
            product_id,
            track_inventory,
            stock_quantity,
            in_stock: stock_quantity > 0,
        }
    }
}

/// Lenient view of the stored stock document.
///
/// Older documents predate inventory tracking and may lack any of these
/// fields. Coercion happens once here; downstream code only ever sees the
/// validated record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawStockRecord {
    #[serde(default)]
    pub track_inventory: Option<bool>,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub in_stock: Option<bool>,
}

impl RawStockRecord {
    /// Coerce into a validated record. A missing `track_inventory` means the
    /// product never opted into tracking; a missing or negative quantity
    /// clamps to zero; `in_stock` is rederived rather than trusted.
    pub fn into_record(self, product_id: ProductId) -> ProductStockRecord {
        let track_inventory = self.track_inventory.unwrap_or(false);
        let stock_quantity = self.stock_quantity.unwrap_or(0).max(0);
        ProductStockRecord {
            product_id,
            track_inventory,
            stock_quantity,
            in_stock: stock_quantity > 0,
        }
    }
}
