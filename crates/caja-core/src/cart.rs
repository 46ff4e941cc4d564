//! # Cart
//!
//! The authoritative list of line items for the sale in progress.
//!
//! ## Invariants
//! - Lines are unique by `(product_id, size)`; adding a matching product
//!   merges into the existing line's quantity
//! - Quantity is always >= 1: a quantity-zero update removes the line,
//!   a stored zero never exists
//! - Unit prices are snapshots captured at add-time, not re-read live
//! - Maximum lines: 100, maximum quantity per line: 999
//!
//! ## Stock Validation
//! Stock is advisory until submission: every mutation validates against the
//! last known stock (the size-specific stock for sized items), and the
//! inventory push channel refreshes that knowledge mid-sale via
//! [`Cart::apply_inventory_change`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{InventoryChangeEvent, Product};
use crate::validation::validate_quantity;
use crate::MAX_CART_LINES;

// =============================================================================
// Size Variants
// =============================================================================

/// A chosen size variant together with its size-specific stock,
/// as returned by the stock-by-size lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeSelection {
    /// Size label (e.g. "M", "42").
    pub label: String,

    /// Stock available for this specific size.
    pub stock: i64,
}

/// Size label → available stock, for revalidating sized lines.
pub type SizeStockMap = HashMap<String, i64>;

// =============================================================================
// Cart Line
// =============================================================================

/// One cart row: a product/size combination with a quantity.
///
/// ## Design Notes
/// - `unit_price_cents` is frozen at add-time so the cart displays
///   consistent amounts even if the product is repriced mid-sale. The one
///   exception: merging the same product back in refreshes the price from
///   the live product.
/// - `available_stock` is the last stock figure this line was validated
///   against; inventory events keep it current.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    /// Unique line identifier (UUID v4).
    pub line_id: String,

    /// Product this line references.
    pub product_id: String,

    /// Product name at add-time (frozen).
    pub name: String,

    /// Price in cents at add-time (frozen).
    pub unit_price_cents: i64,

    /// Quantity in cart (>= 1).
    pub quantity: i64,

    /// Size variant, if the product is sold in sizes.
    pub size: Option<String>,

    /// Last known stock for this product/size (advisory).
    pub available_stock: i64,

    /// When this line was first added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    fn from_product(product: &Product, size: Option<&SizeSelection>, quantity: i64) -> Self {
        CartLine {
            line_id: Uuid::new_v4().to_string(),
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            size: size.map(|s| s.label.clone()),
            available_stock: size.map(|s| s.stock).unwrap_or(product.stock),
            added_at: Utc::now(),
        }
    }

    /// Line total (unit price × quantity).
    #[inline]
    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }

    /// Line total as Money.
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_cents(self.line_total_cents())
    }

    fn matches(&self, product_id: &str, size: Option<&str>) -> bool {
        self.product_id == product_id && self.size.as_deref() == size
    }
}

// =============================================================================
// Line Adjustment
// =============================================================================

/// A quantity correction made while revalidating against a stock change.
///
/// `new_quantity == 0` means the line was removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdjustment {
    pub line_id: String,
    pub product_id: String,
    pub old_quantity: i64,
    pub new_quantity: i64,
}

// =============================================================================
// Cart
// =============================================================================

/// The sale in progress.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart { lines: Vec::new() }
    }

    /// Adds a product to the cart, merging into an existing matching line.
    ///
    /// ## Behavior
    /// - Errors with `OutOfStock` when the effective stock is zero or less
    ///   (the size-specific stock for sized items, the product stock
    ///   otherwise)
    /// - An existing `(product, size)` line absorbs the quantity; the merged
    ///   quantity is revalidated against stock and the unit price is
    ///   refreshed from the live product
    /// - Otherwise a new line snapshots the product's current price
    ///
    /// Returns the id of the created or merged line.
    pub fn add_item(
        &mut self,
        product: &Product,
        size: Option<&SizeSelection>,
        quantity: i64,
    ) -> CoreResult<String> {
        validate_quantity(quantity)?;

        let stock = size.map(|s| s.stock).unwrap_or(product.stock);
        if stock <= 0 {
            return Err(CoreError::OutOfStock {
                name: product.name.clone(),
            });
        }

        let size_label = size.map(|s| s.label.as_str());
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.matches(&product.id, size_label))
        {
            let merged = line.quantity + quantity;
            validate_quantity(merged)?;
            if merged > stock {
                return Err(CoreError::InsufficientStock {
                    name: product.name.clone(),
                    available: stock,
                    requested: merged,
                });
            }
            line.quantity = merged;
            line.unit_price_cents = product.price_cents;
            line.available_stock = stock;
            return Ok(line.line_id.clone());
        }

        if quantity > stock {
            return Err(CoreError::InsufficientStock {
                name: product.name.clone(),
                available: stock,
                requested: quantity,
            });
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let line = CartLine::from_product(product, size, quantity);
        let line_id = line.line_id.clone();
        self.lines.push(line);
        Ok(line_id)
    }

    /// Sets a line's quantity, validating against available stock.
    ///
    /// ## Behavior
    /// - `quantity <= 0` removes the line
    /// - Sized lines validate against `size_stock` when provided, falling
    ///   back to the line's advisory stock
    /// - On an insufficient-stock rejection the line is left unchanged
    pub fn update_quantity(
        &mut self,
        line_id: &str,
        quantity: i64,
        size_stock: Option<&SizeStockMap>,
    ) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove_line(line_id);
        }

        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.line_id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;

        let limit = match (&line.size, size_stock) {
            (Some(size), Some(table)) => table
                .get(size)
                .copied()
                .unwrap_or(line.available_stock),
            _ => line.available_stock,
        };

        if quantity > limit {
            return Err(CoreError::InsufficientStock {
                name: line.name.clone(),
                available: limit,
                requested: quantity,
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line from the cart.
    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.line_id != line_id);

        if self.lines.len() == initial_len {
            Err(CoreError::LineNotFound(line_id.to_string()))
        } else {
            Ok(())
        }
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Revalidates in-cart quantities against a pushed stock change.
    ///
    /// Every line referencing the product gets its advisory stock
    /// refreshed; quantities above the new stock are clamped down, and
    /// lines whose product dropped to zero stock are removed. Each
    /// correction is reported so the UI layer can tell the operator.
    pub fn apply_inventory_change(&mut self, event: &InventoryChangeEvent) -> Vec<LineAdjustment> {
        let mut adjustments = Vec::new();

        for line in &mut self.lines {
            if line.product_id != event.product_id {
                continue;
            }

            line.available_stock = event.new_stock;

            let clamped = event.new_stock.max(0).min(line.quantity);
            if clamped != line.quantity {
                adjustments.push(LineAdjustment {
                    line_id: line.line_id.clone(),
                    product_id: line.product_id.clone(),
                    old_quantity: line.quantity,
                    new_quantity: clamped,
                });
                line.quantity = clamped;
            }
        }

        // Quantity 0 is never stored; those lines go away entirely.
        self.lines.retain(|l| l.quantity > 0);

        adjustments
    }

    // =========================================================================
    // Derived Reads
    // =========================================================================

    /// Subtotal in cents: Σ line.unit_price × quantity.
    pub fn subtotal_cents(&self) -> i64 {
        self.lines.iter().map(|l| l.line_total_cents()).sum()
    }

    /// Subtotal as Money.
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents())
    }

    /// Number of lines in the cart.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total quantity across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Checks if the cart is empty.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// All lines, in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Looks up a line by id.
    pub fn line(&self, line_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.line_id == line_id)
    }

    /// Line at a display position, if any.
    pub fn line_at(&self, index: usize) -> Option<&CartLine> {
        self.lines.get(index)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StockChangeReason;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            price_cents,
            stock,
            min_stock: 0,
            has_sizes: false,
            category_id: None,
        }
    }

    fn sized_product(id: &str, price_cents: i64) -> Product {
        Product {
            has_sizes: true,
            ..test_product(id, price_cents, 0)
        }
    }

    #[test]
    fn test_add_item() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, None, 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.subtotal_cents(), 1998);
    }

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);

        let first = cart.add_item(&product, None, 2).unwrap();
        let second = cart.add_item(&product, None, 3).unwrap();

        assert_eq!(first, second); // Same line absorbed the quantity
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 5);
    }

    #[test]
    fn test_add_out_of_stock_product_fails() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 0);

        let err = cart.add_item(&product, None, 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_beyond_stock_fails_and_leaves_line_intact() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 1);

        cart.add_item(&product, None, 1).unwrap();
        let err = cart.add_item(&product, None, 1).unwrap_err();

        assert!(matches!(
            err,
            CoreError::InsufficientStock {
                available: 1,
                requested: 2,
                ..
            }
        ));
        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.total_quantity(), 1);
    }

    #[test]
    fn test_merge_refreshes_unit_price_from_live_product() {
        let mut cart = Cart::new();
        let product = test_product("1", 1000, 10);
        cart.add_item(&product, None, 1).unwrap();

        let repriced = Product {
            price_cents: 1200,
            ..product
        };
        cart.add_item(&repriced, None, 1).unwrap();

        assert_eq!(cart.lines()[0].unit_price_cents, 1200);
        assert_eq!(cart.subtotal_cents(), 2400);
    }

    #[test]
    fn test_sizes_create_separate_lines() {
        let mut cart = Cart::new();
        let product = sized_product("1", 1500);
        let size_m = SizeSelection {
            label: "M".to_string(),
            stock: 5,
        };
        let size_l = SizeSelection {
            label: "L".to_string(),
            stock: 2,
        };

        cart.add_item(&product, Some(&size_m), 1).unwrap();
        cart.add_item(&product, Some(&size_l), 1).unwrap();
        cart.add_item(&product, Some(&size_m), 1).unwrap();

        assert_eq!(cart.line_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_size_specific_stock_limits_add() {
        let mut cart = Cart::new();
        let product = sized_product("1", 1500);
        let size = SizeSelection {
            label: "L".to_string(),
            stock: 2,
        };

        cart.add_item(&product, Some(&size), 2).unwrap();
        let err = cart.add_item(&product, Some(&size), 1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 2, .. }));
    }

    #[test]
    fn test_update_quantity() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);
        let line_id = cart.add_item(&product, None, 2).unwrap();

        cart.update_quantity(&line_id, 5, None).unwrap();
        assert_eq!(cart.total_quantity(), 5);

        let err = cart.update_quantity(&line_id, 11, None).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(cart.total_quantity(), 5); // Unchanged after rejection
    }

    #[test]
    fn test_update_quantity_zero_removes_line() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);
        let line_id = cart.add_item(&product, None, 2).unwrap();

        cart.update_quantity(&line_id, 0, None).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_uses_size_stock_table() {
        let mut cart = Cart::new();
        let product = sized_product("1", 1500);
        let size = SizeSelection {
            label: "M".to_string(),
            stock: 5,
        };
        let line_id = cart.add_item(&product, Some(&size), 1).unwrap();

        // A fresh lookup says only 3 left in M
        let table: SizeStockMap = [("M".to_string(), 3)].into_iter().collect();

        let err = cart.update_quantity(&line_id, 4, Some(&table)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { available: 3, .. }));

        cart.update_quantity(&line_id, 3, Some(&table)).unwrap();
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_remove_unknown_line() {
        let mut cart = Cart::new();
        let err = cart.remove_line("nope").unwrap_err();
        assert!(matches!(err, CoreError::LineNotFound(_)));
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);
        cart.add_item(&product, None, 2).unwrap();

        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal_cents(), 0);
    }

    #[test]
    fn test_inventory_change_clamps_quantity() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);
        cart.add_item(&product, None, 5).unwrap();

        let event = InventoryChangeEvent {
            product_id: "1".to_string(),
            new_stock: 3,
            reason: StockChangeReason::Sale,
        };
        let adjustments = cart.apply_inventory_change(&event);

        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].old_quantity, 5);
        assert_eq!(adjustments[0].new_quantity, 3);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.lines()[0].available_stock, 3);
    }

    #[test]
    fn test_inventory_change_to_zero_removes_line() {
        let mut cart = Cart::new();
        let product = test_product("1", 999, 10);
        cart.add_item(&product, None, 2).unwrap();

        let event = InventoryChangeEvent {
            product_id: "1".to_string(),
            new_stock: 0,
            reason: StockChangeReason::Sale,
        };
        let adjustments = cart.apply_inventory_change(&event);

        assert_eq!(adjustments.len(), 1);
        assert_eq!(adjustments[0].new_quantity, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_inventory_change_other_product_untouched() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 999, 10), None, 2).unwrap();

        let event = InventoryChangeEvent {
            product_id: "2".to_string(),
            new_stock: 0,
            reason: StockChangeReason::Sale,
        };
        let adjustments = cart.apply_inventory_change(&event);

        assert!(adjustments.is_empty());
        assert_eq!(cart.total_quantity(), 2);
    }

    #[test]
    fn test_inventory_restock_only_refreshes_advisory_stock() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 999, 2), None, 2).unwrap();

        let event = InventoryChangeEvent {
            product_id: "1".to_string(),
            new_stock: 8,
            reason: StockChangeReason::Restock,
        };
        let adjustments = cart.apply_inventory_change(&event);

        assert!(adjustments.is_empty());
        assert_eq!(cart.lines()[0].available_stock, 8);

        // The refreshed stock immediately widens what a quantity edit allows
        let line_id = cart.lines()[0].line_id.clone();
        cart.update_quantity(&line_id, 6, None).unwrap();
        assert_eq!(cart.total_quantity(), 6);
    }
}
