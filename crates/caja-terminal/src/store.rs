//! # Cart Store
//!
//! Shared ownership wrapper around the cart.
//!
//! ## Thread Safety
//! The cart is wrapped in `Arc<Mutex<T>>` because:
//! 1. The wizard, the scanner path and the inventory listener all touch it
//! 2. Only one caller may modify the cart at a time
//! 3. Interleaved quantity edits on different lines must not lose updates
//!
//! All mutations happen inside a single `with_cart_mut` closure while the
//! lock is held, so rapid interleaving from async callbacks cannot observe
//! or produce a half-applied cart.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use caja_core::cart::{Cart, LineAdjustment};
use caja_core::types::InventoryChangeEvent;
use caja_sync::ChannelEvent;

/// Shared cart state.
///
/// ## Why Not RwLock?
/// Cart operations are quick and most of them mutate. A RwLock would add
/// complexity with minimal benefit.
#[derive(Debug, Clone, Default)]
pub struct CartStore {
    cart: Arc<Mutex<Cart>>,
}

impl CartStore {
    /// Creates a new empty cart store.
    pub fn new() -> Self {
        CartStore {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Executes a function with read access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// let subtotal = store.with_cart(|cart| cart.subtotal_cents());
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    ///
    /// ## Usage
    /// ```rust,ignore
    /// store.with_cart_mut(|cart| cart.add_item(&product, None, 1))?;
    /// ```
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&mut cart)
    }

    /// Revalidates the cart against a pushed stock change and logs every
    /// correction made.
    pub fn apply_inventory_change(&self, event: &InventoryChangeEvent) -> Vec<LineAdjustment> {
        let adjustments = self.with_cart_mut(|cart| cart.apply_inventory_change(event));

        for adjustment in &adjustments {
            if adjustment.new_quantity == 0 {
                warn!(
                    product_id = %adjustment.product_id,
                    "Line removed: product went out of stock mid-sale"
                );
            } else {
                warn!(
                    product_id = %adjustment.product_id,
                    old_quantity = adjustment.old_quantity,
                    new_quantity = adjustment.new_quantity,
                    "Line quantity clamped to new stock"
                );
            }
        }

        adjustments
    }
}

/// Feeds inventory channel events into the cart store until the channel
/// closes. The rest of the terminal keeps working on stale data whenever
/// the channel is down; this task simply goes quiet.
pub fn spawn_inventory_listener(
    store: CartStore,
    mut events: mpsc::Receiver<ChannelEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::InventoryChange(change) => {
                    store.apply_inventory_change(&change);
                }
                ChannelEvent::Connected => info!("Inventory channel connected"),
                ChannelEvent::Disconnected => warn!("Inventory channel disconnected"),
                ChannelEvent::ReconnectFailed { attempts } => {
                    warn!(attempts, "Inventory channel gave up; stock data is stale");
                }
            }
        }
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
