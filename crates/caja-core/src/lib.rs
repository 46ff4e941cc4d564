//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate is the **heart** of Caja POS. It contains the checkout logic
//! as pure functions and state machines with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Caja POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  caja-terminal (runtime layer)                  │   │
//! │  │   scanner driver ── cart store ── checkout flow ── backend API  │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ caja-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌──────────┐  │   │
//! │  │  │  money  │ │  cart   │ │ pricing │ │ scanner │ │  wizard  │  │   │
//! │  │  │  Money  │ │  Cart   │ │ totals  │ │  burst  │ │ checkout │  │   │
//! │  │  │  Rate   │ │CartLine │ │surcharge│ │detector │ │   FSM    │  │   │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └──────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO TIMERS • NO NETWORK • PURE STATE MACHINES        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, PaymentSelection, Totals, etc.)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`rates`] - Merged payment surcharge rate table
//! - [`cart`] - Cart and cart line operations
//! - [`pricing`] - Deterministic totals computation
//! - [`scanner`] - Barcode scanner burst classifier
//! - [`wizard`] - Checkout wizard state machine
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every computation is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Explicit Time**: Components that care about time take `Instant` arguments
//! 4. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 5. **Explicit Errors**: All errors are typed, never strings or panics

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod pricing;
pub mod rates;
pub mod scanner;
pub mod types;
pub mod validation;
pub mod wizard;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use caja_core::Money` instead of
// `use caja_core::money::Money`

pub use cart::{Cart, CartLine, LineAdjustment, SizeSelection, SizeStockMap};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Rate};
pub use pricing::compute_totals;
pub use rates::RateTable;
pub use scanner::{Key, KeyPress, ScanClassifier, ScannerConfig};
pub use types::*;
pub use wizard::{map_key, CardStep, ItemsRow, Step, Wizard, WizardEffect, WizardInput, WizardKey};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and ensures reasonable transaction sizes.
/// Can be made configurable per-branch in future versions.
pub const MAX_CART_LINES: usize = 100;

/// Maximum quantity of a single line in the cart.
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Default sales tax rate in basis points (2100 = 21.00%).
///
/// Used when the station configuration does not override it.
pub const DEFAULT_TAX_RATE_BPS: u32 = 2100;
