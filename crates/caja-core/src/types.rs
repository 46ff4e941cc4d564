//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │    Product      │   │ PaymentSelection │   │ PaymentRateConfig   │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────────  │  │
//! │  │  id (UUID)      │   │  method          │   │  card_subtype       │  │
//! │  │  name           │   │  card_subtype    │   │  installments       │  │
//! │  │  price_cents    │   │  installments    │   │  surcharge_bps      │  │
//! │  │  stock          │   └──────────────────┘   │  active             │  │
//! │  └─────────────────┘                          └─────────────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌──────────────────┐   ┌─────────────────────┐  │
//! │  │ PaymentMethod   │   │   CardSubtype    │   │       Totals        │  │
//! │  │  ─────────────  │   │  ──────────────  │   │  ─────────────────  │  │
//! │  │  Cash           │   │  BankAffiliated  │   │  subtotal_cents     │  │
//! │  │  Card           │   │  NonBankAffil.   │   │  surcharge_cents    │  │
//! │  │  Transfer       │   │  StoreBranded    │   │  tax_cents, total   │  │
//! │  └─────────────────┘   └──────────────────┘   └─────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payment methods and card sub-types are **closed tagged unions** with
//! exhaustive matches everywhere they are consumed - there is no
//! string-keyed dispatch anywhere in the checkout path.

use serde::{Deserialize, Serialize};

use crate::money::{Money, Rate};

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Immutable snapshot fetched from the backend; `stock` is advisory until
/// the sale is submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name shown to the operator and on the ticket.
    pub name: String,

    /// Price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Current stock level (advisory).
    pub stock: i64,

    /// Threshold below which the product counts as low-stock.
    #[serde(default)]
    pub min_stock: i64,

    /// Whether the product is sold in size variants.
    #[serde(default)]
    pub has_sizes: bool,

    /// Optional category reference.
    #[serde(default)]
    pub category_id: Option<String>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks if the product has any stock left.
    #[inline]
    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Checks if the stock is at or below the low-stock threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment (sub-type and installments selected in the wizard).
    Card,
    /// Bank transfer.
    Transfer,
}

impl PaymentMethod {
    /// Human-readable label for wizard lists and logs.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Transfer => "Transfer",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Card Sub-Type
// =============================================================================

/// Categorization of a card payment, used to select surcharge and
/// installment rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardSubtype {
    /// Card issued through a bank.
    BankAffiliated,
    /// Card issued outside the banking network.
    NonBankAffiliated,
    /// The store's own branded card.
    StoreBranded,
}

impl CardSubtype {
    /// The fixed set the wizard's card-type step navigates, in display
    /// order. Independent of which sub-types have configured rates.
    pub const ALL: [CardSubtype; 3] = [
        CardSubtype::BankAffiliated,
        CardSubtype::NonBankAffiliated,
        CardSubtype::StoreBranded,
    ];

    /// Human-readable label for wizard lists and logs.
    pub fn label(&self) -> &'static str {
        match self {
            CardSubtype::BankAffiliated => "Bank card",
            CardSubtype::NonBankAffiliated => "Non-bank card",
            CardSubtype::StoreBranded => "Store card",
        }
    }
}

impl std::fmt::Display for CardSubtype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Payment Selection
// =============================================================================

/// The in-progress payment choice the wizard builds up.
///
/// `card_subtype` is only meaningful when `method` is [`PaymentMethod::Card`];
/// the wizard enforces that invariant through its transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSelection {
    /// Selected payment method.
    pub method: PaymentMethod,

    /// Card sub-type, set once a card method is chosen.
    pub card_subtype: Option<CardSubtype>,

    /// Installment count (>= 1, default 1).
    pub installments: u32,
}

impl PaymentSelection {
    /// The selection every fresh wizard starts from.
    pub fn cash() -> Self {
        PaymentSelection {
            method: PaymentMethod::Cash,
            card_subtype: None,
            installments: 1,
        }
    }

    /// True when a card method is selected.
    #[inline]
    pub fn is_card(&self) -> bool {
        self.method == PaymentMethod::Card
    }
}

impl Default for PaymentSelection {
    fn default() -> Self {
        PaymentSelection::cash()
    }
}

// =============================================================================
// Payment Rate Config
// =============================================================================

/// A backend-configured surcharge rule for a payment option.
///
/// The set of active configs, keyed by `(card_subtype, installments)`,
/// determines which card sub-types exist and which installment options are
/// offered for each. See [`crate::rates::RateTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRateConfig {
    /// Payment method this rule applies to.
    pub payment_type: PaymentMethod,

    /// Card sub-type; `None` for non-card rules.
    pub card_subtype: Option<CardSubtype>,

    /// Installment count this rule covers (>= 1).
    pub installments: u32,

    /// Surcharge in basis points (1000 = 10.00%).
    pub surcharge_bps: u32,

    /// Inactive configs are kept for bookkeeping but never offered.
    pub active: bool,

    /// Optional operator-facing description.
    #[serde(default)]
    pub description: Option<String>,
}

impl PaymentRateConfig {
    /// Returns the surcharge as a Rate.
    #[inline]
    pub fn surcharge(&self) -> Rate {
        Rate::from_bps(self.surcharge_bps)
    }

    /// Merge key: configs with the same key shadow each other
    /// (operator overrides win over standard rules).
    #[inline]
    pub fn key(&self) -> (Option<CardSubtype>, u32) {
        (self.card_subtype, self.installments)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// The result of a pricing computation.
///
/// Derived, never stored independently of its inputs: every cart or
/// selection mutation recomputes a fresh `Totals`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of line totals before surcharge and tax.
    pub subtotal_cents: i64,

    /// Card surcharge amount.
    pub surcharge_cents: i64,

    /// Tax amount (computed on the subtotal).
    pub tax_cents: i64,

    /// Grand total: subtotal + surcharge + tax.
    pub total_cents: i64,

    /// Surcharge rate applied, in basis points (for display).
    pub surcharge_bps: u32,

    /// Tax rate applied, in basis points (for display).
    pub tax_bps: u32,
}

impl Totals {
    /// Returns the grand total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Returns the subtotal as Money.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

// =============================================================================
// Inventory Change Event
// =============================================================================

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeReason {
    /// Stock consumed by a sale on another terminal.
    Sale,
    /// Stock replenished.
    Restock,
    /// Manual correction.
    #[default]
    Adjustment,
    /// Reason not recognized; treated as a plain adjustment.
    #[serde(other)]
    Unknown,
}

/// A stock change pushed from the backend over the inventory channel.
///
/// The cart uses these to revalidate in-cart quantities; see
/// [`crate::cart::Cart::apply_inventory_change`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryChangeEvent {
    /// Product whose stock changed.
    pub product_id: String,

    /// New absolute stock quantity.
    pub new_stock: i64,

    /// Why the stock changed.
    #[serde(default)]
    pub reason: StockChangeReason,
}

// =============================================================================
// Unit Tests
// =============================================================================
