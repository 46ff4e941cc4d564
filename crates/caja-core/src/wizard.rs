//! # Checkout Wizard
//!
//! The finite state machine that drives the operator from item review to a
//! submitted sale.
//!
//! ## Step Sequencing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Checkout Wizard States                             │
//! │                                                                         │
//! │  ┌───────┐ pay  ┌────────────────┐ card  ┌──────────────┐              │
//! │  │ ITEMS │ ───► │ PAYMENT_METHOD │ ────► │ CARD_DETAILS │              │
//! │  └───┬───┘      └───────┬────────┘       │  TYPE        │              │
//! │      │ ▲                │ cash/transfer  └──────┬───────┘              │
//! │      │ │                │                       │                       │
//! │      │ │                │          multi-installment configs?          │
//! │      │ │                │              │ yes          │ no             │
//! │      │ │                │              ▼              │                 │
//! │      │ │                │      ┌──────────────┐       │                 │
//! │      │ │                │      │ CARD_DETAILS │       │                 │
//! │      │ │                │      │ INSTALLMENTS │       │                 │
//! │      │ │                │      └──────┬───────┘       │                 │
//! │      │ │                ▼             ▼               ▼                 │
//! │      │ │            ┌──────────────────────────────────┐               │
//! │      │ └─ success ──│             CONFIRM              │               │
//! │      │              └──────────────────────────────────┘               │
//! │      │                                                                  │
//! │  Back walks one step backwards everywhere; CONFIRM returns to the      │
//! │  step it was entered from. Back in PAYMENT_METHOD (or ITEMS) closes.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Rules
//! - The wizard reads cart and rate state through arguments on every call:
//!   explicit snapshots, never values captured at construction time
//! - Opening always resets to ITEMS / cash / cursor 0
//! - Confirmation is only accepted from CONFIRM, never on an empty cart,
//!   and never while a submission is in flight
//! - The wizard emits effects; the orchestration layer performs I/O

use serde::{Deserialize, Serialize};

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::rates::RateTable;
use crate::types::{CardSubtype, PaymentMethod, PaymentSelection};

// =============================================================================
// Steps
// =============================================================================

/// Sub-step of the card details state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardStep {
    /// Choosing one of the three fixed card sub-types.
    Type,
    /// Choosing an installment option for the chosen sub-type.
    Installments,
}

/// Wizard step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// Reviewing cart lines (plus the go-to-payment / clear-cart entries).
    Items,
    /// Choosing among the enabled payment methods.
    PaymentMethod,
    /// Card sub-type / installment selection.
    CardDetails(CardStep),
    /// Reviewing the resolved selection and totals before submission.
    Confirm,
}

// =============================================================================
// Inputs
// =============================================================================

/// Abstract wizard inputs, decoupled from physical keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardInput {
    /// Move the cursor forward in the current list.
    CursorNext,
    /// Move the cursor backward in the current list.
    CursorPrev,
    /// Activate the highlighted entry / confirm the current step.
    Confirm,
    /// Go one step backward (closes the wizard from the first steps).
    Back,
    /// Increase the highlighted line's quantity by one.
    IncrementQuantity,
    /// Decrease the highlighted line's quantity by one (removes at zero).
    DecrementQuantity,
    /// Delete the highlighted line.
    RemoveLine,
}

/// The physical keys the wizard binds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardKey {
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Enter,
    Escape,
    Plus,
    Minus,
    Delete,
}

/// Keyboard binding table.
///
/// An exhaustive match over a closed key set - adding a key without
/// deciding its meaning fails to compile.
pub fn map_key(key: WizardKey) -> WizardInput {
    match key {
        WizardKey::ArrowUp | WizardKey::ArrowLeft => WizardInput::CursorPrev,
        WizardKey::ArrowDown | WizardKey::ArrowRight => WizardInput::CursorNext,
        WizardKey::Enter => WizardInput::Confirm,
        WizardKey::Escape => WizardInput::Back,
        WizardKey::Plus => WizardInput::IncrementQuantity,
        WizardKey::Minus => WizardInput::DecrementQuantity,
        WizardKey::Delete => WizardInput::RemoveLine,
    }
}

// =============================================================================
// Effects
// =============================================================================

/// What the orchestration layer must do after a handled input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEffect {
    /// Nothing beyond re-rendering.
    None,
    /// The wizard closed; discard it and cancel pending timers.
    Closed,
    /// A cart line changed (quantity edit or removal).
    CartChanged,
    /// The cart was emptied from the items step.
    CartCleared,
    /// Submit the sale: recompute totals from cart + selection NOW and
    /// dispatch; report back via `submission_succeeded`/`submission_failed`.
    SubmitRequested,
}

/// What the items-step cursor is pointing at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsRow {
    /// A cart line by display index.
    Line(usize),
    /// The virtual "go to payment" entry.
    GoToPayment,
    /// The virtual "clear cart" entry.
    ClearCart,
}

// =============================================================================
// Wizard
// =============================================================================

/// Checkout wizard state machine.
///
/// Created fresh each time the wizard opens; discarded (or [`Wizard::reset`])
/// on close, cancel, or successful submission.
#[derive(Debug, Clone)]
pub struct Wizard {
    step: Step,
    cursor: usize,
    selection: PaymentSelection,
    /// The step CONFIRM was entered from, for backward navigation.
    confirm_origin: Step,
    /// At-most-one submission in flight.
    submitting: bool,
}

impl Wizard {
    /// Opens a fresh wizard: ITEMS, method=cash, cursor 0.
    pub fn new() -> Self {
        Wizard {
            step: Step::Items,
            cursor: 0,
            selection: PaymentSelection::cash(),
            confirm_origin: Step::Items,
            submitting: false,
        }
    }

    /// Resets to the opening state.
    pub fn reset(&mut self) {
        *self = Wizard::new();
    }

    /// Current step.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Current cursor index within the step's list.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// The in-progress payment selection.
    pub fn selection(&self) -> &PaymentSelection {
        &self.selection
    }

    /// True while a sale submission is in flight.
    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// What the items-step cursor points at.
    pub fn items_row(&self, cart: &Cart) -> ItemsRow {
        let lines = cart.line_count();
        if self.cursor < lines {
            ItemsRow::Line(self.cursor)
        } else if self.cursor == lines {
            ItemsRow::GoToPayment
        } else {
            ItemsRow::ClearCart
        }
    }

    /// Handles one wizard input against the current cart and rate state.
    ///
    /// Validation failures (insufficient stock, empty cart at confirm,
    /// missing payment methods, repeat confirmation) come back as errors
    /// that block the transition; the wizard state is unchanged on error.
    pub fn handle(
        &mut self,
        input: WizardInput,
        cart: &mut Cart,
        methods: &[PaymentMethod],
        rates: &RateTable,
    ) -> CoreResult<WizardEffect> {
        match self.step {
            Step::Items => self.handle_items(input, cart, methods),
            Step::PaymentMethod => self.handle_payment_method(input, methods),
            Step::CardDetails(CardStep::Type) => self.handle_card_type(input, methods, rates),
            Step::CardDetails(CardStep::Installments) => self.handle_installments(input, rates),
            Step::Confirm => self.handle_confirm(input, cart, methods, rates),
        }
    }

    /// Reports a successful sale submission: empties the cart and reopens
    /// at the items step.
    pub fn submission_succeeded(&mut self, cart: &mut Cart) {
        cart.clear();
        self.reset();
    }

    /// Reports a failed sale submission: the wizard stays in CONFIRM with
    /// the cart intact so the operator can retry.
    pub fn submission_failed(&mut self) {
        self.submitting = false;
    }

    // =========================================================================
    // Per-Step Handlers
    // =========================================================================

    fn handle_items(
        &mut self,
        input: WizardInput,
        cart: &mut Cart,
        methods: &[PaymentMethod],
    ) -> CoreResult<WizardEffect> {
        // Two virtual entries follow the cart lines.
        let len = cart.line_count() + 2;

        match input {
            WizardInput::CursorNext => {
                self.cursor = (self.cursor + 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::CursorPrev => {
                self.cursor = (self.cursor + len - 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::IncrementQuantity => {
                if let ItemsRow::Line(index) = self.items_row(cart) {
                    let (line_id, quantity) = match cart.line_at(index) {
                        Some(line) => (line.line_id.clone(), line.quantity),
                        None => return Ok(WizardEffect::None),
                    };
                    cart.update_quantity(&line_id, quantity + 1, None)?;
                    Ok(WizardEffect::CartChanged)
                } else {
                    Ok(WizardEffect::None)
                }
            }
            WizardInput::DecrementQuantity => {
                if let ItemsRow::Line(index) = self.items_row(cart) {
                    let (line_id, quantity) = match cart.line_at(index) {
                        Some(line) => (line.line_id.clone(), line.quantity),
                        None => return Ok(WizardEffect::None),
                    };
                    // Quantity 1 minus 1 deletes the line.
                    cart.update_quantity(&line_id, quantity - 1, None)?;
                    self.clamp_items_cursor(cart);
                    Ok(WizardEffect::CartChanged)
                } else {
                    Ok(WizardEffect::None)
                }
            }
            WizardInput::RemoveLine => {
                if let ItemsRow::Line(index) = self.items_row(cart) {
                    let line_id = match cart.line_at(index) {
                        Some(line) => line.line_id.clone(),
                        None => return Ok(WizardEffect::None),
                    };
                    cart.remove_line(&line_id)?;
                    self.clamp_items_cursor(cart);
                    Ok(WizardEffect::CartChanged)
                } else {
                    Ok(WizardEffect::None)
                }
            }
            WizardInput::Confirm => match self.items_row(cart) {
                ItemsRow::Line(_) => Ok(WizardEffect::None),
                ItemsRow::GoToPayment => {
                    if cart.is_empty() {
                        return Err(CoreError::EmptyCart);
                    }
                    if methods.is_empty() {
                        return Err(CoreError::NoPaymentMethods);
                    }
                    self.step = Step::PaymentMethod;
                    self.cursor = self.method_cursor(methods);
                    Ok(WizardEffect::None)
                }
                ItemsRow::ClearCart => {
                    cart.clear();
                    self.cursor = 0;
                    Ok(WizardEffect::CartCleared)
                }
            },
            WizardInput::Back => Ok(WizardEffect::Closed),
        }
    }

    fn handle_payment_method(
        &mut self,
        input: WizardInput,
        methods: &[PaymentMethod],
    ) -> CoreResult<WizardEffect> {
        let len = methods.len().max(1);

        match input {
            WizardInput::CursorNext => {
                self.cursor = (self.cursor + 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::CursorPrev => {
                self.cursor = (self.cursor + len - 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::Confirm => {
                let method = match methods.get(self.cursor.min(len - 1)) {
                    Some(method) => *method,
                    None => return Err(CoreError::NoPaymentMethods),
                };
                self.selection.method = method;

                if method == PaymentMethod::Card {
                    let subtype = self
                        .selection
                        .card_subtype
                        .unwrap_or(CardSubtype::BankAffiliated);
                    self.selection.card_subtype = Some(subtype);
                    self.step = Step::CardDetails(CardStep::Type);
                    self.cursor = self.subtype_cursor(subtype);
                } else {
                    self.selection.card_subtype = None;
                    self.selection.installments = 1;
                    self.enter_confirm(Step::PaymentMethod);
                }
                Ok(WizardEffect::None)
            }
            WizardInput::Back => {
                // Leaving payment selection closes the wizard.
                Ok(WizardEffect::Closed)
            }
            _ => Ok(WizardEffect::None),
        }
    }

    fn handle_card_type(
        &mut self,
        input: WizardInput,
        methods: &[PaymentMethod],
        rates: &RateTable,
    ) -> CoreResult<WizardEffect> {
        let len = CardSubtype::ALL.len();

        match input {
            WizardInput::CursorNext => {
                self.cursor = (self.cursor + 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::CursorPrev => {
                self.cursor = (self.cursor + len - 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::Confirm => {
                let subtype = CardSubtype::ALL[self.cursor % len];
                self.selection.card_subtype = Some(subtype);
                // Picking a sub-type always lands on its cheapest option.
                self.selection.installments = rates.lowest_installments(subtype);

                if rates.has_multi_installment(subtype) {
                    self.step = Step::CardDetails(CardStep::Installments);
                    self.cursor = self.installments_cursor(subtype, rates);
                } else {
                    self.enter_confirm(Step::CardDetails(CardStep::Type));
                }
                Ok(WizardEffect::None)
            }
            WizardInput::Back => {
                self.step = Step::PaymentMethod;
                self.cursor = self.method_cursor(methods);
                Ok(WizardEffect::None)
            }
            _ => Ok(WizardEffect::None),
        }
    }

    fn handle_installments(
        &mut self,
        input: WizardInput,
        rates: &RateTable,
    ) -> CoreResult<WizardEffect> {
        let subtype = self
            .selection
            .card_subtype
            .unwrap_or(CardSubtype::BankAffiliated);
        let options = rates.installment_options(subtype);
        let len = options.len().max(1);

        match input {
            WizardInput::CursorNext => {
                self.cursor = (self.cursor + 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::CursorPrev => {
                self.cursor = (self.cursor + len - 1) % len;
                Ok(WizardEffect::None)
            }
            WizardInput::Confirm => {
                if let Some(&installments) = options.get(self.cursor.min(len - 1)) {
                    self.selection.installments = installments;
                }
                self.enter_confirm(Step::CardDetails(CardStep::Installments));
                Ok(WizardEffect::None)
            }
            WizardInput::Back => {
                self.step = Step::CardDetails(CardStep::Type);
                self.cursor = self.subtype_cursor(subtype);
                Ok(WizardEffect::None)
            }
            _ => Ok(WizardEffect::None),
        }
    }

    fn handle_confirm(
        &mut self,
        input: WizardInput,
        cart: &mut Cart,
        methods: &[PaymentMethod],
        rates: &RateTable,
    ) -> CoreResult<WizardEffect> {
        match input {
            WizardInput::Confirm => {
                if self.submitting {
                    return Err(CoreError::SubmissionInFlight);
                }
                if cart.is_empty() {
                    return Err(CoreError::EmptyCart);
                }
                self.submitting = true;
                Ok(WizardEffect::SubmitRequested)
            }
            WizardInput::Back => {
                if self.submitting {
                    // Stay put until the in-flight submission resolves.
                    return Ok(WizardEffect::None);
                }
                self.step = self.confirm_origin;
                self.cursor = match self.confirm_origin {
                    Step::PaymentMethod => self.method_cursor(methods),
                    Step::CardDetails(CardStep::Type) => self.subtype_cursor(
                        self.selection
                            .card_subtype
                            .unwrap_or(CardSubtype::BankAffiliated),
                    ),
                    Step::CardDetails(CardStep::Installments) => self.installments_cursor(
                        self.selection
                            .card_subtype
                            .unwrap_or(CardSubtype::BankAffiliated),
                        rates,
                    ),
                    _ => 0,
                };
                Ok(WizardEffect::None)
            }
            _ => Ok(WizardEffect::None),
        }
    }

    // =========================================================================
    // Cursor Helpers
    // =========================================================================

    fn enter_confirm(&mut self, origin: Step) {
        self.confirm_origin = origin;
        self.step = Step::Confirm;
        self.cursor = 0;
    }

    fn clamp_items_cursor(&mut self, cart: &Cart) {
        // Keep the cursor inside lines + two virtual entries.
        self.cursor = self.cursor.min(cart.line_count() + 1);
    }

    fn method_cursor(&self, methods: &[PaymentMethod]) -> usize {
        methods
            .iter()
            .position(|m| *m == self.selection.method)
            .unwrap_or(0)
    }

    fn subtype_cursor(&self, subtype: CardSubtype) -> usize {
        CardSubtype::ALL
            .iter()
            .position(|s| *s == subtype)
            .unwrap_or(0)
    }

    fn installments_cursor(&self, subtype: CardSubtype, rates: &RateTable) -> usize {
        rates
            .installment_options(subtype)
            .iter()
            .position(|i| *i == self.selection.installments)
            .unwrap_or(0)
    }
}

impl Default for Wizard {
    fn default() -> Self {
        Wizard::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
