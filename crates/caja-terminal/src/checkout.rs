//! # Checkout Flow
//!
//! Wires the wizard, the cart store, the rate table and the backend into
//! the complete scan-review-pay-submit loop.
//!
//! ## Submission Rules
//! - Totals for the payload are recomputed from cart + selection at the
//!   instant of dispatch - never reused from an earlier render
//! - At most one submission is in flight (the wizard latches)
//! - Success clears the cart and reopens the wizard at the item list
//! - Failure surfaces the error with the cart intact; retry is manual

use std::sync::Arc;

use tracing::{info, warn};

use caja_core::cart::{SizeSelection, SizeStockMap};
use caja_core::money::Rate;
use caja_core::pricing::compute_totals;
use caja_core::rates::RateTable;
use caja_core::types::{PaymentMethod, Product, Totals};
use caja_core::wizard::{map_key, Wizard, WizardEffect, WizardInput, WizardKey};

use crate::api::{enabled_methods, Backend, SaleRequest, SaleResponse};
use crate::error::TerminalResult;
use crate::store::CartStore;

// =============================================================================
// Flow Outcomes
// =============================================================================

/// Result of looking up a scanned code.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// Product added straight to the cart.
    Added { line_id: String },

    /// Sized product: the UI must ask for a size before adding
    /// (see [`CheckoutFlow::add_sized`]).
    NeedsSizeChoice {
        product: Product,
        sizes: SizeStockMap,
    },

    /// No product matched the code; proceed with caution.
    UnknownCode,
}

/// What a handled wizard input produced.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    /// A plain wizard effect (navigation, cart edit, close, ...).
    Wizard(WizardEffect),

    /// The sale went through; cart cleared, wizard reset.
    SaleCompleted(SaleResponse),
}

// =============================================================================
// Checkout Flow
// =============================================================================

/// The complete checkout orchestration for one terminal.
pub struct CheckoutFlow<B: Backend> {
    backend: Arc<B>,
    store: CartStore,
    rates: RateTable,
    methods: Vec<PaymentMethod>,
    wizard: Wizard,
    tax_rate: Rate,
}

impl<B: Backend> CheckoutFlow<B> {
    /// Loads the rate configuration and builds the flow.
    ///
    /// A failed or empty rate fetch degrades to cash/transfer only; the
    /// terminal never refuses to start over missing card rules.
    pub async fn load(backend: Arc<B>, store: CartStore, tax_rate: Rate) -> Self {
        let rates = fetch_rates_or_degrade(backend.as_ref()).await;
        let methods = enabled_methods(&rates);

        CheckoutFlow {
            backend,
            store,
            rates,
            methods,
            wizard: Wizard::new(),
            tax_rate,
        }
    }

    /// Re-fetches the rate configuration (rules change on the backend
    /// while terminals stay open).
    pub async fn refresh_rates(&mut self) {
        self.rates = fetch_rates_or_degrade(self.backend.as_ref()).await;
        self.methods = enabled_methods(&self.rates);
    }

    /// The wizard state, for rendering.
    pub fn wizard(&self) -> &Wizard {
        &self.wizard
    }

    /// The enabled payment methods, in display order.
    pub fn methods(&self) -> &[PaymentMethod] {
        &self.methods
    }

    /// The active rate table.
    pub fn rates(&self) -> &RateTable {
        &self.rates
    }

    /// The shared cart store.
    pub fn store(&self) -> &CartStore {
        &self.store
    }

    /// Display totals for the current cart and in-progress selection.
    ///
    /// Recomputed on every call; nothing is cached across mutations.
    pub fn totals(&self) -> Totals {
        let selection = *self.wizard.selection();
        self.store.with_cart(|cart| {
            compute_totals(cart.lines(), &selection, &self.rates, self.tax_rate)
        })
    }

    // =========================================================================
    // Scanning
    // =========================================================================

    /// Resolves a completed scanner code and adds the product to the cart.
    pub async fn scan(&self, code: &str) -> TerminalResult<ScanOutcome> {
        match self.backend.fetch_product(code).await? {
            None => {
                warn!(code, "Scanned code matched no product");
                Ok(ScanOutcome::UnknownCode)
            }
            Some(product) if product.has_sizes => {
                // Size choice needs operator input; hand the UI what it
                // needs and let it come back through add_sized.
                let sizes = match self.backend.fetch_size_stock(&product.id).await {
                    Ok(sizes) => sizes,
                    Err(e) => {
                        warn!(error = %e, product_id = %product.id, "Size stock lookup failed");
                        SizeStockMap::new()
                    }
                };
                Ok(ScanOutcome::NeedsSizeChoice { product, sizes })
            }
            Some(product) => {
                let line_id = self
                    .store
                    .with_cart_mut(|cart| cart.add_item(&product, None, 1))?;
                info!(product_id = %product.id, "Product added to cart");
                Ok(ScanOutcome::Added { line_id })
            }
        }
    }

    /// Adds a sized product once the operator picked a size.
    pub fn add_sized(
        &self,
        product: &Product,
        size: &SizeSelection,
        quantity: i64,
    ) -> TerminalResult<String> {
        let line_id = self
            .store
            .with_cart_mut(|cart| cart.add_item(product, Some(size), quantity))?;
        Ok(line_id)
    }

    // =========================================================================
    // Wizard Driving
    // =========================================================================

    /// Handles a raw wizard key through the binding table.
    pub async fn handle_key(&mut self, key: WizardKey) -> TerminalResult<FlowEvent> {
        self.handle_input(map_key(key)).await
    }

    /// Handles one abstract wizard input, performing the submission when
    /// the wizard asks for it.
    pub async fn handle_input(&mut self, input: WizardInput) -> TerminalResult<FlowEvent> {
        let effect = {
            let wizard = &mut self.wizard;
            let methods = &self.methods;
            let rates = &self.rates;
            self.store
                .with_cart_mut(|cart| wizard.handle(input, cart, methods, rates))?
        };

        match effect {
            WizardEffect::SubmitRequested => {
                let response = self.submit().await?;
                Ok(FlowEvent::SaleCompleted(response))
            }
            WizardEffect::Closed => {
                // Close discards wizard state; the embedding app also stops
                // the scanner service it owns.
                self.wizard.reset();
                Ok(FlowEvent::Wizard(WizardEffect::Closed))
            }
            other => Ok(FlowEvent::Wizard(other)),
        }
    }

    /// Dispatches the sale. Totals come from the cart + selection as they
    /// are RIGHT NOW, not from any earlier snapshot.
    async fn submit(&mut self) -> TerminalResult<SaleResponse> {
        let selection = *self.wizard.selection();
        let (lines, totals) = self.store.with_cart(|cart| {
            let totals = compute_totals(cart.lines(), &selection, &self.rates, self.tax_rate);
            (cart.lines().to_vec(), totals)
        });
        let request = SaleRequest::from_checkout(&lines, &selection, &totals);

        match self.backend.submit_sale(&request).await {
            Ok(response) => {
                let wizard = &mut self.wizard;
                self.store
                    .with_cart_mut(|cart| wizard.submission_succeeded(cart));
                info!(
                    sale_id = %response.id,
                    total_cents = totals.total_cents,
                    "Sale completed"
                );
                Ok(response)
            }
            Err(e) => {
                self.wizard.submission_failed();
                warn!(error = %e, "Sale submission failed, cart preserved for retry");
                Err(e)
            }
        }
    }
}

async fn fetch_rates_or_degrade<B: Backend + ?Sized>(backend: &B) -> RateTable {
    match backend.fetch_rate_table().await {
        Ok(table) => table,
        Err(e) => {
            warn!(error = %e, "Rate config fetch failed; offering no card payments");
            RateTable::default()
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use caja_core::types::{CardSubtype, PaymentRateConfig};
    use caja_core::wizard::ItemsRow;

    use crate::error::TerminalError;

    // =========================================================================
    // Fake Backend
    // =========================================================================

    #[derive(Default)]
    struct FakeBackend {
        products: Vec<Product>,
        rates: RateTable,
        fail_rates: bool,
        fail_submission: AtomicBool,
        submitted: Mutex<Vec<SaleRequest>>,
    }

    #[async_trait]
    impl Backend for FakeBackend {
        async fn fetch_product(&self, code: &str) -> TerminalResult<Option<Product>> {
            Ok(self.products.iter().find(|p| p.id == code).cloned())
        }

        async fn fetch_size_stock(&self, _product_id: &str) -> TerminalResult<SizeStockMap> {
            Ok([("M".to_string(), 3)].into_iter().collect())
        }

        async fn fetch_rate_table(&self) -> TerminalResult<RateTable> {
            if self.fail_rates {
                Err(TerminalError::backend("rates endpoint down"))
            } else {
                Ok(self.rates.clone())
            }
        }

        async fn submit_sale(&self, sale: &SaleRequest) -> TerminalResult<SaleResponse> {
            if self.fail_submission.load(Ordering::SeqCst) {
                return Err(TerminalError::submission("backend rejected the sale"));
            }
            self.submitted.lock().unwrap().push(sale.clone());
            Ok(SaleResponse {
                id: "sale-1".to_string(),
            })
        }
    }

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

    fn bank_rates() -> RateTable {
        RateTable::from_configs(vec![
            PaymentRateConfig {
                payment_type: PaymentMethod::Card,
                card_subtype: Some(CardSubtype::BankAffiliated),
                installments: 1,
                surcharge_bps: 0,
                active: true,
                description: None,
            },
            PaymentRateConfig {
                payment_type: PaymentMethod::Card,
                card_subtype: Some(CardSubtype::BankAffiliated),
                installments: 3,
                surcharge_bps: 1000,
                active: true,
                description: None,
            },
        ])
    }

    async fn flow_with(backend: FakeBackend) -> CheckoutFlow<FakeBackend> {
        CheckoutFlow::load(Arc::new(backend), CartStore::new(), Rate::from_bps(2100)).await
    }

    /// Drives the wizard from the item list to CONFIRM paying cash.
    async fn drive_to_confirm(flow: &mut CheckoutFlow<FakeBackend>) {
        loop {
            let row = flow.store().with_cart(|cart| flow.wizard().items_row(cart));
            if matches!(row, ItemsRow::GoToPayment) {
                break;
            }
            flow.handle_input(WizardInput::CursorNext).await.unwrap();
        }
        flow.handle_input(WizardInput::Confirm).await.unwrap();
        // Cash sits at cursor 0 of the method list.
        flow.handle_input(WizardInput::Confirm).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_rate_fetch_degrades_to_no_card() {
        let backend = FakeBackend {
            fail_rates: true,
            ..Default::default()
        };
        let flow = flow_with(backend).await;

        assert_eq!(
            flow.methods(),
            &[PaymentMethod::Cash, PaymentMethod::Transfer]
        );
    }

    #[tokio::test]
    async fn test_rates_enable_card() {
        let backend = FakeBackend {
            rates: bank_rates(),
            ..Default::default()
        };
        let flow = flow_with(backend).await;

        assert_eq!(
            flow.methods(),
            &[
                PaymentMethod::Cash,
                PaymentMethod::Card,
                PaymentMethod::Transfer
            ]
        );
    }

    #[tokio::test]
    async fn test_scan_adds_product() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 2500, 4)],
            ..Default::default()
        };
        let flow = flow_with(backend).await;

        match flow.scan("p-1").await.unwrap() {
            ScanOutcome::Added { .. } => {}
            other => panic!("expected Added, got {:?}", other),
        }
        assert_eq!(flow.store().with_cart(|c| c.subtotal_cents()), 2500);

        // Scanning again merges rather than duplicating the line.
        flow.scan("p-1").await.unwrap();
        assert_eq!(flow.store().with_cart(|c| c.line_count()), 1);
        assert_eq!(flow.store().with_cart(|c| c.total_quantity()), 2);
    }

    #[tokio::test]
    async fn test_scan_unknown_code() {
        let flow = flow_with(FakeBackend::default()).await;

        match flow.scan("nope").await.unwrap() {
            ScanOutcome::UnknownCode => {}
            other => panic!("expected UnknownCode, got {:?}", other),
        }
        assert!(flow.store().with_cart(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_scan_sized_product_asks_for_size() {
        let mut product = test_product("p-2", 5000, 0);
        product.has_sizes = true;
        let backend = FakeBackend {
            products: vec![product],
            ..Default::default()
        };
        let flow = flow_with(backend).await;

        match flow.scan("p-2").await.unwrap() {
            ScanOutcome::NeedsSizeChoice { product, sizes } => {
                assert_eq!(product.id, "p-2");
                assert_eq!(sizes.get("M"), Some(&3));

                let size = SizeSelection {
                    label: "M".to_string(),
                    stock: 3,
                };
                flow.add_sized(&product, &size, 2).unwrap();
            }
            other => panic!("expected NeedsSizeChoice, got {:?}", other),
        }
        assert_eq!(flow.store().with_cart(|c| c.total_quantity()), 2);
    }

    #[tokio::test]
    async fn test_cash_checkout_submits_and_resets() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 10000, 10)],
            ..Default::default()
        };
        let mut flow = flow_with(backend).await;
        flow.scan("p-1").await.unwrap();
        flow.scan("p-1").await.unwrap(); // quantity 2

        drive_to_confirm(&mut flow).await;

        let event = flow.handle_input(WizardInput::Confirm).await.unwrap();
        let response = match event {
            FlowEvent::SaleCompleted(response) => response,
            other => panic!("expected SaleCompleted, got {:?}", other),
        };
        assert_eq!(response.id, "sale-1");

        // Cart cleared, wizard back at the item list.
        assert!(flow.store().with_cart(|c| c.is_empty()));
        assert_eq!(flow.wizard().step(), caja_core::wizard::Step::Items);
        assert!(!flow.wizard().is_submitting());

        // Payload carried totals computed at dispatch: 20000 + 21% tax.
        let submitted = flow.backend.submitted.lock().unwrap();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].total_cents, 24200);
        assert_eq!(submitted[0].payment_method, PaymentMethod::Cash);
        assert_eq!(submitted[0].installments, 1);
    }

    #[tokio::test]
    async fn test_submission_failure_preserves_cart_for_retry() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 10000, 10)],
            ..Default::default()
        };
        backend.fail_submission.store(true, Ordering::SeqCst);
        let mut flow = flow_with(backend).await;
        flow.scan("p-1").await.unwrap();

        drive_to_confirm(&mut flow).await;

        let err = flow.handle_input(WizardInput::Confirm).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::SubmissionFailed);

        // Cart intact, wizard still in CONFIRM, latch released.
        assert_eq!(flow.store().with_cart(|c| c.line_count()), 1);
        assert_eq!(flow.wizard().step(), caja_core::wizard::Step::Confirm);
        assert!(!flow.wizard().is_submitting());

        // Manual retry succeeds once the backend recovers.
        flow.backend.fail_submission.store(false, Ordering::SeqCst);
        let event = flow.handle_input(WizardInput::Confirm).await.unwrap();
        assert!(matches!(event, FlowEvent::SaleCompleted(_)));
        assert!(flow.store().with_cart(|c| c.is_empty()));
    }

    #[tokio::test]
    async fn test_totals_are_recomputed_at_dispatch() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 10000, 10)],
            ..Default::default()
        };
        let mut flow = flow_with(backend).await;
        flow.scan("p-1").await.unwrap();

        drive_to_confirm(&mut flow).await;

        // The cart changes underneath a stale CONFIRM render (another
        // callback merged in a second unit).
        let product = test_product("p-1", 10000, 10);
        flow.store()
            .with_cart_mut(|cart| cart.add_item(&product, None, 1))
            .unwrap();

        flow.handle_input(WizardInput::Confirm).await.unwrap();

        let submitted = flow.backend.submitted.lock().unwrap();
        // 20000 subtotal + 4200 tax, not the stale single-unit total.
        assert_eq!(submitted[0].total_cents, 24200);
        assert_eq!(submitted[0].items[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_card_checkout_carries_surcharge() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 10000, 10)],
            rates: bank_rates(),
            ..Default::default()
        };
        let mut flow = flow_with(backend).await;
        flow.scan("p-1").await.unwrap();
        flow.scan("p-1").await.unwrap();

        // Items → payment list
        loop {
            let row = flow.store().with_cart(|cart| flow.wizard().items_row(cart));
            if matches!(row, ItemsRow::GoToPayment) {
                break;
            }
            flow.handle_input(WizardInput::CursorNext).await.unwrap();
        }
        flow.handle_input(WizardInput::Confirm).await.unwrap();

        // Cash → Card
        flow.handle_input(WizardInput::CursorNext).await.unwrap();
        flow.handle_input(WizardInput::Confirm).await.unwrap();
        // Bank-affiliated
        flow.handle_input(WizardInput::Confirm).await.unwrap();
        // 1 → 3 installments
        flow.handle_input(WizardInput::CursorNext).await.unwrap();
        flow.handle_input(WizardInput::Confirm).await.unwrap();

        // Display totals show the surcharge before confirmation.
        let totals = flow.totals();
        assert_eq!(totals.surcharge_cents, 2000);
        assert_eq!(totals.total_cents, 26200);

        let event = flow.handle_input(WizardInput::Confirm).await.unwrap();
        assert!(matches!(event, FlowEvent::SaleCompleted(_)));

        let submitted = flow.backend.submitted.lock().unwrap();
        assert_eq!(submitted[0].card_subtype, Some(CardSubtype::BankAffiliated));
        assert_eq!(submitted[0].installments, 3);
        assert!((submitted[0].surcharge_percentage - 10.0).abs() < 1e-9);
        assert_eq!(submitted[0].total_cents, 26200);
    }

    #[tokio::test]
    async fn test_close_resets_wizard() {
        let backend = FakeBackend {
            products: vec![test_product("p-1", 10000, 10)],
            ..Default::default()
        };
        let mut flow = flow_with(backend).await;
        flow.scan("p-1").await.unwrap();

        flow.handle_input(WizardInput::CursorNext).await.unwrap();
        let event = flow.handle_input(WizardInput::Back).await.unwrap();
        assert!(matches!(event, FlowEvent::Wizard(WizardEffect::Closed)));

        assert_eq!(flow.wizard().cursor(), 0);
        assert_eq!(flow.wizard().step(), caja_core::wizard::Step::Items);
    }
}
