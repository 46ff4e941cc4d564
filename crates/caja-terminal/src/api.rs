//! # Backend API Client
//!
//! The terminal's collaborators behind typed interfaces: product lookup,
//! stock-by-size lookup, payment rate configuration and sale submission.
//!
//! ## Design Notes
//! - [`BackendClient`] is explicitly constructed and passed by reference.
//!   There is deliberately no module-level cached client or hidden shared
//!   state; whoever owns the terminal owns the client and its lifetime.
//! - The [`Backend`] trait is the seam the checkout flow is tested
//!   through; production wires in the HTTP client, tests wire in fakes.
//! - Failures come back as typed errors. A failed rate fetch degrades to
//!   "no card payments offered"; a failed submission leaves the cart
//!   intact for retry. Nothing here panics.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use caja_core::cart::{CartLine, SizeStockMap};
use caja_core::money::Rate;
use caja_core::rates::RateTable;
use caja_core::types::{
    CardSubtype, PaymentMethod, PaymentRateConfig, PaymentSelection, Product, Totals,
};

use crate::error::{TerminalError, TerminalResult};

/// Sale type tag for counter sales submitted by this terminal.
pub const SALE_TYPE_POS: &str = "pos";

// =============================================================================
// Backend Trait
// =============================================================================

/// The backend operations the checkout flow depends on.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Looks up a product by scanned/typed code. `Ok(None)` means no match;
    /// the caller proceeds with caution rather than failing.
    async fn fetch_product(&self, code: &str) -> TerminalResult<Option<Product>>;

    /// Fetches per-size stock for a sized product.
    async fn fetch_size_stock(&self, product_id: &str) -> TerminalResult<SizeStockMap>;

    /// Fetches the merged payment rate table (standard + overrides).
    async fn fetch_rate_table(&self) -> TerminalResult<RateTable>;

    /// Submits a finalized sale. Non-2xx and transport failures surface as
    /// errors; there is no automatic retry.
    async fn submit_sale(&self, sale: &SaleRequest) -> TerminalResult<SaleResponse>;
}

// =============================================================================
// Request / Response Payloads
// =============================================================================

/// One line of a sale submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItemRequest {
    pub product_id: String,
    pub quantity: i64,
    #[serde(rename = "unit_price")]
    pub unit_price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// The sale submission payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRequest {
    pub sale_type: String,
    pub payment_method: PaymentMethod,
    #[serde(rename = "card_sub_type", skip_serializing_if = "Option::is_none")]
    pub card_subtype: Option<CardSubtype>,
    #[serde(rename = "installment_count")]
    pub installments: u32,
    /// Surcharge rate actually applied, as a percentage (for the ticket).
    pub surcharge_percentage: f64,
    pub items: Vec<SaleItemRequest>,
    #[serde(rename = "total")]
    pub total_cents: i64,
}

impl SaleRequest {
    /// Builds the payload from the cart lines, the resolved selection and
    /// totals computed at the moment of confirmation.
    pub fn from_checkout(
        lines: &[CartLine],
        selection: &PaymentSelection,
        totals: &Totals,
    ) -> Self {
        SaleRequest {
            sale_type: SALE_TYPE_POS.to_string(),
            payment_method: selection.method,
            card_subtype: selection.card_subtype.filter(|_| selection.is_card()),
            installments: selection.installments,
            surcharge_percentage: Rate::from_bps(totals.surcharge_bps).percentage(),
            items: lines
                .iter()
                .map(|line| SaleItemRequest {
                    product_id: line.product_id.clone(),
                    quantity: line.quantity,
                    unit_price_cents: line.unit_price_cents,
                    size: line.size.clone(),
                })
                .collect(),
            total_cents: totals.total_cents,
        }
    }
}

/// The backend's acknowledgement of a submitted sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleResponse {
    /// Identifier of the persisted sale.
    pub id: String,
}

/// Rate config as the backend serves it (percentages on the wire,
/// basis points in the domain).
#[derive(Debug, Clone, Deserialize)]
struct RateConfigDto {
    payment_type: PaymentMethod,
    #[serde(rename = "card_sub_type", default)]
    card_subtype: Option<CardSubtype>,
    #[serde(rename = "installment_count")]
    installments: u32,
    surcharge_percentage: f64,
    active: bool,
    #[serde(default)]
    description: Option<String>,
}

impl RateConfigDto {
    fn into_config(self) -> PaymentRateConfig {
        PaymentRateConfig {
            payment_type: self.payment_type,
            card_subtype: self.card_subtype,
            installments: self.installments,
            surcharge_bps: Rate::from_percentage(self.surcharge_percentage).bps(),
            active: self.active,
            description: self.description,
        }
    }
}

/// Per-size stock row as the backend serves it.
#[derive(Debug, Clone, Deserialize)]
struct SizeStockDto {
    size: String,
    stock: i64,
}

// =============================================================================
// HTTP Backend Client
// =============================================================================

/// HTTP implementation of [`Backend`].
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl BackendClient {
    /// Creates a client for the given backend.
    ///
    /// `base_url` has any trailing slash trimmed so path joining stays
    /// predictable.
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        BackendClient {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn fetch_product(&self, code: &str) -> TerminalResult<Option<Product>> {
        debug!(code, "Fetching product by code");

        let response = self
            .http
            .get(self.url(&format!("/api/products/by-code/{}", code)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(code, "No product for code");
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(TerminalError::backend(format!(
                "Product lookup failed with status {}",
                response.status()
            )));
        }

        let product = response.json::<Product>().await?;
        Ok(Some(product))
    }

    async fn fetch_size_stock(&self, product_id: &str) -> TerminalResult<SizeStockMap> {
        debug!(product_id, "Fetching size stock");

        let response = self
            .http
            .get(self.url(&format!("/api/products/{}/sizes", product_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TerminalError::backend(format!(
                "Size stock lookup failed with status {}",
                response.status()
            )));
        }

        let rows = response.json::<Vec<SizeStockDto>>().await?;
        Ok(rows.into_iter().map(|row| (row.size, row.stock)).collect())
    }

    async fn fetch_rate_table(&self) -> TerminalResult<RateTable> {
        debug!("Fetching payment rate configs");

        let response = self
            .http
            .get(self.url("/api/payment-rates"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(TerminalError::backend(format!(
                "Rate config fetch failed with status {}",
                response.status()
            )));
        }

        let standard: Vec<RateConfigDto> = response.json().await?;

        // Operator overrides are optional; a failed fetch here degrades to
        // the standard rules instead of failing the whole table.
        let overrides = match self
            .http
            .get(self.url("/api/payment-rates/overrides"))
            .bearer_auth(&self.token)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => {
                response.json::<Vec<RateConfigDto>>().await.unwrap_or_else(|e| {
                    warn!(error = %e, "Ignoring malformed rate overrides");
                    Vec::new()
                })
            }
            Ok(response) => {
                warn!(status = %response.status(), "Ignoring failed rate override fetch");
                Vec::new()
            }
            Err(e) => {
                warn!(error = %e, "Ignoring failed rate override fetch");
                Vec::new()
            }
        };

        let table = RateTable::merge(
            standard.into_iter().map(RateConfigDto::into_config).collect(),
            overrides.into_iter().map(RateConfigDto::into_config).collect(),
        );

        info!(
            configs = table.configs().len(),
            offers_card = table.offers_card_payment(),
            "Rate table loaded"
        );
        Ok(table)
    }

    async fn submit_sale(&self, sale: &SaleRequest) -> TerminalResult<SaleResponse> {
        info!(
            payment_method = %sale.payment_method,
            items = sale.items.len(),
            total_cents = sale.total_cents,
            "Submitting sale"
        );

        let response = self
            .http
            .post(self.url("/api/sales"))
            .bearer_auth(&self.token)
            .json(sale)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Sale submission transport failure");
                TerminalError::submission("Could not reach the backend; the sale was not recorded")
            })?;

        if !response.status().is_success() {
            return Err(TerminalError::submission(format!(
                "Sale submission failed with status {}",
                response.status()
            )));
        }

        let ack = response.json::<SaleResponse>().await.map_err(|e| {
            tracing::error!(error = %e, "Malformed sale submission response");
            TerminalError::submission("Backend returned an unreadable response")
        })?;

        info!(sale_id = %ack.id, "Sale submitted");
        Ok(ack)
    }
}

/// Derives the enabled payment methods from the rate table.
///
/// Cash and transfer are always available; card appears only when the
/// merged table actually offers at least one active card config, so an
/// empty or failed rate fetch degrades to "no card payments offered".
pub fn enabled_methods(rates: &RateTable) -> Vec<PaymentMethod> {
    let mut methods = vec![PaymentMethod::Cash];
    if rates.offers_card_payment() {
        methods.push(PaymentMethod::Card);
    }
    methods.push(PaymentMethod::Transfer);
    methods
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use caja_core::cart::Cart;
    use caja_core::pricing::compute_totals;

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

    #[test]
    fn test_rate_dto_converts_percentage_to_bps() {
        let dto: RateConfigDto = serde_json::from_str(
            r#"{
                "payment_type": "card",
                "card_sub_type": "bank_affiliated",
                "installment_count": 3,
                "surcharge_percentage": 10.5,
                "active": true
            }"#,
        )
        .unwrap();

        let config = dto.into_config();
        assert_eq!(config.payment_type, PaymentMethod::Card);
        assert_eq!(config.card_subtype, Some(CardSubtype::BankAffiliated));
        assert_eq!(config.installments, 3);
        assert_eq!(config.surcharge_bps, 1050);
        assert!(config.active);
    }

    #[test]
    fn test_sale_request_from_checkout() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("p-1", 10000, 10), None, 2).unwrap();

        let selection = PaymentSelection {
            method: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::BankAffiliated),
            installments: 3,
        };
        let rates = RateTable::from_configs(vec![PaymentRateConfig {
            payment_type: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::BankAffiliated),
            installments: 3,
            surcharge_bps: 1000,
            active: true,
            description: None,
        }]);
        let totals = compute_totals(cart.lines(), &selection, &rates, Rate::from_bps(2100));

        let request = SaleRequest::from_checkout(cart.lines(), &selection, &totals);

        assert_eq!(request.sale_type, "pos");
        assert_eq!(request.payment_method, PaymentMethod::Card);
        assert_eq!(request.card_subtype, Some(CardSubtype::BankAffiliated));
        assert_eq!(request.installments, 3);
        assert!((request.surcharge_percentage - 10.0).abs() < 1e-9);
        assert_eq!(request.items.len(), 1);
        assert_eq!(request.items[0].quantity, 2);
        assert_eq!(request.total_cents, 26200);
    }

    #[test]
    fn test_sale_request_wire_shape() {
        let request = SaleRequest {
            sale_type: "pos".to_string(),
            payment_method: PaymentMethod::Cash,
            card_subtype: None,
            installments: 1,
            surcharge_percentage: 0.0,
            items: vec![SaleItemRequest {
                product_id: "p-1".to_string(),
                quantity: 1,
                unit_price_cents: 500,
                size: None,
            }],
            total_cents: 605,
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"payment_method\":\"cash\""));
        assert!(json.contains("\"installment_count\":1"));
        assert!(json.contains("\"unit_price\":500"));
        assert!(json.contains("\"total\":605"));
        assert!(!json.contains("_cents")); // Rust names stay off the wire
        assert!(!json.contains("card_sub_type")); // Skipped when absent
        assert!(!json.contains("\"size\"")); // Skipped when absent
    }

    #[test]
    fn test_enabled_methods_degrade_without_card_configs() {
        let methods = enabled_methods(&RateTable::default());
        assert_eq!(methods, vec![PaymentMethod::Cash, PaymentMethod::Transfer]);

        let table = RateTable::from_configs(vec![PaymentRateConfig {
            payment_type: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::StoreBranded),
            installments: 1,
            surcharge_bps: 0,
            active: true,
            description: None,
        }]);
        let methods = enabled_methods(&table);
        assert_eq!(
            methods,
            vec![
                PaymentMethod::Cash,
                PaymentMethod::Card,
                PaymentMethod::Transfer
            ]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("https://pos.example.com/", "t");
        assert_eq!(
            client.url("/api/sales"),
            "https://pos.example.com/api/sales"
        );
    }
}
