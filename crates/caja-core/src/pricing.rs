//! # Pricing Engine
//!
//! Deterministic totals computation for the checkout wizard.
//!
//! One pure function, recomputed on every wizard input and again at the
//! instant of submission - totals are never cached across a cart or
//! selection mutation.

use crate::cart::CartLine;
use crate::money::{Money, Rate};
use crate::rates::RateTable;
use crate::types::{PaymentSelection, Totals};

/// Computes the totals for a cart and payment selection.
///
/// ## Calculation Steps
/// 1. `subtotal = Σ line.unit_price × quantity`
/// 2. Resolve the surcharge rate: zero unless a card is selected, in which
///    case the active config matching `(card_subtype, installments)`
///    supplies it (zero when none matches)
/// 3. `surcharge = subtotal × surcharge_rate`
/// 4. `tax = subtotal × tax_rate` - the tax base is the subtotal alone,
///    not the surcharge-inclusive amount
/// 5. `total = subtotal + surcharge + tax`
///
/// Rounding is half-up on the minor unit (see [`Money::apply_rate`]), so
/// identical inputs always produce bit-identical totals.
pub fn compute_totals(
    lines: &[CartLine],
    selection: &PaymentSelection,
    rates: &RateTable,
    tax_rate: Rate,
) -> Totals {
    let subtotal = Money::from_cents(lines.iter().map(|l| l.line_total_cents()).sum());

    let surcharge_bps = if selection.is_card() {
        selection
            .card_subtype
            .and_then(|subtype| rates.surcharge_bps(subtype, selection.installments))
            .unwrap_or(0)
    } else {
        0
    };

    let surcharge = subtotal.apply_rate(Rate::from_bps(surcharge_bps));
    let tax = subtotal.apply_rate(tax_rate);
    let total = subtotal + surcharge + tax;

    Totals {
        subtotal_cents: subtotal.cents(),
        surcharge_cents: surcharge.cents(),
        tax_cents: tax.cents(),
        total_cents: total.cents(),
        surcharge_bps,
        tax_bps: tax_rate.bps(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::Cart;
    use crate::types::{CardSubtype, PaymentMethod, PaymentRateConfig, Product};

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

    fn card_config(subtype: CardSubtype, installments: u32, bps: u32) -> PaymentRateConfig {
        PaymentRateConfig {
            payment_type: PaymentMethod::Card,
            card_subtype: Some(subtype),
            installments,
            surcharge_bps: bps,
            active: true,
            description: None,
        }
    }

    #[test]
    fn test_worked_example() {
        // Cart: $100.00 × 2. Card, bank-affiliated, 3 installments at 10%.
        // Tax 21%. Expect subtotal 200.00, surcharge 20.00, tax 42.00,
        // total 262.00.
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10000, 10), None, 2).unwrap();

        let rates = RateTable::from_configs(vec![card_config(
            CardSubtype::BankAffiliated,
            3,
            1000,
        )]);
        let selection = PaymentSelection {
            method: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::BankAffiliated),
            installments: 3,
        };

        let totals = compute_totals(cart.lines(), &selection, &rates, Rate::from_bps(2100));

        assert_eq!(totals.subtotal_cents, 20000);
        assert_eq!(totals.surcharge_cents, 2000);
        assert_eq!(totals.tax_cents, 4200);
        assert_eq!(totals.total_cents, 26200);
        assert_eq!(totals.surcharge_bps, 1000);
        assert_eq!(totals.tax_bps, 2100);
    }

    #[test]
    fn test_cash_has_no_surcharge() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10000, 10), None, 1).unwrap();

        let rates = RateTable::from_configs(vec![card_config(
            CardSubtype::BankAffiliated,
            3,
            1000,
        )]);

        let totals = compute_totals(
            cart.lines(),
            &PaymentSelection::cash(),
            &rates,
            Rate::from_bps(2100),
        );

        assert_eq!(totals.surcharge_cents, 0);
        assert_eq!(totals.surcharge_bps, 0);
        assert_eq!(totals.total_cents, 12100);
    }

    #[test]
    fn test_unmatched_card_config_means_zero_surcharge() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10000, 10), None, 1).unwrap();

        let rates = RateTable::from_configs(vec![card_config(
            CardSubtype::BankAffiliated,
            3,
            1000,
        )]);
        let selection = PaymentSelection {
            method: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::StoreBranded),
            installments: 6,
        };

        let totals = compute_totals(cart.lines(), &selection, &rates, Rate::from_bps(2100));
        assert_eq!(totals.surcharge_cents, 0);
    }

    #[test]
    fn test_tax_base_is_subtotal_not_surcharged_amount() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 10000, 10), None, 1).unwrap();

        let rates = RateTable::from_configs(vec![card_config(
            CardSubtype::BankAffiliated,
            1,
            1000,
        )]);
        let selection = PaymentSelection {
            method: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::BankAffiliated),
            installments: 1,
        };

        let totals = compute_totals(cart.lines(), &selection, &rates, Rate::from_bps(2100));

        // 21% of 10000, not 21% of 11000
        assert_eq!(totals.tax_cents, 2100);
    }

    #[test]
    fn test_empty_cart_totals_are_zero() {
        let cart = Cart::new();
        let totals = compute_totals(
            cart.lines(),
            &PaymentSelection::cash(),
            &RateTable::default(),
            Rate::from_bps(2100),
        );

        assert_eq!(totals.subtotal_cents, 0);
        assert_eq!(totals.total_cents, 0);
    }

    #[test]
    fn test_compute_totals_is_pure() {
        let mut cart = Cart::new();
        cart.add_item(&test_product("1", 3333, 10), None, 3).unwrap();

        let rates = RateTable::from_configs(vec![card_config(
            CardSubtype::NonBankAffiliated,
            6,
            1575,
        )]);
        let selection = PaymentSelection {
            method: PaymentMethod::Card,
            card_subtype: Some(CardSubtype::NonBankAffiliated),
            installments: 6,
        };
        let tax = Rate::from_bps(2100);

        let first = compute_totals(cart.lines(), &selection, &rates, tax);
        let second = compute_totals(cart.lines(), &selection, &rates, tax);
        assert_eq!(first, second);
    }
}
