//! # Payment Rate Table
//!
//! The merged view of backend-configured surcharge rules.
//!
//! ## Merge Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Rate Table Construction                            │
//! │                                                                         │
//! │  Standard configs            Operator overrides                        │
//! │  ────────────────            ──────────────────                        │
//! │  (bank, 1) → 0.00%           (bank, 3) → 8.00%   ◄── override wins     │
//! │  (bank, 3) → 10.00%          (store, 6) → 12.50%                       │
//! │  (bank, 6) → 18.00%                                                    │
//! │         │                            │                                  │
//! │         └──────────┬─────────────────┘                                  │
//! │                    ▼                                                    │
//! │  Merged by (card_subtype, installments):                               │
//! │  (bank, 1) → 0.00%  (bank, 3) → 8.00%  (bank, 6) → 18.00%             │
//! │  (store, 6) → 12.50%                                                   │
//! │                                                                         │
//! │  Queries only ever see ACTIVE card configs.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The table drives two things in the wizard:
//! - which installment options exist per card sub-type (and therefore
//!   whether the installment step appears at all)
//! - the surcharge rate the pricing engine applies

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{CardSubtype, PaymentMethod, PaymentRateConfig};

/// Merged, queryable set of payment rate configs.
///
/// An empty table means no card payments are offered; the checkout flow
/// degrades to cash/transfer instead of failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateTable {
    configs: Vec<PaymentRateConfig>,
}

impl RateTable {
    /// Builds a table from standard configs plus operator overrides.
    ///
    /// Configs are merged by `(card_subtype, installments)`; an override
    /// with the same key replaces the standard rule entirely (including its
    /// active flag).
    pub fn merge(
        standard: Vec<PaymentRateConfig>,
        overrides: Vec<PaymentRateConfig>,
    ) -> Self {
        let mut merged: BTreeMap<(Option<CardSubtype>, u32), PaymentRateConfig> = BTreeMap::new();

        for config in standard.into_iter().chain(overrides.into_iter()) {
            merged.insert(config.key(), config);
        }

        RateTable {
            configs: merged.into_values().collect(),
        }
    }

    /// Builds a table from a single pre-merged list.
    pub fn from_configs(configs: Vec<PaymentRateConfig>) -> Self {
        Self::merge(configs, Vec::new())
    }

    /// Active card configs, the only ones the checkout flow consults.
    fn active_card_configs(&self) -> impl Iterator<Item = &PaymentRateConfig> {
        self.configs.iter().filter(|c| {
            c.active && c.payment_type == PaymentMethod::Card && c.card_subtype.is_some()
        })
    }

    /// Looks up the surcharge for a (sub-type, installments) pair.
    ///
    /// Returns `None` when no active config matches; the pricing engine
    /// treats that as a zero surcharge.
    pub fn surcharge_bps(&self, subtype: CardSubtype, installments: u32) -> Option<u32> {
        self.active_card_configs()
            .find(|c| c.card_subtype == Some(subtype) && c.installments == installments)
            .map(|c| c.surcharge_bps)
    }

    /// Installment options for a sub-type, ascending and deduplicated.
    pub fn installment_options(&self, subtype: CardSubtype) -> Vec<u32> {
        let mut options: Vec<u32> = self
            .active_card_configs()
            .filter(|c| c.card_subtype == Some(subtype))
            .map(|c| c.installments)
            .collect();
        options.sort_unstable();
        options.dedup();
        options
    }

    /// Lowest configured installment option for a sub-type, or 1 when the
    /// sub-type has no active configs at all.
    pub fn lowest_installments(&self, subtype: CardSubtype) -> u32 {
        self.installment_options(subtype)
            .first()
            .copied()
            .unwrap_or(1)
    }

    /// True when the sub-type offers any option beyond single payment,
    /// which is what makes the wizard show the installment step.
    pub fn has_multi_installment(&self, subtype: CardSubtype) -> bool {
        self.active_card_configs()
            .any(|c| c.card_subtype == Some(subtype) && c.installments > 1)
    }

    /// True when at least one active card config exists.
    ///
    /// When false, card is left out of the enabled payment methods.
    pub fn offers_card_payment(&self) -> bool {
        self.active_card_configs().next().is_some()
    }

    /// All merged configs (active or not), for display/admin purposes.
    pub fn configs(&self) -> &[PaymentRateConfig] {
        &self.configs
    }

    /// True when the table holds no configs at all.
    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
