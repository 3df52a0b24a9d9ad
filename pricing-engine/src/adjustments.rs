//! Adjustment combination
//!
//! Derived views over an order's itemized adjustments. Nothing here is stored:
//! the order keeps the full sequence and these are recomputed for display and
//! for the total.
//!
//! - `combine_by_type` groups by `(type, included)` and sums each group
//! - `grand_total` is `subtotal + Σ non-included adjustments`

use std::collections::BTreeMap;

use serde::Serialize;
use shared::{Adjustment, AdjustmentType, Order, Price, PricingResult};

/// One line of the combined view
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeTotal {
    #[serde(rename = "type")]
    pub adjustment_type: AdjustmentType,
    pub label: String,
    pub amount: Price,
    /// Informational line, not counted in the total
    pub included: bool,
}

/// Sum adjustments per `(type, included)`, in type display order
///
/// Included and non-included amounts of the same type stay on separate lines
/// so the informational part never reads as part of the total.
pub fn combine_by_type(currency_code: &str, adjustments: &[Adjustment]) -> PricingResult<Vec<TypeTotal>> {
    let mut groups: BTreeMap<(AdjustmentType, bool), Price> = BTreeMap::new();
    for adjustment in adjustments {
        let key = (adjustment.adjustment_type(), adjustment.is_included());
        let sum = match groups.remove(&key) {
            Some(sum) => sum.add(adjustment.amount())?,
            None => Price::zero(currency_code)?.add(adjustment.amount())?,
        };
        groups.insert(key, sum);
    }

    Ok(groups
        .into_iter()
        .map(|((adjustment_type, included), amount)| TypeTotal {
            adjustment_type,
            label: adjustment_type.label().to_string(),
            amount,
            included,
        })
        .collect())
}

/// `subtotal + Σ amount` over the non-included adjustments
pub fn grand_total(subtotal: &Price, adjustments: &[Adjustment]) -> PricingResult<Price> {
    adjustments
        .iter()
        .filter(|a| !a.is_included())
        .try_fold(subtotal.clone(), |total, a| total.add(a.amount()))
}

/// Display summary of an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderTotalSummary {
    /// Items subtotal at full precision
    pub subtotal: Price,
    /// Combined view of the order's adjustments
    pub adjustments: Vec<TypeTotal>,
    /// Subtotal plus every non-included adjustment
    pub total: Price,
}

impl OrderTotalSummary {
    pub fn from_order(order: &Order) -> PricingResult<Self> {
        let subtotal = order.subtotal()?;
        let total = grand_total(&subtotal, order.adjustments())?;
        Ok(Self {
            adjustments: combine_by_type(order.currency_code(), order.adjustments())?,
            subtotal,
            total,
        })
    }
}
