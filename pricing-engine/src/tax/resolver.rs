//! Tax resolution
//!
//! Every enabled tax type whose zone contains the billing address contributes
//! one adjustment per non-zero rate. An order can match several tax types
//! (regional plus national). No address, or no matching zone, means no tax.

use rust_decimal::Decimal;
use shared::{Address, Adjustment, AdjustmentType, Order, Price, PricingError, PricingResult};
use tracing::{debug, warn};

use super::tax_type::TaxType;

/// A tax type skipped because its data is invalid
#[derive(Debug, Clone, PartialEq)]
pub struct TaxFailure {
    pub tax_type_id: i64,
    pub tax_type_name: String,
    pub error: PricingError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaxOutcome {
    pub adjustments: Vec<Adjustment>,
    pub failures: Vec<TaxFailure>,
}

/// Items subtotal plus the non-included discounts, floored at zero
pub fn taxable_base(order: &Order, adjustments: &[Adjustment]) -> PricingResult<Price> {
    let discounts = adjustments
        .iter()
        .filter(|a| a.adjustment_type() == AdjustmentType::Discount && !a.is_included())
        .map(Adjustment::amount);
    let base = order
        .subtotal()?
        .add(&Price::sum(order.currency_code(), discounts)?)?;
    if base.is_negative() {
        return Price::zero(order.currency_code());
    }
    Ok(base)
}

#[derive(Debug, Clone, Copy)]
pub struct TaxResolver {
    fraction_digits: u32,
}

impl TaxResolver {
    /// `fraction_digits` is the minor-unit precision of the order currency
    pub fn new(fraction_digits: u32) -> Self {
        Self { fraction_digits }
    }

    pub fn resolve(
        &self,
        order: &Order,
        adjustments: &[Adjustment],
        address: Option<&Address>,
        tax_types: &[TaxType],
    ) -> PricingResult<TaxOutcome> {
        let mut outcome = TaxOutcome::default();
        let Some(address) = address else {
            debug!(order_id = order.id(), "No billing address, no tax");
            return Ok(outcome);
        };
        let base = taxable_base(order, adjustments)?;

        for tax_type in tax_types.iter().filter(|t| t.enabled) {
            if let Err(error) = tax_type.validate() {
                warn!(
                    tax_type_id = tax_type.id,
                    tax_type = %tax_type.name,
                    error = %error,
                    "Skipping invalid tax type"
                );
                outcome.failures.push(TaxFailure {
                    tax_type_id: tax_type.id,
                    tax_type_name: tax_type.name.clone(),
                    error,
                });
                continue;
            }
            let Some(territory) = tax_type.zone.matching_territory(address) else {
                continue;
            };
            debug!(
                tax_type_id = tax_type.id,
                country = %territory.country_code,
                "Tax zone matched"
            );
            outcome.adjustments.extend(self.compute(tax_type, &base)?);
        }
        Ok(outcome)
    }

    /// Adjustments for every rate of `tax_type` over `base`
    pub fn compute(&self, tax_type: &TaxType, base: &Price) -> PricingResult<Vec<Adjustment>> {
        let mut adjustments = Vec::with_capacity(tax_type.rates.len());
        let mut previous = Price::zero(base.currency_code())?;

        for rate in &tax_type.rates {
            // Zero rates are suppressed rather than emitted as empty lines
            if rate.percentage.is_zero() {
                continue;
            }
            let rate_base = if tax_type.compound {
                base.add(&previous)?
            } else {
                base.clone()
            };
            let raw = if tax_type.display_inclusive {
                rate_base
                    .multiply(rate.percentage)?
                    .divide(Decimal::ONE + rate.percentage)?
            } else {
                rate_base.multiply(rate.percentage)?
            };
            let amount = raw.round(tax_type.rounding_mode, self.fraction_digits);
            debug!(
                tax_type_id = tax_type.id,
                rate = %rate.tag,
                base = %rate_base,
                amount = %amount,
                "Tax rate computed"
            );
            previous = previous.add(&amount)?;
            adjustments.push(
                Adjustment::new(AdjustmentType::Tax, rate.label.clone(), amount)
                    .with_source_id(tax_type.source_id(rate))
                    .with_percentage(rate.percentage)
                    .with_included(tax_type.display_inclusive),
            );
        }
        Ok(adjustments)
    }
}
