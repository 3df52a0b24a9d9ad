//! Offers - what a promotion gives once its conditions pass
//!
//! Offers compute against the undiscounted base: the items subtotal for order
//! offers, the line total for item offers. Nothing here reads adjustments
//! produced by other promotions, so percentage offers never compound.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{
    Adjustment, AdjustmentType, Order, OrderItem, Price, PricingError, PricingResult, RoundingMode,
    TargetEntityType,
};

use crate::context::EvaluationContext;

/// Extension point for offers the engine does not know
pub trait CustomOfferPlugin: Send + Sync {
    /// Key matched against `OfferSpec::Custom::plugin_id`
    fn plugin_id(&self) -> &str;

    /// Produce adjustments for the targeted items; the caller tags them
    fn compute(
        &self,
        configuration: &serde_json::Value,
        order: &Order,
        items: &[&OrderItem],
        ctx: &EvaluationContext,
    ) -> PricingResult<Vec<Adjustment>>;
}

/// Registered custom offer plugins, keyed by id
#[derive(Clone, Default)]
pub struct OfferPlugins {
    plugins: HashMap<String, Arc<dyn CustomOfferPlugin>>,
}

impl OfferPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin; a later registration with the same id replaces the earlier one
    pub fn register(&mut self, plugin: Arc<dyn CustomOfferPlugin>) {
        self.plugins.insert(plugin.plugin_id().to_string(), plugin);
    }

    pub fn get(&self, plugin_id: &str) -> Option<&Arc<dyn CustomOfferPlugin>> {
        self.plugins.get(plugin_id)
    }
}

impl fmt::Debug for OfferPlugins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.plugins.keys().collect();
        ids.sort();
        f.debug_struct("OfferPlugins").field("plugins", &ids).finish()
    }
}

/// Everything an offer needs besides the order
pub struct OfferEnv<'a> {
    pub ctx: &'a EvaluationContext,
    pub plugins: &'a OfferPlugins,
    pub rounding: RoundingMode,
    pub fraction_digits: u32,
}

impl OfferEnv<'_> {
    fn round(&self, price: &Price) -> Price {
        price.round(self.rounding, self.fraction_digits)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OfferSpec {
    /// `rate` is a fraction: 0.1 = 10% off
    PercentageOff { rate: Decimal },
    FixedAmountOff { amount: Price },
    FreeShipping,
    Custom {
        plugin_id: String,
        #[serde(default)]
        configuration: serde_json::Value,
    },
}

#[derive(Deserialize)]
struct OfferRecord {
    #[serde(default)]
    target: TargetEntityType,
    spec: OfferSpec,
}

impl TryFrom<OfferRecord> for Offer {
    type Error = PricingError;

    fn try_from(record: OfferRecord) -> Result<Self, Self::Error> {
        Offer::new(record.target, record.spec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OfferRecord")]
pub struct Offer {
    target: TargetEntityType,
    spec: OfferSpec,
}

impl Offer {
    pub fn new(target: TargetEntityType, spec: OfferSpec) -> PricingResult<Self> {
        let offer = Self { target, spec };
        offer.validate()?;
        Ok(offer)
    }

    pub fn order_percentage(rate: Decimal) -> PricingResult<Self> {
        Self::new(TargetEntityType::Order, OfferSpec::PercentageOff { rate })
    }

    pub fn target(&self) -> TargetEntityType {
        self.target
    }

    pub fn spec(&self) -> &OfferSpec {
        &self.spec
    }

    pub fn validate(&self) -> PricingResult<()> {
        match &self.spec {
            OfferSpec::PercentageOff { rate } => {
                if *rate < Decimal::ZERO || *rate > Decimal::ONE {
                    return Err(PricingError::invalid_config(format!(
                        "percentage_off rate must be within [0, 1], got {}",
                        rate
                    )));
                }
            }
            OfferSpec::FixedAmountOff { amount } => {
                if amount.is_negative() {
                    return Err(PricingError::invalid_config(format!(
                        "fixed_amount_off amount must not be negative, got {}",
                        amount
                    )));
                }
            }
            OfferSpec::FreeShipping => {
                if self.target != TargetEntityType::Order {
                    return Err(PricingError::UnsupportedTarget {
                        expected: TargetEntityType::Order,
                        actual: self.target,
                    });
                }
            }
            OfferSpec::Custom { plugin_id, .. } => {
                if plugin_id.trim().is_empty() {
                    return Err(PricingError::invalid_config("custom offer needs a plugin_id"));
                }
            }
        }
        Ok(())
    }

    /// Compute untagged adjustments labelled `label`.
    ///
    /// `items` are the lines an item offer applies to; order offers ignore it.
    pub fn compute(
        &self,
        label: &str,
        order: &Order,
        items: &[&OrderItem],
        env: &OfferEnv<'_>,
    ) -> PricingResult<Vec<Adjustment>> {
        let adjustments = match (&self.spec, self.target) {
            (OfferSpec::PercentageOff { rate }, TargetEntityType::Order) => {
                percentage_off(label, &order.subtotal()?, *rate, env)?
                    .into_iter()
                    .collect()
            }
            (OfferSpec::PercentageOff { rate }, TargetEntityType::OrderItem) => {
                let mut adjustments = Vec::new();
                for item in items {
                    adjustments.extend(percentage_off(label, &item.total_price()?, *rate, env)?);
                }
                adjustments
            }
            (OfferSpec::FixedAmountOff { amount }, TargetEntityType::Order) => {
                if amount.currency_code() != order.currency_code() {
                    tracing::debug!(
                        order_id = order.id(),
                        offer_currency = %amount.currency_code(),
                        "Fixed offer currency differs from order, not applied"
                    );
                    return Ok(Vec::new());
                }
                fixed_off(label, &order.subtotal()?, amount, env)?
                    .into_iter()
                    .collect()
            }
            (OfferSpec::FixedAmountOff { amount }, TargetEntityType::OrderItem) => {
                if amount.currency_code() != order.currency_code() {
                    return Ok(Vec::new());
                }
                let mut adjustments = Vec::new();
                for item in items {
                    let per_line = amount.multiply(item.quantity)?;
                    adjustments.extend(fixed_off(label, &item.total_price()?, &per_line, env)?);
                }
                adjustments
            }
            (OfferSpec::FreeShipping, TargetEntityType::Order) => free_shipping(label, order)?
                .into_iter()
                .collect(),
            (OfferSpec::FreeShipping, actual) => {
                return Err(PricingError::UnsupportedTarget {
                    expected: TargetEntityType::Order,
                    actual,
                });
            }
            (
                OfferSpec::Custom {
                    plugin_id,
                    configuration,
                },
                _,
            ) => {
                let plugin = env.plugins.get(plugin_id).ok_or_else(|| {
                    PricingError::invalid_config(format!(
                        "no custom offer plugin registered as '{}'",
                        plugin_id
                    ))
                })?;
                plugin.compute(configuration, order, items, env.ctx)?
            }
        };
        Ok(adjustments)
    }
}

/// `-round(base * rate)`; nothing for a zero amount
fn percentage_off(
    label: &str,
    base: &Price,
    rate: Decimal,
    env: &OfferEnv<'_>,
) -> PricingResult<Option<Adjustment>> {
    let amount = env.round(&base.multiply(rate)?).negate();
    if amount.is_zero() {
        return Ok(None);
    }
    Ok(Some(
        Adjustment::new(AdjustmentType::Discount, label, amount).with_percentage(rate),
    ))
}

/// `-min(amount, base)`, so a discount never exceeds what it discounts
fn fixed_off(
    label: &str,
    base: &Price,
    amount: &Price,
    env: &OfferEnv<'_>,
) -> PricingResult<Option<Adjustment>> {
    let capped = if amount.greater_than(base)? {
        base.clone()
    } else {
        amount.clone()
    };
    let amount = env.round(&capped).negate();
    if amount.is_zero() || amount.is_positive() {
        return Ok(None);
    }
    Ok(Some(Adjustment::new(AdjustmentType::Discount, label, amount)))
}

/// Negates the caller-supplied shipping charges
fn free_shipping(label: &str, order: &Order) -> PricingResult<Option<Adjustment>> {
    let shipping = order
        .adjustments()
        .iter()
        .filter(|a| a.is_locked() && a.adjustment_type() == AdjustmentType::Shipping)
        .map(Adjustment::amount);
    let total = Price::sum(order.currency_code(), shipping)?;
    if !total.is_positive() {
        return Ok(None);
    }
    Ok(Some(Adjustment::new(
        AdjustmentType::ShippingPromotion,
        label,
        total.negate(),
    )))
}
