//! Adjustment Model
//!
//! A signed monetary delta applied to an order. Adjustments are value objects:
//! the builder methods consume and return a new value, nothing mutates one in
//! place once it sits in an order.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::price::Price;
use crate::error::{PricingError, PricingResult};

/// Adjustment type enum
///
/// Declaration order is the display order used by combined views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Subtotal,
    Discount,
    ShippingPromotion,
    Shipping,
    Fee,
    Tax,
    Custom,
}

impl AdjustmentType {
    pub fn label(&self) -> &'static str {
        match self {
            AdjustmentType::Subtotal => "Subtotal",
            AdjustmentType::Discount => "Discount",
            AdjustmentType::ShippingPromotion => "Shipping promotion",
            AdjustmentType::Shipping => "Shipping",
            AdjustmentType::Fee => "Fee",
            AdjustmentType::Tax => "Tax",
            AdjustmentType::Custom => "Custom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Adjustment {
    #[serde(rename = "type")]
    adjustment_type: AdjustmentType,
    label: String,
    amount: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source_id: Option<String>,
    /// Fraction applied (0.1 = 10%), for percentage-based adjustments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    percentage: Option<Decimal>,
    /// Amount is already part of the unit price (display-inclusive tax)
    #[serde(default)]
    included: bool,
    /// Manual adjustment, preserved by refresh
    #[serde(default)]
    locked: bool,
}

impl Adjustment {
    pub fn new(adjustment_type: AdjustmentType, label: impl Into<String>, amount: Price) -> Self {
        Self {
            adjustment_type,
            label: label.into(),
            amount,
            source_id: None,
            percentage: None,
            included: false,
            locked: false,
        }
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_percentage(mut self, percentage: Decimal) -> Self {
        self.percentage = Some(percentage);
        self
    }

    pub fn with_included(mut self, included: bool) -> Self {
        self.included = included;
        self
    }

    pub fn with_locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn adjustment_type(&self) -> AdjustmentType {
        self.adjustment_type
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> &Price {
        &self.amount
    }

    pub fn source_id(&self) -> Option<&str> {
        self.source_id.as_deref()
    }

    pub fn percentage(&self) -> Option<Decimal> {
        self.percentage
    }

    pub fn is_included(&self) -> bool {
        self.included
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_positive(&self) -> bool {
        self.amount.is_positive()
    }

    pub fn is_negative(&self) -> bool {
        self.amount.is_negative()
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Combine two adjustments describing the same charge.
    ///
    /// Type, source, `included` and `locked` must all match; the label and
    /// percentage of `self` are kept.
    pub fn add(&self, other: &Adjustment) -> PricingResult<Adjustment> {
        if self.adjustment_type != other.adjustment_type {
            return Err(PricingError::invalid_config(format!(
                "cannot combine {:?} adjustment with {:?} adjustment",
                self.adjustment_type, other.adjustment_type
            )));
        }
        if self.source_id != other.source_id
            || self.included != other.included
            || self.locked != other.locked
        {
            return Err(PricingError::invalid_config(
                "cannot combine adjustments from different sources",
            ));
        }
        let mut combined = self.clone();
        combined.amount = self.amount.add(&other.amount)?;
        Ok(combined)
    }

    pub fn multiply(&self, factor: Decimal) -> PricingResult<Adjustment> {
        let mut scaled = self.clone();
        scaled.amount = self.amount.multiply(factor)?;
        Ok(scaled)
    }
}
