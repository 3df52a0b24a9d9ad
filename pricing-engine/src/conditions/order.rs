//! Order-level conditions

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{ComparisonOperator, Price, PricingError, PricingResult, TargetEntityType};

use super::{ConditionEvaluator, Target};
use crate::context::EvaluationContext;
use crate::zone::Zone;

/// Role every visitor has
pub const ANONYMOUS_ROLE: &str = "anonymous";
/// Role implied by a known customer
pub const AUTHENTICATED_ROLE: &str = "authenticated";

fn non_empty<T>(items: &BTreeSet<T>, what: &str) -> PricingResult<()> {
    if items.is_empty() {
        return Err(PricingError::invalid_config(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

// ========== order_total_price ==========

/// Compares the items subtotal against a fixed amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotalPrice {
    pub operator: ComparisonOperator,
    pub amount: Price,
}

impl OrderTotalPrice {
    pub fn new(operator: ComparisonOperator, amount: Price) -> PricingResult<Self> {
        let condition = Self { operator, amount };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderTotalPrice {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        if self.amount.is_negative() {
            return Err(PricingError::invalid_config(format!(
                "order_total_price amount must not be negative, got {}",
                self.amount
            )));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        // A threshold in another currency never matches
        if order.currency_code() != self.amount.currency_code() {
            return Ok(false);
        }
        let subtotal = order.subtotal()?;
        Ok(self.operator.holds(subtotal.compare(&self.amount)?))
    }
}

// ========== order_total_items ==========

/// Compares the summed item quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTotalItems {
    pub operator: ComparisonOperator,
    pub quantity: Decimal,
}

impl OrderTotalItems {
    pub fn new(operator: ComparisonOperator, quantity: Decimal) -> PricingResult<Self> {
        let condition = Self { operator, quantity };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderTotalItems {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        if self.quantity.is_sign_negative() && !self.quantity.is_zero() {
            return Err(PricingError::invalid_config(
                "order_total_items quantity must not be negative",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        Ok(self
            .operator
            .holds(order.total_quantity().cmp(&self.quantity)))
    }
}

// ========== order_currency ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCurrency {
    pub currencies: BTreeSet<String>,
}

impl OrderCurrency {
    pub fn new(currencies: BTreeSet<String>) -> PricingResult<Self> {
        let condition = Self { currencies };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderCurrency {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        non_empty(&self.currencies, "order_currency currencies")?;
        for code in &self.currencies {
            Price::zero(code)?;
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        Ok(self.currencies.contains(order.currency_code()))
    }
}

// ========== customer_role ==========

/// Passes when the customer holds any of the roles
///
/// Without a customer only [`ANONYMOUS_ROLE`] is held; a known customer also
/// holds [`AUTHENTICATED_ROLE`] on top of its own roles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRole {
    pub roles: Vec<String>,
}

impl CustomerRole {
    pub fn new(roles: Vec<String>) -> PricingResult<Self> {
        let condition = Self { roles };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for CustomerRole {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        if self.roles.is_empty() {
            return Err(PricingError::invalid_config(
                "customer_role roles must not be empty",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool> {
        target.as_order()?;
        let held = |role: &str| match &ctx.customer {
            None => role == ANONYMOUS_ROLE,
            Some(customer) => role == AUTHENTICATED_ROLE || customer.has_role(role),
        };
        Ok(self.roles.iter().any(|r| held(r.as_str())))
    }
}

// ========== order_email ==========

/// Customer email equals the configured address (case-insensitive)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEmail {
    pub mail: String,
}

impl OrderEmail {
    pub fn new(mail: impl Into<String>) -> PricingResult<Self> {
        let condition = Self { mail: mail.into() };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderEmail {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        if !self.mail.contains('@') {
            return Err(PricingError::invalid_config(format!(
                "order_email mail '{}' is not an email address",
                self.mail
            )));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool> {
        target.as_order()?;
        Ok(ctx
            .customer
            .as_ref()
            .and_then(|c| c.email.as_deref())
            .is_some_and(|email| email.trim().eq_ignore_ascii_case(self.mail.trim())))
    }
}

// ========== order_store ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStore {
    pub store_ids: BTreeSet<i64>,
}

impl OrderStore {
    pub fn new(store_ids: BTreeSet<i64>) -> PricingResult<Self> {
        let condition = Self { store_ids };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderStore {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        non_empty(&self.store_ids, "order_store store_ids")
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        Ok(self.store_ids.contains(&order.store_id()))
    }
}

// ========== order_type ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderType {
    pub type_ids: BTreeSet<String>,
}

impl OrderType {
    pub fn new(type_ids: BTreeSet<String>) -> PricingResult<Self> {
        let condition = Self { type_ids };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderType {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        non_empty(&self.type_ids, "order_type type_ids")
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        Ok(self.type_ids.contains(order.type_id()))
    }
}

// ========== order_product ==========

/// Order contains at least one of the products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderProduct {
    pub product_ids: BTreeSet<i64>,
}

impl OrderProduct {
    pub fn new(product_ids: BTreeSet<i64>) -> PricingResult<Self> {
        let condition = Self { product_ids };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderProduct {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        non_empty(&self.product_ids, "order_product product_ids")
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        Ok(order
            .items()
            .iter()
            .any(|item| self.product_ids.contains(&item.purchased_entity.product_id)))
    }
}

// ========== order_billing_address ==========

/// Billing address lies in the zone
///
/// Uses the address resolved into the context, falling back to the one stored
/// on the order. No address at all never matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBillingAddress {
    pub zone: Zone,
}

impl OrderBillingAddress {
    pub fn new(zone: Zone) -> PricingResult<Self> {
        let condition = Self { zone };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderBillingAddress {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::Order
    }

    fn validate(&self) -> PricingResult<()> {
        self.zone.validate()
    }

    fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool> {
        let order = target.as_order()?;
        let address = ctx.address.as_ref().or(order.billing_address());
        Ok(address.is_some_and(|a| self.zone.matches(a)))
    }
}
