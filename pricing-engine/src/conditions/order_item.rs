//! Order-item-level conditions

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{ComparisonOperator, PricingError, PricingResult, TargetEntityType};

use super::{ConditionEvaluator, Target};
use crate::context::EvaluationContext;

/// Compares the item quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemQuantity {
    pub operator: ComparisonOperator,
    pub quantity: Decimal,
}

impl OrderItemQuantity {
    pub fn new(operator: ComparisonOperator, quantity: Decimal) -> PricingResult<Self> {
        let condition = Self { operator, quantity };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderItemQuantity {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::OrderItem
    }

    fn validate(&self) -> PricingResult<()> {
        if self.quantity < Decimal::ZERO {
            return Err(PricingError::invalid_config(
                "order_item_quantity quantity must not be negative",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let item = target.as_order_item()?;
        Ok(self.operator.holds(item.quantity.cmp(&self.quantity)))
    }
}

/// Item is one of the products
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductEquals {
    pub product_ids: BTreeSet<i64>,
}

impl ProductEquals {
    pub fn new(product_ids: BTreeSet<i64>) -> PricingResult<Self> {
        let condition = Self { product_ids };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for ProductEquals {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::OrderItem
    }

    fn validate(&self) -> PricingResult<()> {
        if self.product_ids.is_empty() {
            return Err(PricingError::invalid_config(
                "product_equals product_ids must not be empty",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let item = target.as_order_item()?;
        Ok(self.product_ids.contains(&item.purchased_entity.product_id))
    }
}

/// Item's product belongs to one of the categories; uncategorized items never match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItemProductCategory {
    pub category_ids: BTreeSet<i64>,
}

impl OrderItemProductCategory {
    pub fn new(category_ids: BTreeSet<i64>) -> PricingResult<Self> {
        let condition = Self { category_ids };
        condition.validate()?;
        Ok(condition)
    }
}

impl ConditionEvaluator for OrderItemProductCategory {
    fn target_entity_type(&self) -> TargetEntityType {
        TargetEntityType::OrderItem
    }

    fn validate(&self) -> PricingResult<()> {
        if self.category_ids.is_empty() {
            return Err(PricingError::invalid_config(
                "order_item_product_category category_ids must not be empty",
            ));
        }
        Ok(())
    }

    fn evaluate(&self, target: &Target<'_>, _ctx: &EvaluationContext) -> PricingResult<bool> {
        let item = target.as_order_item()?;
        Ok(item
            .purchased_entity
            .category_id
            .is_some_and(|id| self.category_ids.contains(&id)))
    }
}
