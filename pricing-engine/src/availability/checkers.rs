//! Built-in availability checkers

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use shared::OrderItem;

use super::{Availability, AvailabilityChecker};
use crate::context::EvaluationContext;

/// Caps the quantity of a single line, optionally for a set of products only
#[derive(Debug, Clone)]
pub struct QuantityLimitChecker {
    max_quantity: Decimal,
    product_ids: Option<BTreeSet<i64>>,
}

impl QuantityLimitChecker {
    pub fn new(max_quantity: Decimal) -> Self {
        Self {
            max_quantity,
            product_ids: None,
        }
    }

    pub fn for_products(mut self, product_ids: impl IntoIterator<Item = i64>) -> Self {
        self.product_ids = Some(product_ids.into_iter().collect());
        self
    }
}

impl AvailabilityChecker for QuantityLimitChecker {
    fn applies(&self, item: &OrderItem) -> bool {
        self.product_ids
            .as_ref()
            .is_none_or(|ids| ids.contains(&item.purchased_entity.product_id))
    }

    fn check(&self, item: &OrderItem, _ctx: &EvaluationContext) -> Availability {
        if item.quantity > self.max_quantity {
            Availability::unavailable(format!(
                "quantity {} exceeds the limit of {}",
                item.quantity, self.max_quantity
            ))
        } else {
            Availability::Available
        }
    }
}

/// Rejects products that are no longer sold
#[derive(Debug, Clone, Default)]
pub struct DiscontinuedProductChecker {
    product_ids: BTreeSet<i64>,
}

impl DiscontinuedProductChecker {
    pub fn new(product_ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            product_ids: product_ids.into_iter().collect(),
        }
    }
}

impl AvailabilityChecker for DiscontinuedProductChecker {
    fn applies(&self, item: &OrderItem) -> bool {
        self.product_ids.contains(&item.purchased_entity.product_id)
    }

    fn check(&self, item: &OrderItem, _ctx: &EvaluationContext) -> Availability {
        Availability::unavailable(format!(
            "product {} is discontinued",
            item.purchased_entity.product_id
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::AvailabilityManager;
    use chrono::Utc;
    use shared::{Price, PurchasedEntity};

    fn item(product_id: i64, quantity: i64) -> OrderItem {
        OrderItem::new(
            1,
            PurchasedEntity::product(product_id),
            Decimal::from(quantity),
            Price::parse("1", "USD").unwrap(),
        )
    }

    #[test]
    fn test_quantity_limit() {
        let ctx = EvaluationContext::new(Utc::now());
        let checker = QuantityLimitChecker::new(Decimal::from(5));
        assert_eq!(checker.check(&item(1, 5), &ctx), Availability::Available);
        assert!(!checker.check(&item(1, 6), &ctx).is_available());

        let scoped = QuantityLimitChecker::new(Decimal::ONE).for_products([7]);
        assert!(scoped.applies(&item(7, 1)));
        assert!(!scoped.applies(&item(8, 1)));
    }

    #[test]
    fn test_discontinued() {
        let ctx = EvaluationContext::new(Utc::now());
        let checker = DiscontinuedProductChecker::new([3]);
        assert!(!checker.applies(&item(1, 1)));
        assert_eq!(
            checker.check(&item(3, 1), &ctx).reason(),
            Some("product 3 is discontinued")
        );
    }

    #[test]
    fn test_specific_checker_overrides_generic() {
        // Generic limit rejects, a later product-specific limit allows the line
        let ctx = EvaluationContext::new(Utc::now());
        let manager = AvailabilityManager::new()
            .with_checker(QuantityLimitChecker::new(Decimal::from(10)))
            .with_checker(QuantityLimitChecker::new(Decimal::from(50)).for_products([42]));
        assert!(manager.check(&item(42, 20), &ctx).is_available());
        assert!(!manager.check(&item(41, 20), &ctx).is_available());
    }
}
