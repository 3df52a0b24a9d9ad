//! Promotion Model

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{Order, OrderItem, PricingError, PricingResult, TargetEntityType};

use super::offer::Offer;
use crate::conditions::{ConditionEvaluator, ConditionGroup, ConditionOperator, Target};
use crate::context::EvaluationContext;

/// How a promotion combines with the others on the same order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    #[default]
    Any,
    /// Applies only to an order no promotion has applied to yet, and then
    /// blocks every promotion after it
    Exclusive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
    pub id: i64,
    pub name: String,
    /// Customer-facing label; `name` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Empty = every order type
    #[serde(default)]
    pub order_type_ids: BTreeSet<String>,
    /// Empty = every store
    #[serde(default)]
    pub store_ids: BTreeSet<i64>,
    #[serde(default)]
    pub conditions: ConditionGroup,
    pub offer: Offer,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// `None` or `Some(0)` = unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit_per_client: Option<u32>,
    #[serde(default)]
    pub current_usage: u32,
    #[serde(default)]
    pub requires_coupon: bool,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Application order, ascending; ties broken by id
    #[serde(default)]
    pub weight: i32,
    #[serde(default)]
    pub compatibility: Compatibility,
}

fn default_true() -> bool {
    true
}

fn limit(value: Option<u32>) -> Option<u64> {
    value.filter(|&l| l > 0).map(u64::from)
}

impl Promotion {
    pub fn new(id: i64, name: impl Into<String>, offer: Offer, start_date: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
            order_type_ids: BTreeSet::new(),
            store_ids: BTreeSet::new(),
            conditions: ConditionGroup::default(),
            offer,
            start_date,
            end_date: None,
            usage_limit: None,
            usage_limit_per_client: None,
            current_usage: 0,
            requires_coupon: false,
            enabled: true,
            weight: 0,
            compatibility: Compatibility::Any,
        }
    }

    pub fn with_conditions(mut self, conditions: ConditionGroup) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn with_end_date(mut self, end_date: DateTime<Utc>) -> Self {
        self.end_date = Some(end_date);
        self
    }

    pub fn with_coupon_required(mut self) -> Self {
        self.requires_coupon = true;
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_compatibility(mut self, compatibility: Compatibility) -> Self {
        self.compatibility = compatibility;
        self
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.name.trim().is_empty() {
            return Err(PricingError::invalid_config(format!(
                "promotion {} has an empty name",
                self.id
            )));
        }
        if let Some(end) = self.end_date
            && end <= self.start_date
        {
            return Err(PricingError::invalid_config(format!(
                "promotion {} ends before it starts",
                self.id
            )));
        }
        self.offer.validate()?;
        for condition in self.conditions.conditions() {
            condition.kind().validate()?;
        }
        Ok(())
    }

    /// Enabled and inside `[start_date, end_date)`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.start_date <= now && self.end_date.is_none_or(|end| now < end)
    }

    pub fn applies_to_order_type(&self, type_id: &str) -> bool {
        self.order_type_ids.is_empty() || self.order_type_ids.contains(type_id)
    }

    pub fn applies_to_store(&self, store_id: i64) -> bool {
        self.store_ids.is_empty() || self.store_ids.contains(&store_id)
    }

    pub fn is_exclusive(&self) -> bool {
        self.compatibility == Compatibility::Exclusive
    }

    /// Active and scoped to the order's type and store
    pub fn is_available_for(&self, order: &Order, now: DateTime<Utc>) -> bool {
        self.is_active_at(now)
            && self.applies_to_order_type(order.type_id())
            && self.applies_to_store(order.store_id())
    }

    /// Global limit, if any
    pub fn usage_limit(&self) -> Option<u64> {
        limit(self.usage_limit)
    }

    pub fn usage_limit_per_client(&self) -> Option<u64> {
        limit(self.usage_limit_per_client)
    }

    /// Run the conditions against the order.
    ///
    /// Order-level conditions are evaluated once against the order, item-level
    /// conditions once per item, both with the promotion's operator. Returns
    /// `None` when the promotion does not apply, otherwise the items an
    /// item-targeted offer should discount.
    pub fn evaluate_conditions<'o>(
        &self,
        order: &'o Order,
        ctx: &EvaluationContext,
    ) -> PricingResult<Option<Vec<&'o OrderItem>>> {
        let order_group = self.conditions.for_target(TargetEntityType::Order);
        let item_group = self.conditions.for_target(TargetEntityType::OrderItem);

        let order_passed = if order_group.is_empty() {
            None
        } else {
            Some(order_group.evaluate(&Target::Order(order), ctx)?)
        };

        let mut matching = Vec::new();
        if !item_group.is_empty() {
            for item in order.items() {
                if item_group.evaluate(&Target::OrderItem { order, item }, ctx)? {
                    matching.push(item);
                }
            }
        }
        let items_passed = (!item_group.is_empty()).then_some(!matching.is_empty());

        let applies = match self.conditions.operator() {
            ConditionOperator::And => order_passed.unwrap_or(true) && items_passed.unwrap_or(true),
            ConditionOperator::Or => match (order_passed, items_passed) {
                (None, None) => true,
                (order_passed, items_passed) => {
                    order_passed == Some(true) || items_passed == Some(true)
                }
            },
        };
        if !applies {
            return Ok(None);
        }

        if items_passed == Some(true) {
            Ok(Some(matching))
        } else {
            Ok(Some(order.items().iter().collect()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::test_support::*;
    use crate::conditions::{Condition, OrderTotalPrice, ProductEquals};
    use chrono::{Duration, TimeZone};
    use rust_decimal::Decimal;
    use shared::ComparisonOperator;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn promotion() -> Promotion {
        Promotion::new(1, "Ten off", Offer::order_percentage(Decimal::new(1, 1)).unwrap(), start())
    }

    fn total_over(amount: &str) -> Condition {
        Condition::new(
            OrderTotalPrice::new(ComparisonOperator::GreaterThan, usd(amount)).unwrap(),
            false,
        )
        .unwrap()
    }

    fn product(id: i64) -> Condition {
        Condition::new(ProductEquals::new([id].into_iter().collect()).unwrap(), false).unwrap()
    }

    #[test]
    fn test_half_open_window() {
        let end = start() + Duration::days(30);
        let promo = promotion().with_end_date(end);
        assert!(promo.is_active_at(start()));
        assert!(!promo.is_active_at(start() - Duration::seconds(1)));
        assert!(promo.is_active_at(end - Duration::seconds(1)));
        assert!(!promo.is_active_at(end));

        let mut disabled = promotion();
        disabled.enabled = false;
        assert!(!disabled.is_active_at(start()));
    }

    #[test]
    fn test_scope() {
        let mut promo = promotion();
        assert!(promo.applies_to_order_type("default"));
        assert!(promo.applies_to_store(9));
        promo.order_type_ids.insert("b2b".to_string());
        promo.store_ids.insert(2);
        assert!(!promo.applies_to_order_type("default"));
        assert!(promo.applies_to_order_type("b2b"));
        assert!(!promo.applies_to_store(9));
    }

    #[test]
    fn test_validate() {
        assert!(promotion().validate().is_ok());
        let mut bad = promotion();
        bad.name = " ".to_string();
        assert!(bad.validate().is_err());
        let bad = promotion().with_end_date(start());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_limits_treat_zero_as_unlimited() {
        let mut promo = promotion();
        promo.usage_limit = Some(0);
        promo.usage_limit_per_client = Some(3);
        assert_eq!(promo.usage_limit(), None);
        assert_eq!(promo.usage_limit_per_client(), Some(3));
    }

    #[test]
    fn test_label_falls_back_to_name() {
        let mut promo = promotion();
        assert_eq!(promo.label(), "Ten off");
        promo.display_name = Some("10% off everything".to_string());
        assert_eq!(promo.label(), "10% off everything");
    }

    #[test]
    fn test_no_conditions_targets_all_items() {
        let order = order_with(&[(101, 1, "1"), (102, 1, "1")]);
        let items = promotion().evaluate_conditions(&order, &ctx()).unwrap().unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_and_needs_order_and_item_parts() {
        let order = order_with(&[(101, 1, "10"), (102, 1, "10")]);
        let group = |conditions| ConditionGroup::new(ConditionOperator::And, conditions);

        let promo = promotion().with_conditions(group(vec![total_over("5"), product(102)]));
        let items = promo.evaluate_conditions(&order, &ctx()).unwrap().unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2]);

        let promo = promotion().with_conditions(group(vec![total_over("50"), product(102)]));
        assert!(promo.evaluate_conditions(&order, &ctx()).unwrap().is_none());

        let promo = promotion().with_conditions(group(vec![total_over("5"), product(999)]));
        assert!(promo.evaluate_conditions(&order, &ctx()).unwrap().is_none());
    }

    #[test]
    fn test_or_needs_either_part() {
        let order = order_with(&[(101, 1, "10"), (102, 1, "10")]);
        let group = |conditions| ConditionGroup::new(ConditionOperator::Or, conditions);

        // Order part fails, item part matches one line
        let promo = promotion().with_conditions(group(vec![total_over("50"), product(101)]));
        let items = promo.evaluate_conditions(&order, &ctx()).unwrap().unwrap();
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1]);

        // Order part passes, no item matches: offer targets every line
        let promo = promotion().with_conditions(group(vec![total_over("5"), product(999)]));
        let items = promo.evaluate_conditions(&order, &ctx()).unwrap().unwrap();
        assert_eq!(items.len(), 2);

        let promo = promotion().with_conditions(group(vec![total_over("50"), product(999)]));
        assert!(promo.evaluate_conditions(&order, &ctx()).unwrap().is_none());
    }
}
