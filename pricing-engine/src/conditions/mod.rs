//! Conditions
//!
//! Boolean predicates evaluated against an order or an order item. The variant
//! set is closed: `ConditionKind` dispatches to each configuration struct via
//! `enum_dispatch`, and every struct validates itself when constructed or
//! deserialized.
//!
//! Storage shape of a condition:
//!
//! ```text
//! { "plugin": "order_total_price",
//!   "configuration": { "operator": ">=", "amount": { "number": "50", "currency_code": "USD" } },
//!   "negate": false }
//! ```

mod group;
mod order;
mod order_item;

pub use group::{ConditionGroup, ConditionOperator};
pub use order::*;
pub use order_item::*;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};
use shared::{Order, OrderItem, PricingError, PricingResult, TargetEntityType};

use crate::context::EvaluationContext;

/// What a condition is evaluated against
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    Order(&'a Order),
    /// An item together with the order that holds it
    OrderItem {
        order: &'a Order,
        item: &'a OrderItem,
    },
}

impl<'a> Target<'a> {
    pub fn entity_type(&self) -> TargetEntityType {
        match self {
            Target::Order(_) => TargetEntityType::Order,
            Target::OrderItem { .. } => TargetEntityType::OrderItem,
        }
    }

    /// The order, or `UnsupportedTarget` when this is an item target
    pub fn as_order(&self) -> PricingResult<&'a Order> {
        match self {
            Target::Order(order) => Ok(order),
            Target::OrderItem { .. } => Err(self.unsupported(TargetEntityType::Order)),
        }
    }

    /// The item, or `UnsupportedTarget` when this is an order target
    pub fn as_order_item(&self) -> PricingResult<&'a OrderItem> {
        match self {
            Target::OrderItem { item, .. } => Ok(item),
            Target::Order(_) => Err(self.unsupported(TargetEntityType::OrderItem)),
        }
    }

    fn unsupported(&self, expected: TargetEntityType) -> PricingError {
        PricingError::UnsupportedTarget {
            expected,
            actual: self.entity_type(),
        }
    }
}

/// Behavior shared by every condition variant
#[enum_dispatch]
pub trait ConditionEvaluator {
    /// Entity kind this condition accepts
    fn target_entity_type(&self) -> TargetEntityType;

    /// Check the configuration; called on construction and deserialization
    fn validate(&self) -> PricingResult<()>;

    /// Raw result, before negation. Pure: no side effects.
    fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool>;
}

#[enum_dispatch(ConditionEvaluator)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "plugin", content = "configuration", rename_all = "snake_case")]
pub enum ConditionKind {
    OrderTotalPrice(OrderTotalPrice),
    OrderTotalItems(OrderTotalItems),
    OrderCurrency(OrderCurrency),
    CustomerRole(CustomerRole),
    OrderEmail(OrderEmail),
    OrderStore(OrderStore),
    OrderType(OrderType),
    OrderProduct(OrderProduct),
    OrderBillingAddress(OrderBillingAddress),
    OrderItemQuantity(OrderItemQuantity),
    ProductEquals(ProductEquals),
    OrderItemProductCategory(OrderItemProductCategory),
}

#[derive(Deserialize)]
struct ConditionRecord {
    #[serde(flatten)]
    kind: ConditionKind,
    #[serde(default)]
    negate: bool,
}

impl TryFrom<ConditionRecord> for Condition {
    type Error = PricingError;

    fn try_from(record: ConditionRecord) -> Result<Self, Self::Error> {
        Condition::new(record.kind, record.negate)
    }
}

/// A configured leaf predicate with its negation flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionRecord")]
pub struct Condition {
    #[serde(flatten)]
    kind: ConditionKind,
    negate: bool,
}

impl Condition {
    pub fn new(kind: impl Into<ConditionKind>, negate: bool) -> PricingResult<Self> {
        let kind = kind.into();
        kind.validate()?;
        Ok(Self { kind, negate })
    }

    pub fn kind(&self) -> &ConditionKind {
        &self.kind
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    pub fn target_entity_type(&self) -> TargetEntityType {
        self.kind.target_entity_type()
    }

    /// Final leaf result: the raw result flipped when `negate` is set
    pub fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool> {
        let result = self.kind.evaluate(target, ctx)?;
        Ok(result != self.negate)
    }
}
