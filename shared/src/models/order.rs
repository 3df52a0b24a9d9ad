//! Order Model
//!
//! The order is owned by the persistence layer; the pricing engine reads it and
//! replaces its computed adjustments during a refresh. Every mutation that can
//! change pricing moves the order back to `Dirty`.

use std::collections::BTreeSet;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::adjustment::Adjustment;
use super::price::Price;
use crate::error::{PricingError, PricingResult};

/// Entity kind a condition or offer operates on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEntityType {
    #[default]
    Order,
    OrderItem,
}

impl fmt::Display for TargetEntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetEntityType::Order => f.write_str("order"),
            TargetEntityType::OrderItem => f.write_str("order_item"),
        }
    }
}

/// Refresh lifecycle: `Dirty → Refreshing → Clean`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    #[default]
    Dirty,
    Refreshing,
    Clean,
}

/// Catalog reference of the thing being bought
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PurchasedEntity {
    pub product_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<i64>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl PurchasedEntity {
    pub fn product(product_id: i64) -> Self {
        Self {
            product_id,
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: i64,
    pub quantity: Decimal,
    pub unit_price: Price,
    pub purchased_entity: PurchasedEntity,
    /// Set by refresh when the availability chain rejects the item
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_issue: Option<String>,
}

impl OrderItem {
    pub fn new(
        id: i64,
        purchased_entity: PurchasedEntity,
        quantity: Decimal,
        unit_price: Price,
    ) -> Self {
        Self {
            id,
            quantity,
            unit_price,
            purchased_entity,
            availability_issue: None,
        }
    }

    /// `unit_price * quantity` at full precision
    pub fn total_price(&self) -> PricingResult<Price> {
        self.unit_price.multiply(self.quantity)
    }
}

/// Storage shape of an order; items go back through `add_item`
#[derive(Deserialize)]
struct OrderRecord {
    id: i64,
    type_id: String,
    store_id: i64,
    currency_code: String,
    #[serde(default)]
    items: Vec<OrderItem>,
    #[serde(default)]
    adjustments: Vec<Adjustment>,
    #[serde(default)]
    billing_address: Option<Address>,
    #[serde(default)]
    coupons: BTreeSet<i64>,
    #[serde(default)]
    total: Option<Price>,
    #[serde(default)]
    state: OrderState,
}

impl TryFrom<OrderRecord> for Order {
    type Error = PricingError;

    fn try_from(record: OrderRecord) -> Result<Self, Self::Error> {
        let mut order = Order::new(record.id, record.type_id, record.store_id, &record.currency_code)?;
        for item in record.items {
            order.add_item(item)?;
        }
        let amounts = record
            .adjustments
            .iter()
            .map(Adjustment::amount)
            .chain(record.total.as_ref());
        for amount in amounts {
            if amount.currency_code() != order.currency_code {
                return Err(PricingError::currency_mismatch(
                    &order.currency_code,
                    amount.currency_code(),
                ));
            }
        }
        order.adjustments = record.adjustments;
        order.billing_address = record.billing_address;
        order.coupons = record.coupons;
        order.total = record.total;
        order.state = record.state;
        Ok(order)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OrderRecord")]
pub struct Order {
    id: i64,
    type_id: String,
    store_id: i64,
    currency_code: String,
    #[serde(default)]
    items: Vec<OrderItem>,
    #[serde(default)]
    adjustments: Vec<Adjustment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    billing_address: Option<Address>,
    #[serde(default)]
    coupons: BTreeSet<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total: Option<Price>,
    #[serde(default)]
    state: OrderState,
}

impl Order {
    pub fn new(
        id: i64,
        type_id: impl Into<String>,
        store_id: i64,
        currency_code: &str,
    ) -> PricingResult<Self> {
        // Validates the currency code
        Price::zero(currency_code)?;
        Ok(Self {
            id,
            type_id: type_id.into(),
            store_id,
            currency_code: currency_code.to_string(),
            items: Vec::new(),
            adjustments: Vec::new(),
            billing_address: None,
            coupons: BTreeSet::new(),
            total: None,
            state: OrderState::Dirty,
        })
    }

    // ========== Accessors ==========

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn store_id(&self) -> i64 {
        self.store_id
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.items
    }

    pub fn item(&self, item_id: i64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn adjustments(&self) -> &[Adjustment] {
        &self.adjustments
    }

    pub fn billing_address(&self) -> Option<&Address> {
        self.billing_address.as_ref()
    }

    pub fn coupons(&self) -> &BTreeSet<i64> {
        &self.coupons
    }

    /// Total as of the last refresh
    pub fn total(&self) -> Option<&Price> {
        self.total.as_ref()
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn needs_refresh(&self) -> bool {
        self.state != OrderState::Clean
    }

    /// Sum of `unit_price * quantity` over all items, unrounded
    pub fn subtotal(&self) -> PricingResult<Price> {
        self.items
            .iter()
            .try_fold(Price::zero(&self.currency_code)?, |acc, item| {
                acc.add(&item.total_price()?)
            })
    }

    /// Sum of item quantities
    pub fn total_quantity(&self) -> Decimal {
        self.items.iter().map(|i| i.quantity).sum()
    }

    // ========== Mutators (mark dirty) ==========

    fn mark_dirty(&mut self) {
        self.state = OrderState::Dirty;
    }

    pub fn add_item(&mut self, item: OrderItem) -> PricingResult<()> {
        if item.unit_price.currency_code() != self.currency_code {
            return Err(PricingError::currency_mismatch(
                &self.currency_code,
                item.unit_price.currency_code(),
            ));
        }
        if item.quantity <= Decimal::ZERO {
            return Err(PricingError::invalid_config(format!(
                "item quantity must be positive, got {}",
                item.quantity
            )));
        }
        if self.item(item.id).is_some() {
            return Err(PricingError::invalid_config(format!(
                "duplicate order item id {}",
                item.id
            )));
        }
        self.items.push(item);
        self.mark_dirty();
        Ok(())
    }

    pub fn remove_item(&mut self, item_id: i64) -> Option<OrderItem> {
        let index = self.items.iter().position(|i| i.id == item_id)?;
        self.mark_dirty();
        Some(self.items.remove(index))
    }

    /// Returns `false` when no item has that id
    pub fn set_item_quantity(&mut self, item_id: i64, quantity: Decimal) -> PricingResult<bool> {
        if quantity <= Decimal::ZERO {
            return Err(PricingError::invalid_config(format!(
                "item quantity must be positive, got {}",
                quantity
            )));
        }
        let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) else {
            return Ok(false);
        };
        item.quantity = quantity;
        self.mark_dirty();
        Ok(true)
    }

    pub fn set_billing_address(&mut self, address: Option<Address>) {
        self.billing_address = address;
        self.mark_dirty();
    }

    /// Returns `false` when the coupon was already on the order
    pub fn apply_coupon(&mut self, coupon_id: i64) -> bool {
        let inserted = self.coupons.insert(coupon_id);
        if inserted {
            self.mark_dirty();
        }
        inserted
    }

    pub fn remove_coupon(&mut self, coupon_id: i64) -> bool {
        let removed = self.coupons.remove(&coupon_id);
        if removed {
            self.mark_dirty();
        }
        removed
    }

    /// Add a manual adjustment; it is stored locked so refresh keeps it
    pub fn add_manual_adjustment(&mut self, adjustment: Adjustment) -> PricingResult<()> {
        if adjustment.amount().currency_code() != self.currency_code {
            return Err(PricingError::currency_mismatch(
                &self.currency_code,
                adjustment.amount().currency_code(),
            ));
        }
        self.adjustments.push(adjustment.with_locked(true));
        self.mark_dirty();
        Ok(())
    }

    // ========== Refresh hooks ==========

    pub fn begin_refresh(&mut self) {
        self.state = OrderState::Refreshing;
    }

    /// Refresh failed; computed state is left untouched
    pub fn abort_refresh(&mut self) {
        self.state = OrderState::Dirty;
    }

    pub fn complete_refresh(&mut self, adjustments: Vec<Adjustment>, total: Price) {
        self.adjustments = adjustments;
        self.total = Some(total);
        self.state = OrderState::Clean;
    }

    /// Record the availability verdict for an item without dirtying the order
    pub fn set_item_availability_issue(&mut self, item_id: i64, issue: Option<String>) {
        if let Some(item) = self.items.iter_mut().find(|i| i.id == item_id) {
            item.availability_issue = issue;
        }
    }
}
