//! Helpers shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use pricing_engine::repository::{
    InMemoryCouponRepository, InMemoryPromotionRepository, InMemoryTaxTypeRepository, InMemoryUsageTracker,
};
use pricing_engine::{
    EngineConfig, EvaluationContext, Offer, OrderRefresher, Promotion, Repositories, TaxRate, TaxType, Zone,
    ZoneTerritory,
};
use rust_decimal::Decimal;
use shared::{Coupon, Order, OrderItem, Price, PurchasedEntity};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

pub fn ctx() -> EvaluationContext {
    EvaluationContext::new(now())
}

pub fn usd(value: &str) -> Price {
    Price::parse(value, "USD").unwrap()
}

pub fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

/// Order 1 in store 1, one item per `(product_id, quantity, unit_price)`
pub fn order_with(items: &[(i64, i64, &str)]) -> Order {
    numbered_order(1, items)
}

pub fn numbered_order(order_id: i64, items: &[(i64, i64, &str)]) -> Order {
    let mut order = Order::new(order_id, "default", 1, "USD").unwrap();
    for (index, (product_id, quantity, price)) in items.iter().enumerate() {
        order
            .add_item(OrderItem::new(
                index as i64 + 1,
                PurchasedEntity::product(*product_id),
                Decimal::from(*quantity),
                usd(price),
            ))
            .unwrap();
    }
    order
}

/// Unconditional order-level percentage promotion, active since yesterday
pub fn percentage_promotion(id: i64, rate: &str) -> Promotion {
    Promotion::new(
        id,
        format!("Promo {}", id),
        Offer::order_percentage(dec(rate)).unwrap(),
        now() - Duration::days(1),
    )
}

pub fn us_tax(id: i64, rates: &[&str], compound: bool) -> TaxType {
    let rates = rates
        .iter()
        .enumerate()
        .map(|(i, p)| TaxRate::new(format!("Rate {}", i + 1), dec(p), format!("r{}", i + 1)))
        .collect();
    let tax_type = TaxType::new(id, format!("US tax {}", id), Zone::new(vec![ZoneTerritory::country("US")]).unwrap(), rates)
        .unwrap();
    if compound { tax_type.compound() } else { tax_type }
}

pub struct Engine {
    pub refresher: OrderRefresher,
    pub usage: Arc<InMemoryUsageTracker>,
    pub repositories: Repositories,
}

pub fn engine(promotions: Vec<Promotion>, coupons: Vec<Coupon>, tax_types: Vec<TaxType>) -> Engine {
    let usage = Arc::new(InMemoryUsageTracker::new());
    let repositories = Repositories {
        promotions: Arc::new(promotions.into_iter().collect::<InMemoryPromotionRepository>()),
        coupons: Arc::new(coupons.into_iter().collect::<InMemoryCouponRepository>()),
        usage: usage.clone(),
        tax_types: Arc::new(tax_types.into_iter().collect::<InMemoryTaxTypeRepository>()),
        ..Repositories::default()
    };
    Engine {
        refresher: OrderRefresher::new(EngineConfig::default(), repositories.clone()),
        usage,
        repositories,
    }
}
