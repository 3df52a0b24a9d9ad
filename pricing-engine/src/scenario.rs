//! Scenario files
//!
//! A scenario is everything one refresh needs, as a single JSON document:
//! the order, the moment it is priced at, the customer, and the records the
//! collaborators would normally load (promotions, coupons, tax types,
//! currency precisions, usage counters). The `price-order` binary runs one.
//!
//! Promotions and tax types are validated one record at a time: a malformed
//! record is logged and reported in [`Scenario::skipped`], the rest still load.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::{Coupon, Customer, Order, PricingError};
use thiserror::Error;
use tracing::warn;

use crate::adjustments::OrderTotalSummary;
use crate::availability::{AvailabilityManager, DiscontinuedProductChecker, QuantityLimitChecker};
use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use crate::promotions::{CouponError, CouponRedeemer, Promotion};
use crate::refresh::{OrderRefresher, RefreshReport};
use crate::repository::{
    InMemoryCouponRepository, InMemoryCurrencyRepository, InMemoryPromotionRepository,
    InMemoryTaxTypeRepository, InMemoryUsageTracker, Repositories,
};
use crate::tax::TaxType;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// A stored usage count
#[derive(Debug, Clone, Deserialize)]
pub struct UsageEntry {
    pub promotion_id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
    pub count: u64,
}

/// Availability checkers to register, generic first
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvailabilitySettings {
    #[serde(default)]
    pub max_quantity: Option<Decimal>,
    #[serde(default)]
    pub discontinued_products: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Promotion,
    TaxType,
}

/// A stored record left out because it failed validation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedRecord {
    pub kind: RecordKind,
    pub id: Option<i64>,
    pub error: String,
}

/// File shape; promotions and tax types stay raw until validated
#[derive(Deserialize)]
struct ScenarioRecord {
    now: DateTime<Utc>,
    order: Order,
    #[serde(default)]
    customer: Option<Customer>,
    #[serde(default)]
    coupon_codes: Vec<String>,
    #[serde(default)]
    promotions: Vec<Value>,
    #[serde(default)]
    coupons: Vec<Coupon>,
    #[serde(default)]
    tax_types: Vec<Value>,
    #[serde(default)]
    currencies: BTreeMap<String, u32>,
    #[serde(default)]
    usage: Vec<UsageEntry>,
    #[serde(default)]
    availability: AvailabilitySettings,
}

#[derive(Debug, Clone)]
pub struct Scenario {
    pub now: DateTime<Utc>,
    pub order: Order,
    pub customer: Option<Customer>,
    /// Codes redeemed before the refresh
    pub coupon_codes: Vec<String>,
    pub promotions: Vec<Promotion>,
    pub coupons: Vec<Coupon>,
    pub tax_types: Vec<TaxType>,
    /// Fraction digits on top of the built-in currency table
    pub currencies: BTreeMap<String, u32>,
    pub usage: Vec<UsageEntry>,
    pub availability: AvailabilitySettings,
    pub skipped: Vec<SkippedRecord>,
}

fn load_records<T: DeserializeOwned>(kind: RecordKind, values: Vec<Value>, skipped: &mut Vec<SkippedRecord>) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").and_then(Value::as_i64);
            match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(error) => {
                    warn!(kind = ?kind, id = ?id, error = %error, "Skipping invalid record");
                    skipped.push(SkippedRecord {
                        kind,
                        id,
                        error: error.to_string(),
                    });
                    None
                }
            }
        })
        .collect()
}

impl From<ScenarioRecord> for Scenario {
    fn from(record: ScenarioRecord) -> Self {
        let mut skipped = Vec::new();
        let promotions = load_records(RecordKind::Promotion, record.promotions, &mut skipped);
        let tax_types = load_records(RecordKind::TaxType, record.tax_types, &mut skipped);
        Self {
            now: record.now,
            order: record.order,
            customer: record.customer,
            coupon_codes: record.coupon_codes,
            promotions,
            coupons: record.coupons,
            tax_types,
            currencies: record.currencies,
            usage: record.usage,
            availability: record.availability,
            skipped,
        }
    }
}

/// A coupon code that could not be redeemed
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedCoupon {
    pub code: String,
    pub error: CouponError,
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub order: Order,
    pub report: RefreshReport,
    pub summary: OrderTotalSummary,
    pub rejected_coupons: Vec<RejectedCoupon>,
    pub skipped: Vec<SkippedRecord>,
}

impl Scenario {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ScenarioError> {
        let record: ScenarioRecord = serde_json::from_str(raw)?;
        Ok(record.into())
    }

    pub fn context(&self) -> EvaluationContext {
        let ctx = EvaluationContext::new(self.now);
        match &self.customer {
            Some(customer) => ctx.with_customer(customer.clone()),
            None => ctx,
        }
    }

    /// In-memory collaborators holding the scenario's records
    pub fn repositories(&self) -> Repositories {
        let usage = InMemoryUsageTracker::new();
        for entry in &self.usage {
            usage.set_usage(entry.promotion_id, entry.customer_id, entry.count);
        }
        let currencies = InMemoryCurrencyRepository::with_defaults();
        for (code, digits) in &self.currencies {
            currencies.insert(code.clone(), *digits);
        }

        Repositories {
            promotions: Arc::new(self.promotions.iter().cloned().collect::<InMemoryPromotionRepository>()),
            coupons: Arc::new(self.coupons.iter().cloned().collect::<InMemoryCouponRepository>()),
            usage: Arc::new(usage),
            tax_types: Arc::new(self.tax_types.iter().cloned().collect::<InMemoryTaxTypeRepository>()),
            currencies: Arc::new(currencies),
            ..Repositories::default()
        }
    }

    pub fn availability(&self) -> AvailabilityManager {
        let mut manager = AvailabilityManager::new();
        if let Some(max) = self.availability.max_quantity {
            manager.register(QuantityLimitChecker::new(max));
        }
        if !self.availability.discontinued_products.is_empty() {
            manager.register(DiscontinuedProductChecker::new(
                self.availability.discontinued_products.iter().copied(),
            ));
        }
        manager
    }

    /// Redeem the coupon codes, then refresh the order
    ///
    /// A code that cannot be redeemed is reported, not fatal.
    pub fn run(self, config: EngineConfig) -> Result<ScenarioOutcome, ScenarioError> {
        let ctx = self.context();
        let repositories = self.repositories();
        let refresher = OrderRefresher::new(config, repositories.clone()).with_availability(self.availability());
        let redeemer = CouponRedeemer::new(&repositories);

        let mut order = self.order;
        let mut rejected_coupons = Vec::new();
        for code in &self.coupon_codes {
            if let Err(error) = redeemer.redeem(&mut order, code, &ctx) {
                warn!(code = %code, error = %error, "Coupon rejected");
                rejected_coupons.push(RejectedCoupon {
                    code: code.clone(),
                    error,
                });
            }
        }

        let report = refresher.refresh(&mut order, &ctx)?;
        let summary = OrderTotalSummary::from_order(&order)?;
        Ok(ScenarioOutcome {
            order,
            report,
            summary,
            rejected_coupons,
            skipped: self.skipped,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SCENARIO: &str = r#"{
        "now": "2024-06-01T12:00:00Z",
        "order": {
            "id": 42,
            "type_id": "default",
            "store_id": 1,
            "currency_code": "USD",
            "items": [
                {
                    "id": 1,
                    "quantity": "2",
                    "unit_price": {"number": "10.00", "currency_code": "USD"},
                    "purchased_entity": {"product_id": 101}
                }
            ]
        },
        "coupon_codes": ["WELCOME", "BOGUS"],
        "promotions": [
            {
                "id": 1,
                "name": "Welcome",
                "offer": {"target": "order", "spec": {"type": "percentage_off", "rate": "0.1"}},
                "start_date": "2024-01-01T00:00:00Z",
                "requires_coupon": true
            }
        ],
        "coupons": [
            {"id": 9, "code": "WELCOME", "promotion_id": 1, "enabled": true}
        ]
    }"#;

    #[test]
    fn test_run_redeems_and_refreshes() {
        let outcome = Scenario::parse(SCENARIO)
            .unwrap()
            .run(EngineConfig::default())
            .unwrap();

        assert_eq!(outcome.rejected_coupons.len(), 1);
        assert_eq!(outcome.rejected_coupons[0].code, "BOGUS");
        assert_eq!(outcome.report.applied_promotions, vec![1]);
        assert_eq!(
            outcome.order.adjustments()[0].source_id(),
            Some("promotion:1/coupon:9")
        );
        assert_eq!(outcome.summary.total.number(), Decimal::new(1800, 2));
    }

    #[test]
    fn test_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SCENARIO.as_bytes()).unwrap();
        let scenario = Scenario::from_path(file.path()).unwrap();
        assert_eq!(scenario.order.id(), 42);
        assert_eq!(scenario.promotions.len(), 1);

        assert!(matches!(
            Scenario::from_path(file.path().with_extension("missing")),
            Err(ScenarioError::Io(_))
        ));
    }

    #[test]
    fn test_invalid_records_are_skipped() {
        let broken = r#"{
            "now": "2024-06-01T12:00:00Z",
            "order": {
                "id": 43,
                "type_id": "default",
                "store_id": 1,
                "currency_code": "USD",
                "billing_address": {"country_code": "US"},
                "items": [
                    {
                        "id": 1,
                        "quantity": "1",
                        "unit_price": {"number": "100.00", "currency_code": "USD"},
                        "purchased_entity": {"product_id": 101}
                    }
                ]
            },
            "promotions": [
                {
                    "id": 1,
                    "name": "Ten off",
                    "offer": {"target": "order", "spec": {"type": "percentage_off", "rate": "0.1"}},
                    "start_date": "2024-01-01T00:00:00Z"
                },
                {
                    "id": 2,
                    "name": "Too generous",
                    "offer": {"target": "order", "spec": {"type": "percentage_off", "rate": "1.5"}},
                    "start_date": "2024-01-01T00:00:00Z"
                }
            ],
            "tax_types": [
                {"id": 5, "name": "Broken", "zone": {"territories": []}, "rates": []}
            ]
        }"#;

        let scenario = Scenario::parse(broken).unwrap();
        assert_eq!(scenario.promotions.len(), 1);
        assert!(scenario.tax_types.is_empty());
        let skipped: Vec<_> = scenario.skipped.iter().map(|s| (s.kind, s.id)).collect();
        assert_eq!(
            skipped,
            vec![(RecordKind::Promotion, Some(2)), (RecordKind::TaxType, Some(5))]
        );
        assert!(scenario.skipped[0].error.contains("1.5"));

        let outcome = scenario.run(EngineConfig::default()).unwrap();
        assert_eq!(outcome.report.applied_promotions, vec![1]);
        assert_eq!(outcome.summary.total.number(), Decimal::new(9000, 2));
        assert_eq!(outcome.skipped.len(), 2);
    }

    #[test]
    fn test_malformed_order_is_a_parse_error() {
        let broken = SCENARIO.replace(r#""quantity": "2""#, r#""quantity": "0""#);
        assert!(matches!(Scenario::parse(&broken), Err(ScenarioError::Parse(_))));
    }
}
