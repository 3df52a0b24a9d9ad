//! In-memory collaborators
//!
//! DashMap-backed stores. Lookups return clones sorted by id so a refresh sees
//! the same candidate order on every run.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use shared::{Address, Coupon, Order};

use super::{
    AddressProvider, CouponRepository, CurrencyRepository, PromotionRepository, TaxTypeRepository,
    UsageTracker,
};
use crate::promotions::Promotion;
use crate::tax::TaxType;

fn sorted_by_id<T: Clone>(map: &DashMap<i64, T>) -> Vec<T> {
    let mut entries: Vec<(i64, T)> = map
        .iter()
        .map(|entry| (*entry.key(), entry.value().clone()))
        .collect();
    entries.sort_by_key(|(id, _)| *id);
    entries.into_iter().map(|(_, value)| value).collect()
}

// ========== Promotions ==========

#[derive(Debug, Default)]
pub struct InMemoryPromotionRepository {
    promotions: DashMap<i64, Promotion>,
}

impl InMemoryPromotionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id
    pub fn insert(&self, promotion: Promotion) {
        self.promotions.insert(promotion.id, promotion);
    }

    pub fn remove(&self, promotion_id: i64) -> Option<Promotion> {
        self.promotions.remove(&promotion_id).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }
}

impl FromIterator<Promotion> for InMemoryPromotionRepository {
    fn from_iter<I: IntoIterator<Item = Promotion>>(iter: I) -> Self {
        let repo = Self::new();
        iter.into_iter().for_each(|p| repo.insert(p));
        repo
    }
}

impl PromotionRepository for InMemoryPromotionRepository {
    fn find_applicable(&self, order_type_id: &str, store_id: i64, now: DateTime<Utc>) -> Vec<Promotion> {
        sorted_by_id(&self.promotions)
            .into_iter()
            .filter(|p| {
                p.is_active_at(now)
                    && p.applies_to_order_type(order_type_id)
                    && p.applies_to_store(store_id)
            })
            .collect()
    }

    fn find_by_id(&self, promotion_id: i64) -> Option<Promotion> {
        self.promotions.get(&promotion_id).map(|p| p.clone())
    }
}

// ========== Coupons ==========

#[derive(Debug, Default)]
pub struct InMemoryCouponRepository {
    coupons: DashMap<i64, Coupon>,
}

impl InMemoryCouponRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, coupon: Coupon) {
        self.coupons.insert(coupon.id, coupon);
    }
}

impl FromIterator<Coupon> for InMemoryCouponRepository {
    fn from_iter<I: IntoIterator<Item = Coupon>>(iter: I) -> Self {
        let repo = Self::new();
        iter.into_iter().for_each(|c| repo.insert(c));
        repo
    }
}

impl CouponRepository for InMemoryCouponRepository {
    /// Codes compare case-insensitively; the lowest id wins on duplicates
    fn find_by_code(&self, code: &str) -> Option<Coupon> {
        let code = code.trim();
        sorted_by_id(&self.coupons)
            .into_iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    fn find_by_id(&self, coupon_id: i64) -> Option<Coupon> {
        self.coupons.get(&coupon_id).map(|c| c.clone())
    }
}

// ========== Usage ==========

/// Usage counters
///
/// DashMap entries lock their shard while held, so an increment is atomic per
/// key across threads.
#[derive(Debug, Default)]
pub struct InMemoryUsageTracker {
    promotions: DashMap<(i64, Option<i64>), u64>,
    coupons: DashMap<i64, u64>,
}

impl InMemoryUsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a counter, e.g. with historical usage
    pub fn set_usage(&self, promotion_id: i64, customer_id: Option<i64>, count: u64) {
        self.promotions.insert((promotion_id, customer_id), count);
    }

    pub fn set_coupon_usage(&self, coupon_id: i64, count: u64) {
        self.coupons.insert(coupon_id, count);
    }
}

impl UsageTracker for InMemoryUsageTracker {
    fn get_usage(&self, promotion_id: i64, customer_id: Option<i64>) -> u64 {
        self.promotions
            .get(&(promotion_id, customer_id))
            .map(|v| *v)
            .unwrap_or(0)
    }

    /// Bumps the global counter, and the customer's one when known
    fn record_usage(&self, promotion_id: i64, customer_id: Option<i64>) {
        *self.promotions.entry((promotion_id, None)).or_insert(0) += 1;
        if customer_id.is_some() {
            *self.promotions.entry((promotion_id, customer_id)).or_insert(0) += 1;
        }
    }

    fn get_coupon_usage(&self, coupon_id: i64) -> u64 {
        self.coupons.get(&coupon_id).map(|v| *v).unwrap_or(0)
    }

    fn record_coupon_usage(&self, coupon_id: i64) {
        *self.coupons.entry(coupon_id).or_insert(0) += 1;
    }
}

// ========== Tax types ==========

#[derive(Debug, Default)]
pub struct InMemoryTaxTypeRepository {
    tax_types: DashMap<i64, TaxType>,
}

impl InMemoryTaxTypeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tax_type: TaxType) {
        self.tax_types.insert(tax_type.id, tax_type);
    }
}

impl FromIterator<TaxType> for InMemoryTaxTypeRepository {
    fn from_iter<I: IntoIterator<Item = TaxType>>(iter: I) -> Self {
        let repo = Self::new();
        iter.into_iter().for_each(|t| repo.insert(t));
        repo
    }
}

impl TaxTypeRepository for InMemoryTaxTypeRepository {
    fn load_enabled(&self) -> Vec<TaxType> {
        sorted_by_id(&self.tax_types)
            .into_iter()
            .filter(|t| t.enabled)
            .collect()
    }
}

// ========== Currencies ==========

#[derive(Debug, Default)]
pub struct InMemoryCurrencyRepository {
    fraction_digits: DashMap<String, u32>,
}

impl InMemoryCurrencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handful of common currencies
    pub fn with_defaults() -> Self {
        let repo = Self::new();
        for (code, digits) in [
            ("USD", 2),
            ("EUR", 2),
            ("GBP", 2),
            ("CAD", 2),
            ("AUD", 2),
            ("CNY", 2),
            ("CHF", 2),
            ("JPY", 0),
            ("KRW", 0),
            ("KWD", 3),
            ("BHD", 3),
        ] {
            repo.insert(code, digits);
        }
        repo
    }

    pub fn insert(&self, currency_code: impl Into<String>, fraction_digits: u32) {
        self.fraction_digits.insert(currency_code.into(), fraction_digits);
    }
}

impl CurrencyRepository for InMemoryCurrencyRepository {
    fn fraction_digits(&self, currency_code: &str) -> Option<u32> {
        self.fraction_digits.get(currency_code).map(|d| *d)
    }
}

// ========== Addresses ==========

/// Reads the billing address stored on the order
#[derive(Debug, Clone, Copy, Default)]
pub struct OrderAddressProvider;

impl AddressProvider for OrderAddressProvider {
    fn billing_address(&self, order: &Order) -> Option<Address> {
        order.billing_address().cloned()
    }
}
