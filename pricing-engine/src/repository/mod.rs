//! Collaborator interfaces
//!
//! The engine never loads or stores records itself. Whatever persists orders,
//! promotions and coupons implements these traits; [`memory`] holds the
//! in-memory implementations used by the binary and the tests.
//!
//! Usage counters are the only shared mutable state. Implementations must
//! serialize writers so that two orders racing on the same promotion cannot
//! both pass its limit.

pub mod memory;

pub use memory::{
    InMemoryCouponRepository, InMemoryCurrencyRepository, InMemoryPromotionRepository,
    InMemoryTaxTypeRepository, InMemoryUsageTracker, OrderAddressProvider,
};

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::{Address, Coupon, Order};

use crate::promotions::Promotion;
use crate::tax::TaxType;

pub trait PromotionRepository: Send + Sync {
    /// Candidates for an order of `order_type_id` in `store_id` at `now`
    fn find_applicable(&self, order_type_id: &str, store_id: i64, now: DateTime<Utc>) -> Vec<Promotion>;

    fn find_by_id(&self, promotion_id: i64) -> Option<Promotion>;
}

pub trait CouponRepository: Send + Sync {
    fn find_by_code(&self, code: &str) -> Option<Coupon>;

    fn find_enabled_by_code(&self, code: &str) -> Option<Coupon> {
        self.find_by_code(code).filter(|c| c.enabled)
    }

    fn find_by_id(&self, coupon_id: i64) -> Option<Coupon>;
}

pub trait UsageTracker: Send + Sync {
    /// Completed orders that used the promotion; per customer when `customer_id` is set
    fn get_usage(&self, promotion_id: i64, customer_id: Option<i64>) -> u64;

    fn record_usage(&self, promotion_id: i64, customer_id: Option<i64>);

    fn get_coupon_usage(&self, coupon_id: i64) -> u64;

    fn record_coupon_usage(&self, coupon_id: i64);
}

pub trait AddressProvider: Send + Sync {
    fn billing_address(&self, order: &Order) -> Option<Address>;
}

pub trait CurrencyRepository: Send + Sync {
    /// Minor-unit digits, `None` for an unknown currency
    fn fraction_digits(&self, currency_code: &str) -> Option<u32>;
}

pub trait TaxTypeRepository: Send + Sync {
    fn load_enabled(&self) -> Vec<TaxType>;
}

/// The collaborators a refresh talks to
#[derive(Clone)]
pub struct Repositories {
    pub promotions: Arc<dyn PromotionRepository>,
    pub coupons: Arc<dyn CouponRepository>,
    pub usage: Arc<dyn UsageTracker>,
    pub tax_types: Arc<dyn TaxTypeRepository>,
    pub currencies: Arc<dyn CurrencyRepository>,
    pub addresses: Arc<dyn AddressProvider>,
}

impl Default for Repositories {
    /// Empty in-memory stores, the common currencies, addresses read off the order
    fn default() -> Self {
        Self {
            promotions: Arc::new(InMemoryPromotionRepository::new()),
            coupons: Arc::new(InMemoryCouponRepository::new()),
            usage: Arc::new(InMemoryUsageTracker::new()),
            tax_types: Arc::new(InMemoryTaxTypeRepository::new()),
            currencies: Arc::new(InMemoryCurrencyRepository::with_defaults()),
            addresses: Arc::new(OrderAddressProvider),
        }
    }
}
