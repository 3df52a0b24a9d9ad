//! Usage recording for completed orders

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashSet;
use shared::{Order, PricingError, PricingResult};
use tracing::{info, warn};

use crate::repository::UsageTracker;

/// Promotion and coupon ids carried by a `source_id`
///
/// `promotion:{id}` or `promotion:{id}/coupon:{coupon_id}`; anything else
/// (tax, manual adjustments) yields `None`.
pub fn parse_promotion_source(source_id: &str) -> Option<(i64, Option<i64>)> {
    let rest = source_id.strip_prefix("promotion:")?;
    match rest.split_once("/coupon:") {
        Some((promotion, coupon)) => Some((promotion.parse().ok()?, Some(coupon.parse().ok()?))),
        None => Some((rest.parse().ok()?, None)),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordedUsage {
    pub promotions: BTreeSet<i64>,
    pub coupons: BTreeSet<i64>,
}

/// Records usage at most once per order id
pub struct UsageRecorder {
    tracker: Arc<dyn UsageTracker>,
    recorded_orders: DashSet<i64>,
}

impl UsageRecorder {
    pub fn new(tracker: Arc<dyn UsageTracker>) -> Self {
        Self {
            tracker,
            recorded_orders: DashSet::new(),
        }
    }

    /// Ids referenced by the order's adjustments, each once
    pub fn collect(order: &Order) -> RecordedUsage {
        let mut usage = RecordedUsage::default();
        for (promotion_id, coupon_id) in order
            .adjustments()
            .iter()
            .filter_map(|a| a.source_id())
            .filter_map(parse_promotion_source)
        {
            usage.promotions.insert(promotion_id);
            usage.coupons.extend(coupon_id);
        }
        usage
    }

    /// Count one use of every promotion and coupon the order applied.
    ///
    /// The order must be freshly refreshed so its adjustments reflect what the
    /// customer was charged. A second call for the same order id records
    /// nothing and returns an empty [`RecordedUsage`].
    pub fn record_completed_order(&self, order: &Order, customer_id: Option<i64>) -> PricingResult<RecordedUsage> {
        if order.needs_refresh() {
            return Err(PricingError::invalid_config(format!(
                "order {} must be refreshed before its usage is recorded",
                order.id()
            )));
        }
        if !self.recorded_orders.insert(order.id()) {
            warn!(order_id = order.id(), "Usage already recorded for order");
            return Ok(RecordedUsage::default());
        }
        let usage = Self::collect(order);
        for &promotion_id in &usage.promotions {
            self.tracker.record_usage(promotion_id, customer_id);
        }
        for &coupon_id in &usage.coupons {
            self.tracker.record_coupon_usage(coupon_id);
        }
        info!(
            order_id = order.id(),
            promotions = usage.promotions.len(),
            coupons = usage.coupons.len(),
            "Recorded promotion usage"
        );
        Ok(usage)
    }
}
