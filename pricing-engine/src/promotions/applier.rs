//! Promotion application
//!
//! Candidates come from the promotion repository and are processed in
//! `(weight, id)` order. Each promotion is isolated: a configuration error in
//! one is collected as a [`PromotionFailure`] and the rest still run. Errors
//! that are not configuration errors (currency mismatch inside the order,
//! arithmetic overflow) abort the whole application.

use shared::{Adjustment, Coupon, Order, PricingError, PricingResult};
use tracing::{debug, warn};

use super::offer::{OfferEnv, OfferPlugins};
use super::promotion::Promotion;
use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use crate::repository::{CouponRepository, PromotionRepository, UsageTracker};

/// A promotion skipped because its data could not be evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct PromotionFailure {
    pub promotion_id: i64,
    pub promotion_name: String,
    pub error: PricingError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PromotionOutcome {
    /// Tagged adjustments, in application order
    pub adjustments: Vec<Adjustment>,
    /// Ids of the promotions that produced adjustments
    pub applied: Vec<i64>,
    pub failures: Vec<PromotionFailure>,
}

/// `promotion:{id}`, or `promotion:{id}/coupon:{coupon_id}` when a coupon unlocked it
pub fn promotion_source_id(promotion_id: i64, coupon_id: Option<i64>) -> String {
    match coupon_id {
        Some(coupon_id) => format!("promotion:{}/coupon:{}", promotion_id, coupon_id),
        None => format!("promotion:{}", promotion_id),
    }
}

/// Coupon usage as the larger of the stored counter and the tracker's count
pub(crate) fn coupon_usage_remaining(coupon: &Coupon, usage: &dyn UsageTracker) -> bool {
    match coupon.usage_limit {
        None | Some(0) => true,
        Some(limit) => {
            let used = u64::from(coupon.current_usage).max(usage.get_coupon_usage(coupon.id));
            used < u64::from(limit)
        }
    }
}

pub struct PromotionApplier<'a> {
    promotions: &'a dyn PromotionRepository,
    coupons: &'a dyn CouponRepository,
    usage: &'a dyn UsageTracker,
    plugins: &'a OfferPlugins,
    config: &'a EngineConfig,
}

impl<'a> PromotionApplier<'a> {
    pub fn new(
        promotions: &'a dyn PromotionRepository,
        coupons: &'a dyn CouponRepository,
        usage: &'a dyn UsageTracker,
        plugins: &'a OfferPlugins,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            promotions,
            coupons,
            usage,
            plugins,
            config,
        }
    }

    /// Candidate promotions for the order, filtered and sorted
    pub fn candidates(&self, order: &Order, ctx: &EvaluationContext) -> Vec<Promotion> {
        let mut candidates: Vec<Promotion> = self
            .promotions
            .find_applicable(order.type_id(), order.store_id(), ctx.now)
            .into_iter()
            .filter(|p| p.is_available_for(order, ctx.now))
            .collect();
        candidates.sort_by_key(|p| (p.weight, p.id));
        if self.config.max_promotions > 0 && candidates.len() > self.config.max_promotions {
            debug!(
                order_id = order.id(),
                dropped = candidates.len() - self.config.max_promotions,
                "Candidate promotions capped"
            );
            candidates.truncate(self.config.max_promotions);
        }
        candidates
    }

    /// A redeemed coupon on the order that unlocks `promotion`
    pub fn find_coupon(&self, order: &Order, promotion: &Promotion, ctx: &EvaluationContext) -> Option<Coupon> {
        order
            .coupons()
            .iter()
            .filter_map(|&id| self.coupons.find_by_id(id))
            .find(|coupon| {
                coupon.promotion_id == promotion.id
                    && coupon.is_available(ctx.now)
                    && coupon_usage_remaining(coupon, self.usage)
            })
    }

    /// Global and per-customer limits. A per-customer limit needs a customer.
    pub fn within_usage_limits(&self, promotion: &Promotion, ctx: &EvaluationContext) -> bool {
        if let Some(limit) = promotion.usage_limit() {
            let used = u64::from(promotion.current_usage).max(self.usage.get_usage(promotion.id, None));
            if used >= limit {
                debug!(promotion_id = promotion.id, used, limit, "Promotion usage limit reached");
                return false;
            }
        }
        if let Some(limit) = promotion.usage_limit_per_client() {
            let Some(customer_id) = ctx.customer_id() else {
                debug!(promotion_id = promotion.id, "Per-customer limit without a customer");
                return false;
            };
            let used = self.usage.get_usage(promotion.id, Some(customer_id));
            if used >= limit {
                debug!(
                    promotion_id = promotion.id,
                    customer_id, used, limit, "Customer usage limit reached"
                );
                return false;
            }
        }
        true
    }

    pub fn apply(&self, order: &Order, ctx: &EvaluationContext, fraction_digits: u32) -> PricingResult<PromotionOutcome> {
        let env = OfferEnv {
            ctx,
            plugins: self.plugins,
            rounding: self.config.discount_rounding,
            fraction_digits,
        };
        let mut outcome = PromotionOutcome::default();

        for promotion in self.candidates(order, ctx) {
            if promotion.is_exclusive() && !outcome.applied.is_empty() {
                debug!(promotion_id = promotion.id, "Exclusive promotion skipped, others applied");
                continue;
            }

            match self.apply_one(&promotion, order, ctx, &env) {
                Ok(Some(adjustments)) => {
                    debug!(
                        promotion_id = promotion.id,
                        adjustments = adjustments.len(),
                        "Promotion applied"
                    );
                    outcome.adjustments.extend(adjustments);
                    outcome.applied.push(promotion.id);
                    if promotion.is_exclusive() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(error) if error.is_configuration_error() => {
                    warn!(
                        promotion_id = promotion.id,
                        promotion = %promotion.name,
                        error = %error,
                        "Skipping promotion with invalid configuration"
                    );
                    outcome.failures.push(PromotionFailure {
                        promotion_id: promotion.id,
                        promotion_name: promotion.name.clone(),
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }
        Ok(outcome)
    }

    /// Tagged adjustments, or `None` when the promotion does not apply or its
    /// offer yields nothing
    fn apply_one(
        &self,
        promotion: &Promotion,
        order: &Order,
        ctx: &EvaluationContext,
        env: &OfferEnv<'_>,
    ) -> PricingResult<Option<Vec<Adjustment>>> {
        promotion.validate()?;

        let coupon = if promotion.requires_coupon {
            match self.find_coupon(order, promotion, ctx) {
                Some(coupon) => Some(coupon),
                None => {
                    debug!(promotion_id = promotion.id, "No usable coupon for promotion");
                    return Ok(None);
                }
            }
        } else {
            None
        };

        if !self.within_usage_limits(promotion, ctx) {
            return Ok(None);
        }

        let Some(items) = promotion.evaluate_conditions(order, ctx)? else {
            debug!(promotion_id = promotion.id, "Promotion conditions not met");
            return Ok(None);
        };

        let source_id = promotion_source_id(promotion.id, coupon.map(|c| c.id));
        let adjustments = promotion
            .offer
            .compute(promotion.label(), order, &items, env)?
            .into_iter()
            .map(|a| a.with_source_id(source_id.clone()))
            .collect::<Vec<_>>();
        if adjustments.is_empty() {
            return Ok(None);
        }
        Ok(Some(adjustments))
    }
}
