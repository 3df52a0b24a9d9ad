//! Coupon redemption

use std::sync::Arc;

use shared::{Coupon, Order, PricingError};
use thiserror::Error;
use tracing::info;

use super::applier::coupon_usage_remaining;
use crate::context::EvaluationContext;
use crate::repository::{CouponRepository, PromotionRepository, Repositories, UsageTracker};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CouponError {
    #[error("Coupon not found: {0}")]
    NotFound(String),

    #[error("Coupon {0} is not valid at this time")]
    Expired(String),

    #[error("Coupon {0} has reached its usage limit")]
    UsageExhausted(String),

    #[error("Coupon {code} does not apply to this order: {reason}")]
    NotApplicable { code: String, reason: String },

    #[error("Coupon {0} is already applied")]
    AlreadyApplied(String),

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

pub struct CouponRedeemer {
    coupons: Arc<dyn CouponRepository>,
    promotions: Arc<dyn PromotionRepository>,
    usage: Arc<dyn UsageTracker>,
}

impl CouponRedeemer {
    pub fn new(repositories: &Repositories) -> Self {
        Self {
            coupons: repositories.coupons.clone(),
            promotions: repositories.promotions.clone(),
            usage: repositories.usage.clone(),
        }
    }

    /// Validate `code` against the order and add the coupon to it.
    ///
    /// The order moves to `Dirty`; the discount shows up on the next refresh.
    pub fn redeem(&self, order: &mut Order, code: &str, ctx: &EvaluationContext) -> Result<Coupon, CouponError> {
        let code = code.trim();
        let coupon = self
            .coupons
            .find_enabled_by_code(code)
            .ok_or_else(|| CouponError::NotFound(code.to_string()))?;

        if order.coupons().contains(&coupon.id) {
            return Err(CouponError::AlreadyApplied(coupon.code));
        }
        if !coupon.is_active_at(ctx.now) {
            return Err(CouponError::Expired(coupon.code));
        }
        if !coupon_usage_remaining(&coupon, self.usage.as_ref()) {
            return Err(CouponError::UsageExhausted(coupon.code));
        }

        let not_applicable = |reason: &str| CouponError::NotApplicable {
            code: coupon.code.clone(),
            reason: reason.to_string(),
        };
        let promotion = self
            .promotions
            .find_by_id(coupon.promotion_id)
            .ok_or_else(|| not_applicable("promotion does not exist"))?;
        if promotion.validate().is_err() {
            return Err(not_applicable("promotion is misconfigured"));
        }
        if !promotion.is_available_for(order, ctx.now) {
            return Err(not_applicable("promotion is not available for this order"));
        }
        if promotion.evaluate_conditions(order, ctx)?.is_none() {
            return Err(not_applicable("order does not meet the promotion conditions"));
        }

        order.apply_coupon(coupon.id);
        info!(
            order_id = order.id(),
            coupon_id = coupon.id,
            promotion_id = promotion.id,
            "Coupon redeemed"
        );
        Ok(coupon)
    }

    /// Remove a coupon by code; returns whether it was on the order
    pub fn remove(&self, order: &mut Order, code: &str) -> bool {
        self.coupons
            .find_by_code(code.trim())
            .is_some_and(|coupon| order.remove_coupon(coupon.id))
    }
}
