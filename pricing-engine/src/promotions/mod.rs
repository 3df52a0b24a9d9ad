//! Promotions, offers and coupons

mod applier;
mod coupon;
mod offer;
mod promotion;
mod usage;

pub use applier::{PromotionApplier, PromotionFailure, PromotionOutcome, promotion_source_id};
pub use coupon::{CouponError, CouponRedeemer};
pub use offer::{CustomOfferPlugin, Offer, OfferEnv, OfferPlugins, OfferSpec};
pub use promotion::{Compatibility, Promotion};
pub use usage::{RecordedUsage, UsageRecorder, parse_promotion_source};
