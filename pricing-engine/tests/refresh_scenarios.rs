//! Whole-refresh scenarios
//!
//! Each test builds an order and in-memory collaborators, runs a refresh and
//! checks the adjustments and total the order ends up with.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Duration;
use common::*;
use pricing_engine::{
    Availability, AvailabilityChecker, AvailabilityManager, CouponRedeemer, EvaluationContext, OrderTotalSummary,
    Promotion, UsageRecorder,
};
use pricing_engine::repository::UsageTracker;
use rust_decimal::Decimal;
use shared::{Address, AdjustmentType, Coupon, OrderItem, OrderState};

#[test]
fn simple_order_total() {
    let mut order = order_with(&[(101, 2, "10.00")]);
    let engine = engine(vec![], vec![], vec![]);

    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    assert!(order.adjustments().is_empty());
    assert_eq!(order.total(), Some(&usd("20.00")));
    assert_eq!(order.state(), OrderState::Clean);
}

#[test]
fn percentage_promotion_discounts_subtotal() {
    let mut order = order_with(&[(101, 2, "10.00")]);
    let engine = engine(vec![percentage_promotion(1, "0.10")], vec![], vec![]);

    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    assert_eq!(order.adjustments().len(), 1);
    let discount = &order.adjustments()[0];
    assert_eq!(discount.adjustment_type(), AdjustmentType::Discount);
    assert_eq!(discount.amount(), &usd("-2.00"));
    assert_eq!(discount.source_id(), Some("promotion:1"));
    assert_eq!(order.total(), Some(&usd("18.00")));
}

#[test]
fn percentage_promotions_do_not_compound() {
    let mut order = order_with(&[(101, 1, "100.00")]);
    let engine = engine(
        vec![percentage_promotion(1, "0.10"), percentage_promotion(2, "0.20")],
        vec![],
        vec![],
    );

    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    let amounts: Vec<_> = order.adjustments().iter().map(|a| a.amount().clone()).collect();
    assert_eq!(amounts, vec![usd("-10.00"), usd("-20.00")]);
    assert_eq!(order.total(), Some(&usd("70.00")));
}

#[test]
fn compound_tax_scenario() {
    let mut order = order_with(&[(101, 1, "100.00")]);
    order.set_billing_address(Some(Address::new("US")));
    let engine = engine(vec![], vec![], vec![us_tax(1, &["0.05", "0.10"], true)]);

    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    let taxes: Vec<_> = order.adjustments().iter().map(|a| a.amount().clone()).collect();
    assert_eq!(taxes, vec![usd("5.00"), usd("10.50")]);
    assert_eq!(order.total(), Some(&usd("115.50")));

    let summary = OrderTotalSummary::from_order(&order).unwrap();
    assert_eq!(summary.adjustments.len(), 1);
    assert_eq!(summary.adjustments[0].amount, usd("15.50"));
}

#[test]
fn inclusive_tax_is_informational() {
    let mut order = order_with(&[(101, 1, "120.00")]);
    order.set_billing_address(Some(Address::new("US")));
    let vat = us_tax(1, &["0.20"], false).display_inclusive();
    let engine = engine(vec![], vec![], vec![vat]);

    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    assert_eq!(order.adjustments()[0].amount(), &usd("20.00"));
    assert!(order.adjustments()[0].is_included());
    assert_eq!(order.total(), Some(&usd("120.00")));
}

#[test]
fn promotion_date_window_is_half_open() {
    let starts_now = starting_in(percentage_promotion(1, "0.10"), 0);
    let ended_now = percentage_promotion(2, "0.50").with_end_date(now());
    let mut order = order_with(&[(101, 1, "10.00")]);
    let engine = engine(vec![starts_now, ended_now], vec![], vec![]);

    let report = engine.refresher.refresh(&mut order, &ctx()).unwrap();

    assert_eq!(report.applied_promotions, vec![1]);
    assert_eq!(order.total(), Some(&usd("9.00")));
}

fn starting_in(mut promotion: Promotion, offset_days: i64) -> Promotion {
    promotion.start_date = now() + Duration::days(offset_days);
    promotion
}

#[test]
fn future_promotion_does_not_apply() {
    let future = starting_in(percentage_promotion(1, "0.10"), 1);
    let mut order = order_with(&[(101, 1, "10.00")]);
    let engine = engine(vec![future], vec![], vec![]);

    let report = engine.refresher.refresh(&mut order, &ctx()).unwrap();
    assert!(report.applied_promotions.is_empty());
    assert_eq!(order.total(), Some(&usd("10.00")));
}

struct Fixed {
    verdict: Availability,
    calls: Arc<AtomicUsize>,
}

impl AvailabilityChecker for Fixed {
    fn applies(&self, _item: &OrderItem) -> bool {
        true
    }

    fn check(&self, _item: &OrderItem, _ctx: &EvaluationContext) -> Availability {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.verdict.clone()
    }
}

#[test]
fn availability_chain_last_verdict_wins() {
    let calls = Arc::new(AtomicUsize::new(0));
    let fixed = |verdict: Availability| Fixed {
        verdict,
        calls: calls.clone(),
    };
    let availability = AvailabilityManager::new()
        .with_checker(fixed(Availability::Available))
        .with_checker(fixed(Availability::unavailable("sold out")))
        .with_checker(fixed(Availability::Available));
    let engine = engine(vec![], vec![], vec![]);
    let refresher = engine.refresher.with_availability(availability);
    let mut order = order_with(&[(101, 1, "10.00")]);

    let report = refresher.refresh(&mut order, &ctx()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(report.unavailable_items.is_empty());
    assert!(order.item(1).unwrap().availability_issue.is_none());
}

#[test]
fn coupon_gated_promotion_and_usage_recording() {
    let gated = percentage_promotion(5, "0.25").with_coupon_required();
    let mut coupon = Coupon::new(50, "QUARTER", 5);
    coupon.usage_limit = Some(1);
    let engine = engine(vec![gated], vec![coupon], vec![]);
    let redeemer = CouponRedeemer::new(&engine.repositories);
    let mut order = order_with(&[(101, 4, "5.00")]);

    // Without the coupon the promotion stays out
    engine.refresher.refresh(&mut order, &ctx()).unwrap();
    assert_eq!(order.total(), Some(&usd("20.00")));

    redeemer.redeem(&mut order, "quarter", &ctx()).unwrap();
    assert!(order.needs_refresh());
    engine.refresher.refresh(&mut order, &ctx()).unwrap();
    assert_eq!(order.adjustments()[0].source_id(), Some("promotion:5/coupon:50"));
    assert_eq!(order.total(), Some(&usd("15.00")));

    let recorder = UsageRecorder::new(engine.repositories.usage.clone());
    let recorded = recorder.record_completed_order(&order, None).unwrap();
    assert!(recorded.promotions.contains(&5));
    assert!(recorded.coupons.contains(&50));
    assert_eq!(engine.usage.get_coupon_usage(50), 1);

    // The single use is spent: a second order cannot redeem it
    let mut second = order_with(&[(101, 1, "5.00")]);
    assert!(redeemer.redeem(&mut second, "QUARTER", &ctx()).is_err());
}

#[test]
fn global_usage_limit_stops_promotion() {
    let mut limited = percentage_promotion(1, "0.10");
    limited.usage_limit = Some(2);
    let engine = engine(vec![limited], vec![], vec![]);
    let recorder = UsageRecorder::new(engine.repositories.usage.clone());

    for (order_id, expected) in [(1, "9.00"), (2, "9.00"), (3, "10.00")] {
        let mut order = numbered_order(order_id, &[(101, 1, "10.00")]);
        engine.refresher.refresh(&mut order, &ctx()).unwrap();
        assert_eq!(order.total(), Some(&usd(expected)));
        recorder.record_completed_order(&order, None).unwrap();
    }
    assert_eq!(engine.usage.get_usage(1, None), 2);
}

#[test]
fn completed_order_counts_once() {
    let engine = engine(vec![percentage_promotion(1, "0.10")], vec![], vec![]);
    let recorder = UsageRecorder::new(engine.repositories.usage.clone());
    let mut order = order_with(&[(101, 1, "10.00")]);
    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    let first = recorder.record_completed_order(&order, None).unwrap();
    let second = recorder.record_completed_order(&order, None).unwrap();

    assert!(first.promotions.contains(&1));
    assert!(second.promotions.is_empty());
    assert_eq!(engine.usage.get_usage(1, None), 1);
}

#[test]
fn mutation_after_refresh_needs_new_refresh() {
    let mut order = order_with(&[(101, 1, "10.00")]);
    let engine = engine(vec![percentage_promotion(1, "0.10")], vec![], vec![]);
    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    order.set_item_quantity(1, Decimal::from(3)).unwrap();
    assert_eq!(order.state(), OrderState::Dirty);
    engine.refresher.refresh(&mut order, &ctx()).unwrap();

    assert_eq!(order.adjustments()[0].amount(), &usd("-3.00"));
    assert_eq!(order.total(), Some(&usd("27.00")));
}
