//! Order refresh
//!
//! Recomputes an order's adjustments and total from scratch:
//!
//! ```text
//! Dirty ──begin──▶ Refreshing ──complete──▶ Clean
//!                      │
//!                      └──error──▶ Dirty (adjustments untouched)
//! ```
//!
//! 1. computed adjustments are dropped, locked (manual) ones are kept verbatim
//! 2. every item goes through the availability chain; unavailable items are
//!    flagged, never removed
//! 3. promotions are applied against the undiscounted subtotal
//! 4. taxes are resolved on the post-discount base
//! 5. `total = subtotal + Σ non-included adjustments`
//!
//! All computation reads the order immutably and the result is written in
//! one step, so a failed refresh leaves no partial state behind.
//!
//! # Concurrency
//!
//! A refresh takes `&mut Order`, which rules out two refreshes of the same
//! in-memory order. Callers holding one order in several places (or in a
//! database) must still serialize refreshes per order, and must serialize
//! usage recording so two orders cannot both pass a promotion's limit.

use std::sync::Arc;

use shared::{Adjustment, Order, Price, PricingResult};
use tracing::{debug, info, warn};

use crate::adjustments::grand_total;
use crate::availability::{Availability, AvailabilityManager};
use crate::config::EngineConfig;
use crate::context::EvaluationContext;
use crate::promotions::{CustomOfferPlugin, OfferPlugins, PromotionApplier, PromotionFailure};
use crate::repository::Repositories;
use crate::tax::{TaxFailure, TaxResolver};

/// An item the availability chain rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableItem {
    pub item_id: i64,
    pub reason: Option<String>,
}

/// What a refresh did besides updating the order
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    /// Computed adjustments (promotions and taxes) now on the order
    pub adjustments_added: usize,
    pub unavailable_items: Vec<UnavailableItem>,
    /// Promotions that produced adjustments, in application order
    pub applied_promotions: Vec<i64>,
    /// Promotions skipped for invalid configuration
    pub failures: Vec<PromotionFailure>,
    /// Tax types skipped for invalid configuration
    pub tax_failures: Vec<TaxFailure>,
    pub total: Price,
}

struct Computed {
    availability: Vec<(i64, Availability)>,
    adjustments: Vec<Adjustment>,
    report: RefreshReport,
}

pub struct OrderRefresher {
    config: EngineConfig,
    repositories: Repositories,
    availability: AvailabilityManager,
    plugins: OfferPlugins,
}

impl OrderRefresher {
    pub fn new(config: EngineConfig, repositories: Repositories) -> Self {
        Self {
            config,
            repositories,
            availability: AvailabilityManager::new(),
            plugins: OfferPlugins::new(),
        }
    }

    pub fn with_availability(mut self, availability: AvailabilityManager) -> Self {
        self.availability = availability;
        self
    }

    pub fn with_offer_plugin(mut self, plugin: Arc<dyn CustomOfferPlugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repositories(&self) -> &Repositories {
        &self.repositories
    }

    /// Minor-unit digits of `currency_code`, or the configured default
    pub fn fraction_digits(&self, currency_code: &str) -> u32 {
        match self.repositories.currencies.fraction_digits(currency_code) {
            Some(digits) => digits,
            None => {
                warn!(
                    currency = currency_code,
                    default = self.config.default_fraction_digits,
                    "Unknown currency, using default precision"
                );
                self.config.default_fraction_digits
            }
        }
    }

    /// The caller's context completed with the order's store and billing address
    pub fn context_for(&self, order: &Order, ctx: &EvaluationContext) -> EvaluationContext {
        let mut ctx = ctx.clone();
        if ctx.store_id.is_none() {
            ctx.store_id = Some(order.store_id());
        }
        if ctx.address.is_none() {
            ctx.address = self.repositories.addresses.billing_address(order);
        }
        ctx
    }

    /// Recompute the order's adjustments and total.
    ///
    /// Not reentrant per order: see the module docs. On error the order keeps
    /// its previous adjustments and total and is left `Dirty`.
    pub fn refresh(&self, order: &mut Order, ctx: &EvaluationContext) -> PricingResult<RefreshReport> {
        order.begin_refresh();
        let ctx = self.context_for(order, ctx);

        let computed = match self.compute(order, &ctx) {
            Ok(computed) => computed,
            Err(error) => {
                warn!(order_id = order.id(), error = %error, "Order refresh failed");
                order.abort_refresh();
                return Err(error);
            }
        };

        for (item_id, availability) in computed.availability {
            order.set_item_availability_issue(item_id, unavailable_reason(&availability));
        }
        let report = computed.report;
        order.complete_refresh(computed.adjustments, report.total.clone());

        info!(
            order_id = order.id(),
            adjustments = order.adjustments().len(),
            promotions = report.applied_promotions.len(),
            failures = report.failures.len() + report.tax_failures.len(),
            total = %report.total,
            "Order refreshed"
        );
        Ok(report)
    }

    fn compute(&self, order: &Order, ctx: &EvaluationContext) -> PricingResult<Computed> {
        let mut unavailable_items = Vec::new();
        let availability: Vec<(i64, Availability)> = order
            .items()
            .iter()
            .map(|item| {
                let verdict = self.availability.check(item, ctx);
                if !verdict.is_available() {
                    debug!(order_id = order.id(), item_id = item.id, "Item unavailable");
                    unavailable_items.push(UnavailableItem {
                        item_id: item.id,
                        reason: verdict.reason().map(str::to_string),
                    });
                }
                (item.id, verdict)
            })
            .collect();

        let fraction_digits = self.fraction_digits(order.currency_code());
        let mut adjustments: Vec<Adjustment> = order
            .adjustments()
            .iter()
            .filter(|a| a.is_locked())
            .cloned()
            .collect();
        let kept = adjustments.len();

        let applier = PromotionApplier::new(
            self.repositories.promotions.as_ref(),
            self.repositories.coupons.as_ref(),
            self.repositories.usage.as_ref(),
            &self.plugins,
            &self.config,
        );
        let promotions = applier.apply(order, ctx, fraction_digits)?;
        adjustments.extend(promotions.adjustments);

        let tax_types = self.repositories.tax_types.load_enabled();
        let taxes = TaxResolver::new(fraction_digits).resolve(
            order,
            &adjustments,
            ctx.address.as_ref(),
            &tax_types,
        )?;
        adjustments.extend(taxes.adjustments);

        let total = grand_total(&order.subtotal()?, &adjustments)?;

        Ok(Computed {
            availability,
            report: RefreshReport {
                adjustments_added: adjustments.len() - kept,
                unavailable_items,
                applied_promotions: promotions.applied,
                failures: promotions.failures,
                tax_failures: taxes.failures,
                total,
            },
            adjustments,
        })
    }
}

fn unavailable_reason(availability: &Availability) -> Option<String> {
    match availability {
        Availability::Unavailable(reason) => {
            Some(reason.clone().unwrap_or_else(|| "unavailable".to_string()))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::DiscontinuedProductChecker;
    use crate::conditions::test_support::*;
    use crate::promotions::{Offer, OfferSpec, Promotion};
    use crate::repository::{
        AddressProvider, InMemoryCurrencyRepository, InMemoryPromotionRepository, InMemoryTaxTypeRepository,
    };
    use crate::tax::{TaxRate, TaxType};
    use crate::zone::{Zone, ZoneTerritory};
    use chrono::Duration;
    use rust_decimal::Decimal;
    use shared::{Address, AdjustmentType, OrderItem, OrderState, PricingError, PurchasedEntity, TargetEntityType};

    fn ten_percent(id: i64) -> Promotion {
        Promotion::new(
            id,
            format!("Promo {}", id),
            Offer::order_percentage(Decimal::new(1, 1)).unwrap(),
            ctx().now - Duration::days(1),
        )
    }

    fn us_tax(percentage: &str) -> TaxType {
        TaxType::new(
            1,
            "US",
            Zone::new(vec![ZoneTerritory::country("US")]).unwrap(),
            vec![TaxRate::new("Sales tax", percentage.parse().unwrap(), "sales")],
        )
        .unwrap()
    }

    fn refresher(promotions: Vec<Promotion>, tax_types: Vec<TaxType>) -> OrderRefresher {
        let repositories = Repositories {
            promotions: Arc::new(promotions.into_iter().collect::<InMemoryPromotionRepository>()),
            tax_types: Arc::new(tax_types.into_iter().collect::<InMemoryTaxTypeRepository>()),
            ..Repositories::default()
        };
        OrderRefresher::new(EngineConfig::default(), repositories)
    }

    /// Returns a discount in a currency the order does not use
    struct ForeignCurrencyPlugin;

    impl CustomOfferPlugin for ForeignCurrencyPlugin {
        fn plugin_id(&self) -> &str {
            "foreign"
        }

        fn compute(
            &self,
            _configuration: &serde_json::Value,
            _order: &Order,
            _items: &[&OrderItem],
            _ctx: &EvaluationContext,
        ) -> PricingResult<Vec<Adjustment>> {
            Ok(vec![Adjustment::new(
                AdjustmentType::Discount,
                "Foreign",
                Price::parse("-1", "EUR")?,
            )])
        }
    }

    #[test]
    fn test_refresh_without_promotions() {
        let mut order = order_with(&[(101, 2, "10.00")]);
        let report = refresher(vec![], vec![]).refresh(&mut order, &ctx()).unwrap();
        assert_eq!(report.total, usd("20.00"));
        assert_eq!(report.adjustments_added, 0);
        assert_eq!(order.total(), Some(&usd("20.00")));
        assert_eq!(order.state(), OrderState::Clean);
    }

    #[test]
    fn test_promotion_then_tax_on_discounted_base() {
        let mut order = order_with(&[(101, 2, "10.00")]);
        order.set_billing_address(Some(Address::new("US")));
        let report = refresher(vec![ten_percent(1)], vec![us_tax("0.1")])
            .refresh(&mut order, &ctx())
            .unwrap();

        let lines: Vec<(AdjustmentType, Price)> = order
            .adjustments()
            .iter()
            .map(|a| (a.adjustment_type(), a.amount().clone()))
            .collect();
        assert_eq!(
            lines,
            vec![
                (AdjustmentType::Discount, usd("-2.00")),
                (AdjustmentType::Tax, usd("1.80")),
            ]
        );
        assert_eq!(report.applied_promotions, vec![1]);
        assert_eq!(report.adjustments_added, 2);
        assert_eq!(order.total(), Some(&usd("19.80")));
    }

    #[test]
    fn test_locked_adjustments_survive_refresh() {
        let mut order = order_with(&[(101, 1, "50.00")]);
        order
            .add_manual_adjustment(Adjustment::new(AdjustmentType::Fee, "Gift wrap", usd("3.00")))
            .unwrap();
        let refresher = refresher(vec![ten_percent(1)], vec![]);

        refresher.refresh(&mut order, &ctx()).unwrap();
        let first = order.adjustments().to_vec();
        refresher.refresh(&mut order, &ctx()).unwrap();

        assert_eq!(order.adjustments(), first.as_slice());
        assert_eq!(order.adjustments().len(), 2);
        assert!(order.adjustments()[0].is_locked());
        assert_eq!(order.total(), Some(&usd("48.00")));
    }

    #[test]
    fn test_unavailable_items_are_flagged_not_removed() {
        let mut order = order_with(&[(101, 1, "5"), (202, 1, "5")]);
        let refresher = refresher(vec![], vec![])
            .with_availability(AvailabilityManager::new().with_checker(DiscontinuedProductChecker::new([202])));

        let report = refresher.refresh(&mut order, &ctx()).unwrap();
        assert_eq!(order.items().len(), 2);
        assert_eq!(report.unavailable_items.len(), 1);
        assert_eq!(report.unavailable_items[0].item_id, 2);
        assert!(order.item(1).unwrap().availability_issue.is_none());
        assert_eq!(
            order.item(2).unwrap().availability_issue.as_deref(),
            Some("product 202 is discontinued")
        );
        assert_eq!(order.state(), OrderState::Clean);
    }

    #[test]
    fn test_failed_refresh_leaves_order_untouched() {
        let plugin_promotion = Promotion::new(
            2,
            "Foreign",
            Offer::new(
                TargetEntityType::Order,
                OfferSpec::Custom {
                    plugin_id: "foreign".to_string(),
                    configuration: serde_json::Value::Null,
                },
            )
            .unwrap(),
            ctx().now - Duration::days(1),
        );
        let mut order = order_with(&[(101, 1, "10.00")]);
        refresher(vec![ten_percent(1)], vec![])
            .refresh(&mut order, &ctx())
            .unwrap();
        let before = order.adjustments().to_vec();
        order.set_item_quantity(1, Decimal::from(3)).unwrap();

        let failing = refresher(vec![ten_percent(1), plugin_promotion], vec![])
            .with_offer_plugin(Arc::new(ForeignCurrencyPlugin));
        let result = failing.refresh(&mut order, &ctx());

        assert!(matches!(result, Err(PricingError::CurrencyMismatch { .. })));
        assert_eq!(order.adjustments(), before.as_slice());
        assert_eq!(order.total(), Some(&usd("9.00")));
        assert_eq!(order.state(), OrderState::Dirty);
    }

    #[test]
    fn test_invalid_promotion_does_not_block_others_or_tax() {
        let missing_plugin = Promotion::new(
            2,
            "Missing plugin",
            Offer::new(
                TargetEntityType::Order,
                OfferSpec::Custom {
                    plugin_id: "nowhere".to_string(),
                    configuration: serde_json::Value::Null,
                },
            )
            .unwrap(),
            ctx().now - Duration::days(1),
        );
        let mut order = order_with(&[(101, 1, "100.00")]);
        order.set_billing_address(Some(Address::new("US")));

        let report = refresher(vec![missing_plugin, ten_percent(3)], vec![us_tax("0.05")])
            .refresh(&mut order, &ctx())
            .unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].promotion_id, 2);
        assert_eq!(report.applied_promotions, vec![3]);
        assert_eq!(order.total(), Some(&usd("94.50")));
    }

    #[test]
    fn test_address_provider_and_unknown_currency() {
        struct FixedAddress;
        impl AddressProvider for FixedAddress {
            fn billing_address(&self, _order: &Order) -> Option<Address> {
                Some(Address::new("US"))
            }
        }

        let mut order = Order::new(1, "default", 1, "XYZ").unwrap();
        order
            .add_item(OrderItem::new(
                1,
                PurchasedEntity::product(1),
                Decimal::ONE,
                Price::parse("10.555", "XYZ").unwrap(),
            ))
            .unwrap();

        let repositories = Repositories {
            tax_types: Arc::new([us_tax("0.1")].into_iter().collect::<InMemoryTaxTypeRepository>()),
            currencies: Arc::new(InMemoryCurrencyRepository::new()),
            addresses: Arc::new(FixedAddress),
            ..Repositories::default()
        };
        let refresher = OrderRefresher::new(EngineConfig::default().with_default_fraction_digits(1), repositories);
        assert_eq!(refresher.fraction_digits("XYZ"), 1);

        refresher.refresh(&mut order, &ctx()).unwrap();
        let tax = &order.adjustments()[0];
        assert_eq!(tax.amount(), &Price::parse("1.1", "XYZ").unwrap());
    }
}
