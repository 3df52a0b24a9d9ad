//! Availability checker chain
//!
//! Every applicable checker runs, in registration order, and the last
//! non-neutral verdict wins. There is no early exit: a checker registered later
//! overrides an earlier one, so specific checkers are registered after generic
//! ones. A final `Neutral` counts as available.

mod checkers;

pub use checkers::{DiscontinuedProductChecker, QuantityLimitChecker};

use shared::OrderItem;

use crate::context::EvaluationContext;

/// Tri-state verdict of a single checker
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Availability {
    Available,
    /// No opinion
    #[default]
    Neutral,
    Unavailable(Option<String>),
}

impl Availability {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Availability::Unavailable(Some(reason.into()))
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Availability::Neutral)
    }

    /// `Neutral` counts as available
    pub fn is_available(&self) -> bool {
        !matches!(self, Availability::Unavailable(_))
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Availability::Unavailable(reason) => reason.as_deref(),
            _ => None,
        }
    }
}

pub trait AvailabilityChecker: Send + Sync {
    /// Whether this checker has anything to say about the item
    fn applies(&self, item: &OrderItem) -> bool;

    fn check(&self, item: &OrderItem, ctx: &EvaluationContext) -> Availability;
}

/// Checker with the older boolean contract: `Some(true)`, `Some(false)` or
/// `None` for no opinion
pub trait LegacyAvailabilityChecker: Send + Sync {
    fn applies(&self, item: &OrderItem) -> bool;

    fn check(&self, item: &OrderItem, ctx: &EvaluationContext) -> Option<bool>;
}

/// Lifts a [`LegacyAvailabilityChecker`] into the tri-state chain
pub struct LegacyCheckerAdapter<C> {
    inner: C,
}

impl<C: LegacyAvailabilityChecker> LegacyCheckerAdapter<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: LegacyAvailabilityChecker> AvailabilityChecker for LegacyCheckerAdapter<C> {
    fn applies(&self, item: &OrderItem) -> bool {
        self.inner.applies(item)
    }

    fn check(&self, item: &OrderItem, ctx: &EvaluationContext) -> Availability {
        match self.inner.check(item, ctx) {
            None => Availability::Neutral,
            Some(true) => Availability::Available,
            Some(false) => Availability::Unavailable(None),
        }
    }
}

/// Ordered checker registry
#[derive(Default)]
pub struct AvailabilityManager {
    checkers: Vec<Box<dyn AvailabilityChecker>>,
}

impl AvailabilityManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, checker: impl AvailabilityChecker + 'static) {
        self.checkers.push(Box::new(checker));
    }

    pub fn register_legacy(&mut self, checker: impl LegacyAvailabilityChecker + 'static) {
        self.register(LegacyCheckerAdapter::new(checker));
    }

    pub fn with_checker(mut self, checker: impl AvailabilityChecker + 'static) -> Self {
        self.register(checker);
        self
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    pub fn check(&self, item: &OrderItem, ctx: &EvaluationContext) -> Availability {
        let mut result = Availability::Neutral;
        for checker in self.checkers.iter().filter(|c| c.applies(item)) {
            let verdict = checker.check(item, ctx);
            if !verdict.is_neutral() {
                result = verdict;
            }
        }
        result
    }
}

impl std::fmt::Debug for AvailabilityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvailabilityManager")
            .field("checkers", &self.checkers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use shared::{Price, PurchasedEntity};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        verdict: Availability,
        applies: bool,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn new(verdict: Availability, calls: &Arc<AtomicUsize>) -> Self {
            Self {
                verdict,
                applies: true,
                calls: calls.clone(),
            }
        }
    }

    impl AvailabilityChecker for Fixed {
        fn applies(&self, _item: &OrderItem) -> bool {
            self.applies
        }

        fn check(&self, _item: &OrderItem, _ctx: &EvaluationContext) -> Availability {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.verdict.clone()
        }
    }

    struct Legacy(Option<bool>);

    impl LegacyAvailabilityChecker for Legacy {
        fn applies(&self, _item: &OrderItem) -> bool {
            true
        }

        fn check(&self, _item: &OrderItem, _ctx: &EvaluationContext) -> Option<bool> {
            self.0
        }
    }

    fn item() -> OrderItem {
        OrderItem::new(
            1,
            PurchasedEntity::product(1),
            Decimal::ONE,
            Price::parse("1", "USD").unwrap(),
        )
    }

    fn ctx() -> EvaluationContext {
        EvaluationContext::new(Utc::now())
    }

    #[test]
    fn test_empty_chain_is_neutral() {
        let manager = AvailabilityManager::new();
        let verdict = manager.check(&item(), &ctx());
        assert_eq!(verdict, Availability::Neutral);
        assert!(verdict.is_available());
    }

    #[test]
    fn test_last_non_neutral_wins_without_short_circuit() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = AvailabilityManager::new()
            .with_checker(Fixed::new(Availability::Available, &calls))
            .with_checker(Fixed::new(Availability::unavailable("sold out"), &calls))
            .with_checker(Fixed::new(Availability::Available, &calls));
        assert_eq!(manager.check(&item(), &ctx()), Availability::Available);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_neutral_does_not_overwrite() {
        let calls = Arc::new(AtomicUsize::new(0));
        let manager = AvailabilityManager::new()
            .with_checker(Fixed::new(Availability::unavailable("sold out"), &calls))
            .with_checker(Fixed::new(Availability::Neutral, &calls));
        let verdict = manager.check(&item(), &ctx());
        assert!(!verdict.is_available());
        assert_eq!(verdict.reason(), Some("sold out"));
    }

    #[test]
    fn test_non_applicable_checker_is_skipped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut skipped = Fixed::new(Availability::unavailable("never"), &calls);
        skipped.applies = false;
        let manager = AvailabilityManager::new().with_checker(skipped);
        assert_eq!(manager.check(&item(), &ctx()), Availability::Neutral);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_legacy_adapter_mapping() {
        let cases = [
            (None, Availability::Neutral),
            (Some(true), Availability::Available),
            (Some(false), Availability::Unavailable(None)),
        ];
        for (legacy, expected) in cases {
            let mut manager = AvailabilityManager::new();
            manager.register_legacy(Legacy(legacy));
            assert_eq!(manager.check(&item(), &ctx()), expected);
        }
    }
}
