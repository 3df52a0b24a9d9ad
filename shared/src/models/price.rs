//! Price Model
//!
//! Currency-tagged arbitrary-precision decimal. Every binary operation checks
//! the currency first; multiplication and division keep full precision and
//! only `round` ever drops digits.

use std::cmp::Ordering;
use std::fmt;

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};

/// Midpoint rounding modes supported by tax types and discount offers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    HalfUp,
    HalfDown,
    HalfEven,
}

impl RoundingMode {
    pub fn strategy(self) -> RoundingStrategy {
        match self {
            RoundingMode::HalfUp => RoundingStrategy::MidpointAwayFromZero,
            RoundingMode::HalfDown => RoundingStrategy::MidpointTowardZero,
            RoundingMode::HalfEven => RoundingStrategy::MidpointNearestEven,
        }
    }
}

impl FromStr for RoundingMode {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "half_up" => Ok(RoundingMode::HalfUp),
            "half_down" => Ok(RoundingMode::HalfDown),
            "half_even" => Ok(RoundingMode::HalfEven),
            other => Err(PricingError::invalid_config(format!(
                "unknown rounding mode '{}'",
                other
            ))),
        }
    }
}

/// Storage shape of a price, validated on the way in
#[derive(Deserialize)]
struct PriceRecord {
    number: Decimal,
    currency_code: String,
}

impl TryFrom<PriceRecord> for Price {
    type Error = PricingError;

    fn try_from(record: PriceRecord) -> Result<Self, Self::Error> {
        Price::new(record.number, &record.currency_code)
    }
}

/// Immutable monetary amount in a single currency
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PriceRecord")]
pub struct Price {
    number: Decimal,
    currency_code: String,
}

fn validate_currency_code(code: &str) -> PricingResult<()> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(PricingError::InvalidCurrencyCode(code.to_string()))
    }
}

impl Price {
    pub fn new(number: Decimal, currency_code: &str) -> PricingResult<Self> {
        validate_currency_code(currency_code)?;
        Ok(Self {
            number,
            currency_code: currency_code.to_string(),
        })
    }

    pub fn zero(currency_code: &str) -> PricingResult<Self> {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Parse the number from its decimal string form ("10.005")
    pub fn parse(number: &str, currency_code: &str) -> PricingResult<Self> {
        let number = Decimal::from_str(number).map_err(|e| {
            PricingError::invalid_config(format!("invalid price number '{}': {}", number, e))
        })?;
        Self::new(number, currency_code)
    }

    pub fn number(&self) -> Decimal {
        self.number
    }

    pub fn currency_code(&self) -> &str {
        &self.currency_code
    }

    fn with_number(&self, number: Decimal) -> Self {
        Self {
            number,
            currency_code: self.currency_code.clone(),
        }
    }

    fn ensure_same_currency(&self, other: &Price) -> PricingResult<()> {
        if self.currency_code != other.currency_code {
            return Err(PricingError::currency_mismatch(
                &self.currency_code,
                &other.currency_code,
            ));
        }
        Ok(())
    }

    pub fn add(&self, other: &Price) -> PricingResult<Price> {
        self.ensure_same_currency(other)?;
        self.number
            .checked_add(other.number)
            .map(|n| self.with_number(n))
            .ok_or(PricingError::ArithmeticOverflow)
    }

    pub fn subtract(&self, other: &Price) -> PricingResult<Price> {
        self.ensure_same_currency(other)?;
        self.number
            .checked_sub(other.number)
            .map(|n| self.with_number(n))
            .ok_or(PricingError::ArithmeticOverflow)
    }

    pub fn multiply(&self, factor: Decimal) -> PricingResult<Price> {
        self.number
            .checked_mul(factor)
            .map(|n| self.with_number(n))
            .ok_or(PricingError::ArithmeticOverflow)
    }

    pub fn divide(&self, divisor: Decimal) -> PricingResult<Price> {
        if divisor.is_zero() {
            return Err(PricingError::DivisionByZero);
        }
        self.number
            .checked_div(divisor)
            .map(|n| self.with_number(n))
            .ok_or(PricingError::ArithmeticOverflow)
    }

    pub fn compare(&self, other: &Price) -> PricingResult<Ordering> {
        self.ensure_same_currency(other)?;
        Ok(self.number.cmp(&other.number))
    }

    /// Same currency and same numeric value, regardless of scale
    pub fn equals(&self, other: &Price) -> bool {
        self.currency_code == other.currency_code && self.number == other.number
    }

    pub fn greater_than(&self, other: &Price) -> PricingResult<bool> {
        Ok(self.compare(other)? == Ordering::Greater)
    }

    pub fn greater_than_or_equal(&self, other: &Price) -> PricingResult<bool> {
        Ok(self.compare(other)? != Ordering::Less)
    }

    pub fn less_than(&self, other: &Price) -> PricingResult<bool> {
        Ok(self.compare(other)? == Ordering::Less)
    }

    pub fn less_than_or_equal(&self, other: &Price) -> PricingResult<bool> {
        Ok(self.compare(other)? != Ordering::Greater)
    }

    pub fn is_zero(&self) -> bool {
        self.number.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.number.is_zero() && self.number.is_sign_positive()
    }

    pub fn is_negative(&self) -> bool {
        !self.number.is_zero() && self.number.is_sign_negative()
    }

    pub fn negate(&self) -> Price {
        self.with_number(-self.number)
    }

    pub fn abs(&self) -> Price {
        self.with_number(self.number.abs())
    }

    pub fn round(&self, mode: RoundingMode, precision: u32) -> Price {
        self.with_number(self.number.round_dp_with_strategy(precision, mode.strategy()))
    }

    /// Sum a sequence of prices; an empty sequence yields zero in `currency_code`
    pub fn sum<'a, I>(currency_code: &str, prices: I) -> PricingResult<Price>
    where
        I: IntoIterator<Item = &'a Price>,
    {
        prices
            .into_iter()
            .try_fold(Price::zero(currency_code)?, |acc, price| acc.add(price))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.number, self.currency_code)
    }
}
