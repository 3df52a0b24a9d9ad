//! Error types for the shared crate
//!
//! One taxonomy for the whole pricing stack. Arithmetic errors are caller bugs
//! and propagate; configuration errors are caught per promotion/tax type by the
//! engine and reported instead of aborting a refresh.

use crate::models::TargetEntityType;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// Binary operation on prices with different currencies
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch { left: String, right: String },

    /// Malformed condition / offer / tax type data
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Condition or offer evaluated against the wrong entity kind
    #[error("Unsupported target: expected {expected}, got {actual}")]
    UnsupportedTarget {
        expected: TargetEntityType,
        actual: TargetEntityType,
    },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),
}

impl PricingError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    pub fn currency_mismatch(left: &str, right: &str) -> Self {
        Self::CurrencyMismatch {
            left: left.to_string(),
            right: right.to_string(),
        }
    }

    /// `UnsupportedTarget` counts as bad configuration: the data asked for an
    /// evaluation the engine cannot perform.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfiguration(_) | Self::UnsupportedTarget { .. }
        )
    }
}

pub type PricingResult<T> = Result<T, PricingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_classification() {
        assert!(PricingError::invalid_config("bad").is_configuration_error());
        assert!(
            PricingError::UnsupportedTarget {
                expected: TargetEntityType::OrderItem,
                actual: TargetEntityType::Order,
            }
            .is_configuration_error()
        );
        assert!(!PricingError::currency_mismatch("USD", "EUR").is_configuration_error());
        assert!(!PricingError::DivisionByZero.is_configuration_error());
    }

    #[test]
    fn test_error_messages() {
        let err = PricingError::currency_mismatch("USD", "EUR");
        assert_eq!(err.to_string(), "Currency mismatch: USD vs EUR");

        let err = PricingError::UnsupportedTarget {
            expected: TargetEntityType::OrderItem,
            actual: TargetEntityType::Order,
        };
        assert_eq!(
            err.to_string(),
            "Unsupported target: expected order_item, got order"
        );
    }
}
