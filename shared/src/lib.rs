//! Shared types for the pricing workspace
//!
//! Value types (`Price`, `Adjustment`), the order model and the error
//! taxonomy used by the pricing engine and by the layers that store orders.

pub mod error;
pub mod models;

// Re-exports
pub use error::{PricingError, PricingResult};
pub use models::*;
pub use rust_decimal::Decimal;
