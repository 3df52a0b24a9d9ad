//! Data models
//!
//! Shared between the pricing engine and whatever persists orders.
//! All IDs are `i64`; field names are the storage contract.

pub mod address;
pub mod adjustment;
pub mod comparison;
pub mod coupon;
pub mod customer;
pub mod order;
pub mod price;

// Re-exports
pub use address::*;
pub use adjustment::*;
pub use comparison::*;
pub use coupon::*;
pub use customer::*;
pub use order::*;
pub use price::*;
