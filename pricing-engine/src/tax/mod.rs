//! Taxes
//!
//! Tax types are data (`TaxType`), the resolver turns the ones whose zone
//! matches the billing address into `tax` adjustments.

mod resolver;
mod tax_type;

pub use resolver::{TaxFailure, TaxOutcome, TaxResolver, taxable_base};
pub use tax_type::{TaxRate, TaxType};
