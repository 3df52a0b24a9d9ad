//! Evaluation context
//!
//! Everything a condition or offer may need beyond the order itself. Passed
//! explicitly through every `evaluate`/`compute` call.

use chrono::{DateTime, Utc};
use shared::{Address, Customer};

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationContext {
    pub now: DateTime<Utc>,
    pub customer: Option<Customer>,
    pub store_id: Option<i64>,
    /// Billing address resolved for the order being evaluated
    pub address: Option<Address>,
}

impl EvaluationContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            customer: None,
            store_id: None,
            address: None,
        }
    }

    pub fn with_customer(mut self, customer: Customer) -> Self {
        self.customer = Some(customer);
        self
    }

    pub fn with_store(mut self, store_id: i64) -> Self {
        self.store_id = Some(store_id);
        self
    }

    pub fn with_address(mut self, address: Option<Address>) -> Self {
        self.address = address;
        self
    }

    pub fn customer_id(&self) -> Option<i64> {
        self.customer.as_ref().map(|c| c.id)
    }
}
