//! Coupon Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{PricingError, PricingResult};

/// Coupon entity - gates a promotion behind a redeemable code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub promotion_id: i64,
    /// `None` or `Some(0)` = unlimited
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_limit: Option<u32>,
    #[serde(default)]
    pub current_usage: u32,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn new(id: i64, code: impl Into<String>, promotion_id: i64) -> Self {
        Self {
            id,
            code: code.into(),
            promotion_id,
            usage_limit: None,
            current_usage: 0,
            enabled: true,
            start_date: None,
            end_date: None,
        }
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.code.trim().is_empty() {
            return Err(PricingError::invalid_config(format!(
                "coupon {} has an empty code",
                self.id
            )));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date)
            && end <= start
        {
            return Err(PricingError::invalid_config(format!(
                "coupon {} ends before it starts",
                self.id
            )));
        }
        Ok(())
    }

    /// Half-open validity window `[start_date, end_date)`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_date.is_none_or(|start| start <= now);
        let not_ended = self.end_date.is_none_or(|end| now < end);
        started && not_ended
    }

    pub fn has_usage_remaining(&self) -> bool {
        match self.usage_limit {
            None | Some(0) => true,
            Some(limit) => self.current_usage < limit,
        }
    }

    /// Enabled, inside its window and not exhausted
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.enabled && self.is_active_at(now) && self.has_usage_remaining()
    }
}
