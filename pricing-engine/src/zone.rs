//! Territory zones
//!
//! A zone is a list of territories; an address is in the zone when any
//! territory matches it. Used by tax types and the `order_billing_address`
//! condition.
//!
//! Postal-code rules are comma-separated entries, each either an exact code or
//! an inclusive `low:high` range. Ranges compare numerically when all three
//! values are digits, lexicographically otherwise.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use shared::{Address, PricingError, PricingResult};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ZoneTerritory {
    /// ISO 3166-1 alpha-2
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub administrative_area: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locality: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub included_postal_codes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_postal_codes: Option<String>,
}

impl ZoneTerritory {
    pub fn country(country_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            ..Default::default()
        }
    }

    pub fn with_administrative_area(mut self, area: impl Into<String>) -> Self {
        self.administrative_area = Some(area.into());
        self
    }

    pub fn with_locality(mut self, locality: impl Into<String>) -> Self {
        self.locality = Some(locality.into());
        self
    }

    pub fn with_included_postal_codes(mut self, rule: impl Into<String>) -> Self {
        self.included_postal_codes = Some(rule.into());
        self
    }

    pub fn with_excluded_postal_codes(mut self, rule: impl Into<String>) -> Self {
        self.excluded_postal_codes = Some(rule.into());
        self
    }

    pub fn validate(&self) -> PricingResult<()> {
        let code = &self.country_code;
        if code.len() != 2 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(PricingError::invalid_config(format!(
                "territory country code must be two uppercase letters, got '{}'",
                code
            )));
        }
        for rule in [&self.included_postal_codes, &self.excluded_postal_codes]
            .into_iter()
            .flatten()
        {
            for entry in postal_entries(rule) {
                if let Some((low, high)) = entry.split_once(':')
                    && (low.trim().is_empty() || high.trim().is_empty())
                {
                    return Err(PricingError::invalid_config(format!(
                        "postal code range '{}' needs both bounds",
                        entry
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn matches(&self, address: &Address) -> bool {
        if !self.country_code.eq_ignore_ascii_case(&address.country_code) {
            return false;
        }
        if !field_matches(self.administrative_area.as_deref(), address.administrative_area.as_deref()) {
            return false;
        }
        if !field_matches(self.locality.as_deref(), address.locality.as_deref()) {
            return false;
        }

        let postal_code = address.postal_code.as_deref().map(str::trim);
        if let Some(rule) = non_blank(self.included_postal_codes.as_deref()) {
            match postal_code {
                Some(code) if postal_rule_matches(rule, code) => {}
                _ => return false,
            }
        }
        if let Some(rule) = non_blank(self.excluded_postal_codes.as_deref())
            && postal_code.is_some_and(|code| postal_rule_matches(rule, code))
        {
            return false;
        }
        true
    }
}

fn non_blank(rule: Option<&str>) -> Option<&str> {
    rule.filter(|r| !r.trim().is_empty())
}

/// An unset territory field matches anything; a set one needs an equal value
fn field_matches(expected: Option<&str>, actual: Option<&str>) -> bool {
    match expected {
        None => true,
        Some(expected) => actual.is_some_and(|a| a.trim().eq_ignore_ascii_case(expected.trim())),
    }
}

fn postal_entries(rule: &str) -> impl Iterator<Item = &str> {
    rule.split(',').map(str::trim).filter(|e| !e.is_empty())
}

fn compare_postal(a: &str, b: &str) -> Ordering {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|c| c.is_ascii_digit());
    if numeric(a)
        && numeric(b)
        && let (Ok(x), Ok(y)) = (a.parse::<u64>(), b.parse::<u64>())
    {
        return x.cmp(&y);
    }
    a.to_ascii_uppercase().cmp(&b.to_ascii_uppercase())
}

pub(crate) fn postal_rule_matches(rule: &str, postal_code: &str) -> bool {
    postal_entries(rule).any(|entry| match entry.split_once(':') {
        Some((low, high)) => {
            compare_postal(postal_code, low.trim()) != Ordering::Less
                && compare_postal(postal_code, high.trim()) != Ordering::Greater
        }
        None => entry.eq_ignore_ascii_case(postal_code),
    })
}

#[derive(Deserialize)]
struct ZoneRecord {
    territories: Vec<ZoneTerritory>,
}

impl TryFrom<ZoneRecord> for Zone {
    type Error = PricingError;

    fn try_from(record: ZoneRecord) -> Result<Self, Self::Error> {
        Zone::new(record.territories)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ZoneRecord")]
pub struct Zone {
    territories: Vec<ZoneTerritory>,
}

impl Zone {
    pub fn new(territories: Vec<ZoneTerritory>) -> PricingResult<Self> {
        let zone = Self { territories };
        zone.validate()?;
        Ok(zone)
    }

    pub fn territories(&self) -> &[ZoneTerritory] {
        &self.territories
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.territories.is_empty() {
            return Err(PricingError::invalid_config(
                "zone needs at least one territory",
            ));
        }
        self.territories.iter().try_for_each(ZoneTerritory::validate)
    }

    /// First territory that contains the address
    pub fn matching_territory(&self, address: &Address) -> Option<&ZoneTerritory> {
        self.territories.iter().find(|t| t.matches(address))
    }

    pub fn matches(&self, address: &Address) -> bool {
        self.matching_territory(address).is_some()
    }
}
