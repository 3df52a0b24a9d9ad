//! Tax Type Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::{PricingError, PricingResult, RoundingMode};

use crate::zone::Zone;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate {
    pub label: String,
    /// Fraction: 0.2 = 20%
    pub percentage: Decimal,
    /// Stable identifier used in adjustment source ids
    pub tag: String,
}

impl TaxRate {
    pub fn new(label: impl Into<String>, percentage: Decimal, tag: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            percentage,
            tag: tag.into(),
        }
    }
}

#[derive(Deserialize)]
struct TaxTypeRecord {
    id: i64,
    name: String,
    zone: Zone,
    rates: Vec<TaxRate>,
    #[serde(default)]
    compound: bool,
    #[serde(default)]
    display_inclusive: bool,
    #[serde(default)]
    rounding_mode: RoundingMode,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TryFrom<TaxTypeRecord> for TaxType {
    type Error = PricingError;

    fn try_from(r: TaxTypeRecord) -> Result<Self, Self::Error> {
        let tax_type = TaxType {
            id: r.id,
            name: r.name,
            zone: r.zone,
            rates: r.rates,
            compound: r.compound,
            display_inclusive: r.display_inclusive,
            rounding_mode: r.rounding_mode,
            enabled: r.enabled,
        };
        tax_type.validate()?;
        Ok(tax_type)
    }
}

/// A tax levied in a zone, with one or more rates
///
/// With `compound` set, each rate is computed on the base plus the taxes of
/// the rates before it; otherwise every rate uses the same base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "TaxTypeRecord")]
pub struct TaxType {
    pub id: i64,
    pub name: String,
    pub zone: Zone,
    pub rates: Vec<TaxRate>,
    pub compound: bool,
    /// Prices already include this tax
    pub display_inclusive: bool,
    pub rounding_mode: RoundingMode,
    pub enabled: bool,
}

impl TaxType {
    pub fn new(id: i64, name: impl Into<String>, zone: Zone, rates: Vec<TaxRate>) -> PricingResult<Self> {
        let tax_type = Self {
            id,
            name: name.into(),
            zone,
            rates,
            compound: false,
            display_inclusive: false,
            rounding_mode: RoundingMode::default(),
            enabled: true,
        };
        tax_type.validate()?;
        Ok(tax_type)
    }

    pub fn compound(mut self) -> Self {
        self.compound = true;
        self
    }

    pub fn display_inclusive(mut self) -> Self {
        self.display_inclusive = true;
        self
    }

    pub fn with_rounding_mode(mut self, mode: RoundingMode) -> Self {
        self.rounding_mode = mode;
        self
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.name.trim().is_empty() {
            return Err(PricingError::invalid_config(format!(
                "tax type {} has an empty name",
                self.id
            )));
        }
        if self.rates.is_empty() {
            return Err(PricingError::invalid_config(format!(
                "tax type '{}' has no rates",
                self.name
            )));
        }
        for rate in &self.rates {
            if rate.percentage < Decimal::ZERO || rate.percentage >= Decimal::ONE {
                return Err(PricingError::invalid_config(format!(
                    "tax rate '{}' of '{}' must be within [0, 1), got {}",
                    rate.label, self.name, rate.percentage
                )));
            }
            if rate.tag.trim().is_empty() {
                return Err(PricingError::invalid_config(format!(
                    "tax rate '{}' of '{}' has an empty tag",
                    rate.label, self.name
                )));
            }
        }
        self.zone.validate()
    }

    /// `tax:{id}:{tag}`
    pub fn source_id(&self, rate: &TaxRate) -> String {
        format!("tax:{}:{}", self.id, rate.tag)
    }
}
