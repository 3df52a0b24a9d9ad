//! Engine configuration
//!
//! # Environment variables
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | PRICING_DEFAULT_FRACTION_DIGITS | 2 | precision for currencies the currency repository does not know |
//! | PRICING_DISCOUNT_ROUNDING | half_up | rounding mode for promotion adjustment amounts |
//! | PRICING_MAX_PROMOTIONS | 0 | cap on candidate promotions per refresh (0 = unbounded) |
//! | LOG_LEVEL | info | log filter |
//! | LOG_DIR | - | directory for daily rolling log files |
//! | LOG_JSON | false | emit JSON log lines |

use std::str::FromStr;

use shared::RoundingMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub default_fraction_digits: u32,
    pub discount_rounding: RoundingMode,
    /// 0 = unbounded
    pub max_promotions: usize,
    pub log_level: String,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_fraction_digits: 2,
            discount_rounding: RoundingMode::HalfUp,
            max_promotions: 0,
            log_level: "info".to_string(),
            log_dir: None,
            log_json: false,
        }
    }
}

impl EngineConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary key lookup (tests pass a map)
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).map(|v| v.trim().to_string());

        let discount_rounding = match parse("PRICING_DISCOUNT_ROUNDING") {
            Some(raw) => RoundingMode::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Ignoring PRICING_DISCOUNT_ROUNDING");
                defaults.discount_rounding
            }),
            None => defaults.discount_rounding,
        };

        Self {
            default_fraction_digits: parse("PRICING_DEFAULT_FRACTION_DIGITS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_fraction_digits),
            discount_rounding,
            max_promotions: parse("PRICING_MAX_PROMOTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_promotions),
            log_level: parse("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_dir: parse("LOG_DIR").filter(|v| !v.is_empty()),
            log_json: parse("LOG_JSON")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_json),
        }
    }

    pub fn with_default_fraction_digits(mut self, digits: u32) -> Self {
        self.default_fraction_digits = digits;
        self
    }

    pub fn with_discount_rounding(mut self, mode: RoundingMode) -> Self {
        self.discount_rounding = mode;
        self
    }

    pub fn with_max_promotions(mut self, max: usize) -> Self {
        self.max_promotions = max;
        self
    }
}
