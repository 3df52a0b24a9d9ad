//! Pricing Engine - order pricing and promotion adjustments
//!
//! # Overview
//!
//! Given an order, decides which discounts and taxes apply, in what
//! combination, and derives the final total. Everything is synchronous and
//! in-memory; records come in through the collaborator traits in
//! [`repository`].
//!
//! # Module layout
//!
//! ```text
//! pricing-engine/src/
//! ├── conditions/    # condition leaves, AND/OR groups
//! ├── zone.rs        # territory matching for tax zones
//! ├── availability/  # checker chain, last non-neutral verdict wins
//! ├── promotions/    # offers, promotions, coupons, usage recording
//! ├── tax/           # tax types and rate resolution
//! ├── adjustments.rs # combined-by-type view, grand total
//! ├── refresh.rs     # Dirty → Refreshing → Clean orchestration
//! ├── repository/    # collaborator traits + in-memory stores
//! ├── scenario.rs    # JSON scenario files for the binary
//! ├── config.rs      # EngineConfig from the environment
//! └── utils/         # logging setup
//! ```

pub mod adjustments;
pub mod availability;
pub mod conditions;
pub mod config;
pub mod context;
pub mod promotions;
pub mod refresh;
pub mod repository;
pub mod scenario;
pub mod tax;
pub mod utils;
pub mod zone;

// Re-export public types
pub use adjustments::{OrderTotalSummary, TypeTotal, combine_by_type, grand_total};
pub use availability::{Availability, AvailabilityChecker, AvailabilityManager};
pub use conditions::{Condition, ConditionGroup, ConditionKind, ConditionOperator};
pub use config::EngineConfig;
pub use context::EvaluationContext;
pub use promotions::{CouponError, CouponRedeemer, Offer, OfferSpec, Promotion, UsageRecorder};
pub use refresh::{OrderRefresher, RefreshReport, UnavailableItem};
pub use repository::Repositories;
pub use scenario::{RecordKind, Scenario, ScenarioError, ScenarioOutcome, SkippedRecord};
pub use tax::{TaxRate, TaxResolver, TaxType};
pub use zone::{Zone, ZoneTerritory};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_from_config, init_logger_with_file};
