//! # helios-core: Accessory Calculation Engine for Helios
//!
//! Derives the bill of materials ("accessories") for a solar installation
//! job: rail clamps, cable, conduit, isolators, battery brackets and so on,
//! from the job's physical specs and a catalog of configurable rules.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Helios Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                helios-service (host glue)                       │   │
//! │  │   EngineConfig (TOML + env) • tracing • snapshot file • reports │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ JobSpecs + RuleCatalog                 │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ helios-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────────┐   │   │
//! │  │   │ formula  │─►│ quantity │─►│ pipeline │─►│  aggregate   │   │   │
//! │  │   │  parser  │  │ resolver │  │  orders, │  │ by supplier, │   │   │
//! │  │   │  + eval  │  │  round,  │  │ filters, │  │ by category, │   │   │
//! │  │   └──────────┘  │  clamp   │  │ assembles│  │ totals, GST  │   │   │
//! │  │                 └──────────┘  └────▲─────┘  └──────────────┘   │   │
//! │  │                 ┌──────────┐       │                            │   │
//! │  │                 │ product  │───────┘                            │   │
//! │  │                 │ resolver │                                    │   │
//! │  │                 └──────────┘                                    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (JobSpecs, AccessoryRule, CalculatedAccessory)
//! - [`money`] - Integer-cent money for line totals and sums
//! - [`formula`] - Restricted arithmetic formulas over job variables
//! - [`quantity`] - Per-rule quantity resolution with a derivation trace
//! - [`product`] - Candidate product selection
//! - [`pipeline`] - Filters, orders and runs the rules for a job
//! - [`aggregate`] - Grouped views, totals and the cost summary
//! - [`catalog`] - Rule catalog read interface and snapshot records
//! - [`validation`] - Job spec and rule validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: same specs + same catalog = identical output, line order included
//! 2. **Never Fatal**: a bad rule becomes "no line" and a `tracing` warning
//! 3. **Closed Formulas**: formulas only see four job variables and five functions
//! 4. **Integer Money**: line totals are cents, so grouped subtotals add up exactly
//!
//! ## Example Usage
//!
//! ```rust
//! use helios_core::{calculate_accessories, AccessoryRule, Calculation, CalculationOptions, JobSpecs};
//!
//! let rule = AccessoryRule {
//!     id: "mid-clamps".into(),
//!     name: "Mid clamps".into(),
//!     category: "MOUNTING".into(),
//!     product_type: None,
//!     calculation: Calculation::Formula { expression: "CEIL(panelCount / 4)".into() },
//!     base_quantity: 0.0,
//!     round_up: true,
//!     min_quantity: 0.0,
//!     max_quantity: None,
//!     is_required: true,
//!     is_active: true,
//!     priority: 0,
//!     unit: None,
//!     notes: None,
//!     candidates: vec![],
//! };
//!
//! let lines = calculate_accessories(
//!     &JobSpecs::new(8.8, 21),
//!     &[rule],
//!     &CalculationOptions::required_only(),
//! );
//! assert_eq!(lines[0].quantity, 6.0);
//! assert_eq!(lines[0].unit, "each");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregate;
pub mod catalog;
pub mod error;
pub mod formula;
pub mod money;
pub mod pipeline;
pub mod product;
pub mod quantity;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use aggregate::{group_by_category, group_by_supplier, group_totals, summarize, total_cost, CostSummary};
pub use catalog::{InMemoryCatalog, RuleCatalog, RuleQuery};
pub use error::{CoreError, CoreResult, FormulaError, ValidationError};
pub use formula::MAX_FORMULA_LEN;
pub use money::Money;
pub use pipeline::{calculate_accessories, calculate_from_catalog};
pub use product::resolve_product;
pub use quantity::{resolve_quantity, QuantityResolution};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Product type that restricts a rule to jobs with battery storage.
pub const BATTERY_PRODUCT_TYPE: &str = "BATTERY";

/// Unit label used when a rule does not configure one.
pub const DEFAULT_UNIT: &str = "each";

/// Group key for lines without a supplier in [`group_by_supplier`].
pub const NO_SUPPLIER_KEY: &str = "NO_SUPPLIER";
