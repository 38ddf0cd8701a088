//! # Domain Types
//!
//! Core domain types used throughout Helios.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUT                                                                  │
//! │  ┌─────────────────┐   ┌─────────────────────────────────────────┐     │
//! │  │    JobSpecs     │   │             AccessoryRule               │     │
//! │  │  ─────────────  │   │  ─────────────────────────────────────  │     │
//! │  │  system_size_kw │   │  id, name, category, product_type       │     │
//! │  │  panel_count    │   │  calculation: Calculation ──────────┐   │     │
//! │  │  battery_kwh    │   │  base / min / max / round_up        │   │     │
//! │  │  has_battery    │   │  candidates: Vec<CandidateProduct>  │   │     │
//! │  └─────────────────┘   └─────────────────────────────────────┼───┘     │
//! │                                                              ▼         │
//! │                        Fixed | PerPanel | PerKw | PerBattery | Formula │
//! │                                                                         │
//! │  OUTPUT                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │ CalculatedAccessory  quantity, unit, unit_cost, total_cost,     │   │
//! │  │                      supplier/brand/model/sku, details trace    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything here is constructed fresh per invocation and never mutated
//! by the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1000 bps = 10% (Australian GST).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Goods and services tax applied to material costs.
    pub const GST: TaxRate = TaxRate(1000);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Default for TaxRate {
    fn default() -> Self {
        TaxRate::GST
    }
}

// =============================================================================
// Job Specs
// =============================================================================

/// Physical specification of a solar installation job.
///
/// Plain value object: no identity, supplied by the caller from job/quote
/// data maintained elsewhere.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct JobSpecs {
    /// System size in kW.
    pub system_size_kw: f64,

    /// Number of PV modules.
    pub panel_count: u32,

    /// Battery capacity in kWh, when a battery is part of the job.
    #[serde(default)]
    pub battery_capacity_kwh: Option<f64>,

    /// Whether the job includes battery storage.
    #[serde(default)]
    pub has_battery: bool,

    #[serde(default)]
    pub inverter_type: Option<String>,

    #[serde(default)]
    pub roof_type: Option<String>,

    #[serde(default)]
    pub is_ground_mount: Option<bool>,

    #[serde(default)]
    pub stories: Option<u32>,
}

impl JobSpecs {
    /// Creates specs for a panel-only system.
    pub fn new(system_size_kw: f64, panel_count: u32) -> Self {
        JobSpecs {
            system_size_kw,
            panel_count,
            battery_capacity_kwh: None,
            has_battery: false,
            inverter_type: None,
            roof_type: None,
            is_ground_mount: None,
            stories: None,
        }
    }

    /// Adds a battery of the given capacity.
    pub fn with_battery(mut self, capacity_kwh: f64) -> Self {
        self.has_battery = true;
        self.battery_capacity_kwh = Some(capacity_kwh);
        self
    }

    /// Battery capacity usable by per-battery rules.
    ///
    /// Only present when the job has a battery AND a capacity is recorded.
    pub fn usable_battery_capacity(&self) -> Option<f64> {
        if self.has_battery {
            self.battery_capacity_kwh
        } else {
            None
        }
    }
}

// =============================================================================
// Calculation Strategy
// =============================================================================

/// The catalog tag naming a calculation strategy.
///
/// Catalog records carry the tag as a string (`"PER_PANEL"` etc.);
/// [`Calculation`] is the strategy with its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CalculationType {
    Fixed,
    PerPanel,
    PerKw,
    PerBattery,
    Formula,
}

impl CalculationType {
    /// Catalog tag for this strategy.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CalculationType::Fixed => "FIXED",
            CalculationType::PerPanel => "PER_PANEL",
            CalculationType::PerKw => "PER_KW",
            CalculationType::PerBattery => "PER_BATTERY",
            CalculationType::Formula => "FORMULA",
        }
    }
}

impl fmt::Display for CalculationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CalculationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "FIXED" => Ok(CalculationType::Fixed),
            "PER_PANEL" => Ok(CalculationType::PerPanel),
            "PER_KW" => Ok(CalculationType::PerKw),
            "PER_BATTERY" => Ok(CalculationType::PerBattery),
            "FORMULA" => Ok(CalculationType::Formula),
            _ => Err(ValidationError::UnknownCalculationType(s.to_string())),
        }
    }
}

/// How a rule derives its raw quantity.
///
/// Each strategy carries only the data it needs: a multiplier for the
/// per-unit strategies, an expression for formulas. `Unrecognized` keeps
/// catalog tags this engine does not know so the rule can be reported and
/// skipped instead of breaking the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Calculation {
    /// quantity = base_quantity
    Fixed,
    /// quantity = panel_count × multiplier + base_quantity
    PerPanel { multiplier: f64 },
    /// quantity = system_size_kw × multiplier + base_quantity
    PerKw { multiplier: f64 },
    /// quantity = battery_capacity_kwh × multiplier + base_quantity
    PerBattery { multiplier: f64 },
    /// quantity = formula result
    Formula { expression: String },
    /// Catalog tag not understood by this engine.
    Unrecognized { tag: String },
}

impl Calculation {
    /// Builds the strategy for a catalog tag.
    ///
    /// `multiplier` is ignored by `Fixed`/`Formula`, `formula` by everything
    /// except `Formula`. A formula rule without an expression keeps an empty
    /// expression and resolves to zero.
    pub fn from_tag(tag: &str, multiplier: f64, formula: Option<String>) -> Self {
        match tag.parse::<CalculationType>() {
            Ok(CalculationType::Fixed) => Calculation::Fixed,
            Ok(CalculationType::PerPanel) => Calculation::PerPanel { multiplier },
            Ok(CalculationType::PerKw) => Calculation::PerKw { multiplier },
            Ok(CalculationType::PerBattery) => Calculation::PerBattery { multiplier },
            Ok(CalculationType::Formula) => Calculation::Formula {
                expression: formula.unwrap_or_default(),
            },
            Err(_) => Calculation::Unrecognized {
                tag: tag.to_string(),
            },
        }
    }
}

// =============================================================================
// Products
// =============================================================================

/// A product from a supplier's price list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierProduct {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    /// Unit cost in dollars (may be sub-cent).
    pub unit_cost: Option<f64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
}

/// Where a candidate's cost and identity come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ProductSource {
    /// Cost/brand/model/SKU recorded directly on the rule candidate.
    Direct {
        unit_cost: Option<f64>,
        brand: Option<String>,
        model: Option<String>,
        sku: Option<String>,
    },
    /// Linked to a supplier catalog entry.
    Supplier(SupplierProduct),
}

/// A possible concrete product for a rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateProduct {
    pub is_primary: bool,
    pub source: ProductSource,
}

/// Cost and identity fields extracted from the selected candidate.
///
/// Every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInfo {
    pub supplier_product_id: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub unit_cost: Option<f64>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
}

// =============================================================================
// Accessory Rule
// =============================================================================

/// A catalog rule describing how to derive one accessory line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessoryRule {
    pub id: String,
    pub name: String,
    /// Grouping label (e.g. "MOUNTING", "ELECTRICAL").
    pub category: String,
    /// Applicability tag; `"BATTERY"` gates the rule on battery presence.
    pub product_type: Option<String>,
    pub calculation: Calculation,
    pub base_quantity: f64,
    pub round_up: bool,
    pub min_quantity: f64,
    pub max_quantity: Option<f64>,
    pub is_required: bool,
    pub is_active: bool,
    /// Higher is evaluated first.
    pub priority: i32,
    /// Unit label for the output line, `"each"` when absent.
    pub unit: Option<String>,
    pub notes: Option<String>,
    /// Candidate products in catalog order.
    pub candidates: Vec<CandidateProduct>,
}

impl AccessoryRule {
    /// Whether this rule only applies to jobs with battery storage.
    pub fn is_battery_gated(&self) -> bool {
        self.product_type.as_deref() == Some(crate::BATTERY_PRODUCT_TYPE)
    }

    /// Unit label for output lines.
    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().unwrap_or(crate::DEFAULT_UNIT)
    }
}

// =============================================================================
// Calculation Options
// =============================================================================

/// Caller-controlled filters for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculationOptions {
    /// Include rules not flagged `is_required`.
    #[serde(default)]
    pub include_optional: bool,

    /// Only evaluate rules in these categories.
    #[serde(default)]
    pub category_filter: Option<Vec<String>>,
}

impl CalculationOptions {
    /// Required rules only, all categories.
    pub fn required_only() -> Self {
        Self::default()
    }

    /// Required and optional rules, all categories.
    pub fn all_rules() -> Self {
        CalculationOptions {
            include_optional: true,
            category_filter: None,
        }
    }

    /// Restricts the run to the given categories.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_filter = Some(categories.into_iter().map(Into::into).collect());
        self
    }

    /// Whether a category passes the filter.
    pub fn allows_category(&self, category: &str) -> bool {
        match &self.category_filter {
            Some(categories) => categories.iter().any(|c| c == category),
            None => true,
        }
    }
}

// =============================================================================
// Calculated Accessory
// =============================================================================

/// One computed accessory line.
///
/// Only produced for rules whose resolved quantity is greater than zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculatedAccessory {
    pub rule_id: String,
    pub rule_name: String,
    pub category: String,
    pub product_type: Option<String>,
    pub quantity: f64,
    pub unit: String,
    /// Unit cost in dollars from the selected product.
    pub unit_cost: Option<f64>,
    /// unit_cost × quantity in cents, zero when unit_cost is absent.
    pub total_cost: Money,
    pub supplier_product_id: Option<String>,
    pub supplier_id: Option<String>,
    pub supplier_name: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub sku: Option<String>,
    pub notes: Option<String>,
    /// Human-readable derivation trace.
    pub calculation_details: String,
}

impl CalculatedAccessory {
    /// Whether a product with a cost was found for this line.
    pub fn is_costed(&self) -> bool {
        self.unit_cost.is_some()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
