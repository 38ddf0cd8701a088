//! # Quantity Resolver
//!
//! Turns one rule plus the job specs into a concrete quantity and a
//! derivation trace an auditor can follow without re-running anything.
//!
//! ## Resolution Steps
//! ```text
//! AccessoryRule.calculation
//!      │
//!      ├── Fixed       base
//!      ├── PerPanel    panels × multiplier + base
//!      ├── PerKw       kW × multiplier + base
//!      ├── PerBattery  kWh × multiplier + base    (no battery → 0, stop)
//!      ├── Formula     evaluate(expression)        (failure → 0, stop)
//!      └── Unrecognized                            (always 0, stop)
//!      │
//!      ▼
//! raw value ──► round (ceil if round_up && raw > 0, else nearest)
//!      │
//!      ▼
//! clamp to min_quantity, then to max_quantity
//! ```
//!
//! A rule that fails or does not apply stops at zero before rounding and
//! clamping, so it can never be inflated to `min_quantity`.

use serde::Serialize;
use tracing::warn;

use crate::formula::{self, round_half_up, FormulaVariables};
use crate::types::{AccessoryRule, Calculation, JobSpecs};

/// Details string for per-battery rules on a job without a battery.
pub const NO_BATTERY_DETAILS: &str = "No battery in system";

/// Result of resolving a rule's quantity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityResolution {
    pub quantity: f64,
    /// Human-readable derivation trace.
    pub details: String,
}

impl QuantityResolution {
    fn zero(details: impl Into<String>) -> Self {
        QuantityResolution {
            quantity: 0.0,
            details: details.into(),
        }
    }
}

/// Outcome of the strategy step, before rounding and clamping.
enum Raw {
    Value { value: f64, trace: String },
    Stop(QuantityResolution),
}

/// Resolves the quantity for a rule against job specs.
///
/// Never fails; problems resolve to a zero quantity with a trace that says
/// why.
///
/// ## Example
/// ```rust
/// use helios_core::quantity::resolve_quantity;
/// use helios_core::types::{AccessoryRule, Calculation, JobSpecs};
/// # fn rule(calculation: Calculation) -> AccessoryRule {
/// #     AccessoryRule {
/// #         id: "r1".into(), name: "Rail clamps".into(), category: "MOUNTING".into(),
/// #         product_type: None, calculation, base_quantity: 4.0, round_up: true,
/// #         min_quantity: 0.0, max_quantity: None, is_required: true, is_active: true,
/// #         priority: 0, unit: None, notes: None, candidates: vec![],
/// #     }
/// # }
///
/// let rule = rule(Calculation::PerPanel { multiplier: 1.0 });
/// let resolved = resolve_quantity(&rule, &JobSpecs::new(8.0, 20));
/// assert_eq!(resolved.quantity, 24.0);
/// ```
pub fn resolve_quantity(rule: &AccessoryRule, specs: &JobSpecs) -> QuantityResolution {
    let (raw, trace) = match raw_quantity(rule, specs) {
        Raw::Value { value, trace } => (value, trace),
        Raw::Stop(resolution) => return resolution,
    };

    let mut details = trace;

    let mut quantity = if rule.round_up && raw > 0.0 {
        let rounded = raw.ceil();
        if rounded != raw {
            details.push_str(&format!(", rounded up to {}", fmt_num(rounded)));
        }
        rounded
    } else {
        let rounded = round_half_up(raw);
        if rounded != raw {
            details.push_str(&format!(", rounded to {}", fmt_num(rounded)));
        }
        rounded
    };

    if quantity < rule.min_quantity {
        details.push_str(&format!(
            " (min {} applied, was {})",
            fmt_num(rule.min_quantity),
            fmt_num(quantity)
        ));
        quantity = rule.min_quantity;
    }

    if let Some(max) = rule.max_quantity {
        if quantity > max {
            details.push_str(&format!(
                " (max {} applied, was {})",
                fmt_num(max),
                fmt_num(quantity)
            ));
            quantity = max;
        }
    }

    QuantityResolution { quantity, details }
}

fn raw_quantity(rule: &AccessoryRule, specs: &JobSpecs) -> Raw {
    let base = rule.base_quantity;

    match &rule.calculation {
        Calculation::Fixed => Raw::Value {
            value: base,
            trace: format!("Fixed quantity: {}", fmt_num(base)),
        },

        Calculation::PerPanel { multiplier } => {
            let panels = f64::from(specs.panel_count);
            let value = panels * multiplier + base;
            Raw::Value {
                value,
                trace: format!(
                    "{} panels × {} + {} = {}",
                    specs.panel_count,
                    fmt_num(*multiplier),
                    fmt_num(base),
                    fmt_num(value)
                ),
            }
        }

        Calculation::PerKw { multiplier } => {
            let value = specs.system_size_kw * multiplier + base;
            Raw::Value {
                value,
                trace: format!(
                    "{}kW × {} + {} = {}",
                    fmt_num(specs.system_size_kw),
                    fmt_num(*multiplier),
                    fmt_num(base),
                    fmt_num(value)
                ),
            }
        }

        Calculation::PerBattery { multiplier } => match specs.usable_battery_capacity() {
            Some(capacity) => {
                let value = capacity * multiplier + base;
                Raw::Value {
                    value,
                    trace: format!(
                        "{}kWh × {} + {} = {}",
                        fmt_num(capacity),
                        fmt_num(*multiplier),
                        fmt_num(base),
                        fmt_num(value)
                    ),
                }
            }
            None => Raw::Stop(QuantityResolution::zero(NO_BATTERY_DETAILS)),
        },

        Calculation::Formula { expression } => {
            if expression.trim().is_empty() {
                return Raw::Stop(QuantityResolution::zero("Formula missing, quantity 0"));
            }
            let vars = FormulaVariables::from_specs(specs);
            let evaluated = formula::parse(expression)
                .and_then(|expr| Ok((expr.evaluate(&vars)?, expr.variables())));
            match evaluated {
                Ok((value, used)) => {
                    let mut trace = format!("Formula: {} = {}", expression, fmt_num(value));
                    if !used.is_empty() {
                        let bindings: Vec<String> = used
                            .iter()
                            .map(|v| format!("{}={}", v.name(), fmt_num(vars.get(*v))))
                            .collect();
                        trace.push_str(&format!(" ({})", bindings.join(", ")));
                    }
                    Raw::Value { value, trace }
                }
                Err(error) => {
                    warn!(
                        rule_id = %rule.id,
                        formula = %expression,
                        error = %error,
                        "Formula evaluation failed, rule resolves to 0"
                    );
                    Raw::Stop(QuantityResolution::zero(format!(
                        "Formula error in '{}': {}, quantity 0",
                        expression, error
                    )))
                }
            }
        }

        Calculation::Unrecognized { tag } => {
            warn!(rule_id = %rule.id, calculation_type = %tag, "Unknown calculation type, rule skipped");
            Raw::Stop(QuantityResolution::zero(format!(
                "Unknown calculation type: {}",
                tag
            )))
        }
    }
}

/// Formats a number for traces: integers without a fraction, others as-is.
fn fmt_num(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
