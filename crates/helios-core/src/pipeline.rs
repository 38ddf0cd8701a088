//! # Pipeline Orchestrator
//!
//! Runs every applicable rule for one job and assembles the output lines.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  rules (catalog order)                                                  │
//! │     │                                                                   │
//! │     ├─ skip inactive                                                    │
//! │     ├─ skip optional      unless options.include_optional               │
//! │     ├─ skip category      not in options.category_filter                │
//! │     ├─ skip BATTERY rules when the job has no battery (always)          │
//! │     ▼                                                                   │
//! │  stable sort by priority, highest first                                 │
//! │     │                                                                   │
//! │     ▼  per rule                                                         │
//! │  resolve_quantity ──► quantity <= 0 ? drop                              │
//! │  resolve_product  ──► unit_cost × quantity ──► CalculatedAccessory      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Given the same specs, rules and options the output is identical, down to
//! line order and trace text.

use tracing::{debug, info, warn};

use crate::catalog::{RuleCatalog, RuleQuery};
use crate::error::CoreResult;
use crate::money::Money;
use crate::product::resolve_product;
use crate::quantity::resolve_quantity;
use crate::types::{AccessoryRule, CalculatedAccessory, CalculationOptions, JobSpecs, ProductInfo};

/// Computes accessory lines for a job.
///
/// The rules are not modified. Lines come out in descending priority order,
/// ties in the order the rules were given.
pub fn calculate_accessories(
    specs: &JobSpecs,
    rules: &[AccessoryRule],
    options: &CalculationOptions,
) -> Vec<CalculatedAccessory> {
    let mut applicable: Vec<&AccessoryRule> = rules
        .iter()
        .filter(|rule| is_applicable(rule, specs, options))
        .collect();

    // Vec::sort_by is stable: equal priorities keep catalog order
    applicable.sort_by(|a, b| b.priority.cmp(&a.priority));

    let lines: Vec<CalculatedAccessory> = applicable
        .into_iter()
        .filter_map(|rule| calculate_line(rule, specs))
        .collect();

    info!(
        rules = rules.len(),
        lines = lines.len(),
        panel_count = specs.panel_count,
        has_battery = specs.has_battery,
        "Accessory calculation complete"
    );

    lines
}

/// Queries a catalog with the run options and computes the lines.
pub fn calculate_from_catalog<C>(
    specs: &JobSpecs,
    catalog: &C,
    options: &CalculationOptions,
) -> CoreResult<Vec<CalculatedAccessory>>
where
    C: RuleCatalog + ?Sized,
{
    let rules = catalog.find_rules(&RuleQuery::from(options))?;
    Ok(calculate_accessories(specs, &rules, options))
}

fn is_applicable(rule: &AccessoryRule, specs: &JobSpecs, options: &CalculationOptions) -> bool {
    if !rule.is_active {
        debug!(rule_id = %rule.id, "Skipping inactive rule");
        return false;
    }
    if !options.include_optional && !rule.is_required {
        debug!(rule_id = %rule.id, "Skipping optional rule");
        return false;
    }
    if !options.allows_category(&rule.category) {
        debug!(rule_id = %rule.id, category = %rule.category, "Skipping rule outside category filter");
        return false;
    }
    if rule.is_battery_gated() && !specs.has_battery {
        debug!(rule_id = %rule.id, "Skipping battery rule, job has no battery");
        return false;
    }
    true
}

fn calculate_line(rule: &AccessoryRule, specs: &JobSpecs) -> Option<CalculatedAccessory> {
    let resolved = resolve_quantity(rule, specs);
    if resolved.quantity <= 0.0 || !resolved.quantity.is_finite() {
        debug!(
            rule_id = %rule.id,
            quantity = resolved.quantity,
            details = %resolved.details,
            "Rule resolved to no quantity"
        );
        return None;
    }

    let product = resolve_product(rule).unwrap_or_default();
    let unit_cost = usable_unit_cost(rule, &product);
    let total_cost = unit_cost
        .map(|cost| Money::line_total(cost, resolved.quantity))
        .unwrap_or_default();

    debug!(
        rule_id = %rule.id,
        quantity = resolved.quantity,
        total = %total_cost,
        "Accessory line"
    );

    Some(CalculatedAccessory {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        category: rule.category.clone(),
        product_type: rule.product_type.clone(),
        quantity: resolved.quantity,
        unit: rule.unit_label().to_string(),
        unit_cost,
        total_cost,
        supplier_product_id: product.supplier_product_id,
        supplier_id: product.supplier_id,
        supplier_name: product.supplier_name,
        brand: product.brand,
        model: product.model,
        sku: product.sku,
        notes: rule.notes.clone(),
        calculation_details: resolved.details,
    })
}

/// Unit cost of the selected product, dropped when negative or not finite.
fn usable_unit_cost(rule: &AccessoryRule, product: &ProductInfo) -> Option<f64> {
    match product.unit_cost {
        Some(cost) if cost.is_finite() && cost >= 0.0 => Some(cost),
        Some(cost) => {
            warn!(rule_id = %rule.id, unit_cost = cost, "Ignoring invalid unit cost");
            None
        }
        None => None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
