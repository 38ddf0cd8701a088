//! # Aggregation
//!
//! Grouped views and totals over computed accessory lines.
//!
//! Groups borrow the lines and are keyed in first-appearance order, so a
//! grouped view renders in the same order as the pipeline output. Because
//! every line total is integer cents, the group subtotals always add up to
//! [`total_cost`] exactly.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{CalculatedAccessory, TaxRate};
use crate::NO_SUPPLIER_KEY;

/// Lines grouped under a key, in first-appearance order.
pub type Grouped<'a> = IndexMap<&'a str, Vec<&'a CalculatedAccessory>>;

/// Groups lines by supplier id; lines without a supplier go under
/// [`NO_SUPPLIER_KEY`].
pub fn group_by_supplier(lines: &[CalculatedAccessory]) -> Grouped<'_> {
    group_by(lines, |line| {
        line.supplier_id.as_deref().unwrap_or(NO_SUPPLIER_KEY)
    })
}

/// Groups lines by rule category.
pub fn group_by_category(lines: &[CalculatedAccessory]) -> Grouped<'_> {
    group_by(lines, |line| line.category.as_str())
}

fn group_by<'a, F>(lines: &'a [CalculatedAccessory], key: F) -> Grouped<'a>
where
    F: Fn(&'a CalculatedAccessory) -> &'a str,
{
    let mut groups: Grouped<'a> = IndexMap::new();
    for line in lines {
        groups.entry(key(line)).or_default().push(line);
    }
    groups
}

/// Sum of all line totals.
pub fn total_cost(lines: &[CalculatedAccessory]) -> Money {
    lines.iter().map(|line| line.total_cost).sum()
}

/// Subtotal per group, keeping group order.
pub fn group_totals(groups: &Grouped<'_>) -> IndexMap<String, Money> {
    groups
        .iter()
        .map(|(key, lines)| {
            let subtotal: Money = lines.iter().map(|line| line.total_cost).sum();
            (key.to_string(), subtotal)
        })
        .collect()
}

// =============================================================================
// Cost Summary
// =============================================================================

/// Material cost summary with tax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CostSummary {
    pub subtotal: Money,
    pub tax_rate: TaxRate,
    pub tax: Money,
    pub total: Money,
}

/// Subtotal, tax and total for a set of lines.
///
/// ## Example
/// ```rust
/// use helios_core::aggregate::summarize;
/// use helios_core::types::TaxRate;
///
/// let summary = summarize(&[], TaxRate::GST);
/// assert!(summary.total.is_zero());
/// ```
pub fn summarize(lines: &[CalculatedAccessory], tax_rate: TaxRate) -> CostSummary {
    let subtotal = total_cost(lines);
    let tax = subtotal.calculate_tax(tax_rate);
    CostSummary {
        subtotal,
        tax_rate,
        tax,
        total: subtotal + tax,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: &str, category: &str, supplier: Option<&str>, cents: i64) -> CalculatedAccessory {
        CalculatedAccessory {
            rule_id: id.into(),
            rule_name: id.into(),
            category: category.into(),
            product_type: None,
            quantity: 1.0,
            unit: "each".into(),
            unit_cost: Some(cents as f64 / 100.0),
            total_cost: Money::from_cents(cents),
            supplier_product_id: None,
            supplier_id: supplier.map(Into::into),
            supplier_name: None,
            brand: None,
            model: None,
            sku: None,
            notes: None,
            calculation_details: String::new(),
        }
    }

    fn sample() -> Vec<CalculatedAccessory> {
        vec![
            line("a", "MOUNTING", Some("sup-2"), 1099),
            line("b", "ELECTRICAL", None, 250),
            line("c", "MOUNTING", Some("sup-1"), 3),
            line("d", "ELECTRICAL", Some("sup-2"), 7680),
        ]
    }

    #[test]
    fn test_group_by_supplier_first_appearance_order() {
        let lines = sample();
        let groups = group_by_supplier(&lines);
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["sup-2", NO_SUPPLIER_KEY, "sup-1"]);
        assert_eq!(groups["sup-2"].len(), 2);
        assert_eq!(groups["sup-2"][1].rule_id, "d");
    }

    #[test]
    fn test_group_by_category() {
        let lines = sample();
        let groups = group_by_category(&lines);
        let keys: Vec<&str> = groups.keys().copied().collect();
        assert_eq!(keys, vec!["MOUNTING", "ELECTRICAL"]);
    }

    #[test]
    fn test_group_totals_partition_grand_total() {
        let lines = sample();
        let total = total_cost(&lines);
        assert_eq!(total.cents(), 9032);

        for groups in [group_by_supplier(&lines), group_by_category(&lines)] {
            let sum: Money = group_totals(&groups).values().sum();
            assert_eq!(sum, total);
            let count: usize = groups.values().map(Vec::len).sum();
            assert_eq!(count, lines.len());
        }
    }

    #[test]
    fn test_summarize_applies_gst() {
        let summary = summarize(&sample(), TaxRate::GST);
        assert_eq!(summary.subtotal.cents(), 9032);
        assert_eq!(summary.tax.cents(), 903);
        assert_eq!(summary.total.cents(), 9935);
    }

    #[test]
    fn test_empty_input() {
        assert!(group_by_supplier(&[]).is_empty());
        assert!(total_cost(&[]).is_zero());
    }
}
