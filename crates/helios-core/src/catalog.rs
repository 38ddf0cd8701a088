//! # Rule Catalog
//!
//! Read-only access to accessory rules.
//!
//! ## Where Rules Come From
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐     ┌──────────────┐
//! │  catalog snapshot    │     │   CatalogRule DTOs   │     │ AccessoryRule│
//! │  (JSON, flat shape)  │ ──► │  calculation_type,   │ ──► │ calculation: │
//! │                      │     │  multiplier, formula │     │ Calculation  │
//! └──────────────────────┘     └──────────────────────┘     └──────┬───────┘
//!                                                                  │
//!                               RuleCatalog::find_rules(query) ◄───┘
//!                               active only, filtered by query
//! ```
//!
//! Storage and editing of the catalog live elsewhere; the engine only reads
//! a materialised snapshot.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CoreResult;
use crate::types::{
    AccessoryRule, Calculation, CalculationOptions, CandidateProduct, ProductSource,
    SupplierProduct,
};
use crate::validation::validate_catalog;

// =============================================================================
// Query + Trait
// =============================================================================

/// Which rules a caller wants.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleQuery {
    /// Only rules flagged `is_required`.
    pub required_only: bool,
    /// Only rules in these categories.
    pub categories: Option<Vec<String>>,
}

impl From<&CalculationOptions> for RuleQuery {
    fn from(options: &CalculationOptions) -> Self {
        RuleQuery {
            required_only: !options.include_optional,
            categories: options.category_filter.clone(),
        }
    }
}

impl RuleQuery {
    fn matches(&self, rule: &AccessoryRule) -> bool {
        if !rule.is_active {
            return false;
        }
        if self.required_only && !rule.is_required {
            return false;
        }
        match &self.categories {
            Some(categories) => categories.iter().any(|c| *c == rule.category),
            None => true,
        }
    }
}

/// Read interface over a rule catalog.
///
/// Implementations return active rules only, in catalog order.
pub trait RuleCatalog {
    fn find_rules(&self, query: &RuleQuery) -> CoreResult<Vec<AccessoryRule>>;
}

// =============================================================================
// In-Memory Catalog
// =============================================================================

/// A catalog snapshot held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    rules: Vec<AccessoryRule>,
}

impl InMemoryCatalog {
    /// Wraps rules as-is. Validation problems are logged, rules are kept.
    pub fn from_rules(rules: Vec<AccessoryRule>) -> Self {
        if let Err(errors) = validate_catalog(&rules) {
            for error in &errors {
                warn!(error = %error, "Catalog rule failed validation");
            }
        }
        debug!(rules = rules.len(), "Catalog snapshot loaded");
        InMemoryCatalog { rules }
    }

    /// Decodes a JSON snapshot (an array of [`CatalogRule`]).
    pub fn from_json(json: &str) -> CoreResult<Self> {
        let records: Vec<CatalogRule> = serde_json::from_str(json)?;
        Ok(Self::from_rules(
            records.into_iter().map(AccessoryRule::from).collect(),
        ))
    }

    pub fn rules(&self) -> &[AccessoryRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl RuleCatalog for InMemoryCatalog {
    fn find_rules(&self, query: &RuleQuery) -> CoreResult<Vec<AccessoryRule>> {
        Ok(self
            .rules
            .iter()
            .filter(|rule| query.matches(rule))
            .cloned()
            .collect())
    }
}

// =============================================================================
// Snapshot Records
// =============================================================================

fn default_multiplier() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

/// A rule as stored in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRule {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub product_type: Option<String>,
    /// `FIXED`, `PER_PANEL`, `PER_KW`, `PER_BATTERY` or `FORMULA`.
    pub calculation_type: String,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub formula: Option<String>,
    #[serde(default)]
    pub base_quantity: f64,
    #[serde(default)]
    pub round_up: bool,
    #[serde(default)]
    pub min_quantity: f64,
    #[serde(default)]
    pub max_quantity: Option<f64>,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub products: Vec<CatalogCandidate>,
}

/// A candidate product as stored in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogCandidate {
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    /// When present, every cost and identity field comes from here.
    #[serde(default)]
    pub supplier_product: Option<CatalogSupplierProduct>,
}

/// A supplier price-list entry as stored in a catalog snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSupplierProduct {
    pub id: String,
    pub supplier_id: String,
    pub supplier_name: String,
    #[serde(default)]
    pub unit_cost: Option<f64>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
}

impl From<CatalogSupplierProduct> for SupplierProduct {
    fn from(p: CatalogSupplierProduct) -> Self {
        SupplierProduct {
            id: p.id,
            supplier_id: p.supplier_id,
            supplier_name: p.supplier_name,
            unit_cost: p.unit_cost,
            brand: p.brand,
            model: p.model,
            sku: p.sku,
        }
    }
}

impl From<CatalogCandidate> for CandidateProduct {
    fn from(c: CatalogCandidate) -> Self {
        let source = match c.supplier_product {
            Some(product) => ProductSource::Supplier(product.into()),
            None => ProductSource::Direct {
                unit_cost: c.unit_cost,
                brand: c.brand,
                model: c.model,
                sku: c.sku,
            },
        };
        CandidateProduct {
            is_primary: c.is_primary,
            source,
        }
    }
}

impl From<CatalogRule> for AccessoryRule {
    fn from(r: CatalogRule) -> Self {
        AccessoryRule {
            calculation: Calculation::from_tag(&r.calculation_type, r.multiplier, r.formula),
            id: r.id,
            name: r.name,
            category: r.category,
            product_type: r.product_type,
            base_quantity: r.base_quantity,
            round_up: r.round_up,
            min_quantity: r.min_quantity,
            max_quantity: r.max_quantity,
            is_required: r.is_required,
            is_active: r.is_active,
            priority: r.priority,
            unit: r.unit,
            notes: r.notes,
            candidates: r.products.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;

    const SNAPSHOT: &str = r#"[
        {
            "id": "rail-clamps",
            "name": "Rail end clamps",
            "category": "MOUNTING",
            "calculation_type": "PER_PANEL",
            "multiplier": 2,
            "base_quantity": 4,
            "round_up": true,
            "is_required": true,
            "priority": 10,
            "products": [
                { "unit_cost": 1.1, "sku": "EC-1" },
                {
                    "is_primary": true,
                    "supplier_product": {
                        "id": "sp-1", "supplier_id": "sup-1",
                        "supplier_name": "Sun Wholesale", "unit_cost": 0.95
                    }
                }
            ]
        },
        {
            "id": "conduit",
            "name": "Conduit",
            "category": "ELECTRICAL",
            "calculation_type": "FORMULA",
            "formula": "CEIL(systemSize * 2)",
            "unit": "m"
        },
        {
            "id": "legacy",
            "name": "Legacy rule",
            "category": "MOUNTING",
            "calculation_type": "FIXED",
            "is_required": true,
            "is_active": false
        }
    ]"#;

    #[test]
    fn test_snapshot_decoding_applies_defaults() {
        let catalog = InMemoryCatalog::from_json(SNAPSHOT).unwrap();
        assert_eq!(catalog.len(), 3);

        let rails = &catalog.rules()[0];
        assert_eq!(rails.calculation, Calculation::PerPanel { multiplier: 2.0 });
        assert_eq!(rails.candidates.len(), 2);
        assert!(matches!(
            rails.candidates[1].source,
            ProductSource::Supplier(ref p) if p.supplier_id == "sup-1"
        ));

        let conduit = &catalog.rules()[1];
        assert!(conduit.is_active);
        assert!(!conduit.is_required);
        assert_eq!(conduit.min_quantity, 0.0);
        assert_eq!(conduit.unit.as_deref(), Some("m"));
    }

    #[test]
    fn test_find_rules_filters() {
        let catalog = InMemoryCatalog::from_json(SNAPSHOT).unwrap();

        let all = catalog
            .find_rules(&RuleQuery::default())
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["rail-clamps", "conduit"]);

        let required = catalog
            .find_rules(&RuleQuery {
                required_only: true,
                categories: None,
            })
            .unwrap();
        assert_eq!(required.len(), 1);

        let electrical = catalog
            .find_rules(&RuleQuery {
                required_only: false,
                categories: Some(vec!["ELECTRICAL".into()]),
            })
            .unwrap();
        assert_eq!(electrical[0].id, "conduit");
    }

    #[test]
    fn test_query_from_options() {
        let query = RuleQuery::from(&CalculationOptions::required_only());
        assert!(query.required_only);
        let query = RuleQuery::from(&CalculationOptions::all_rules().with_categories(["MOUNTING"]));
        assert!(!query.required_only);
        assert_eq!(query.categories, Some(vec!["MOUNTING".to_string()]));
    }

    #[test]
    fn test_unknown_tag_is_kept() {
        let json = r#"[{ "id": "x", "name": "X", "category": "MISC", "calculation_type": "PER_METRE" }]"#;
        let catalog = InMemoryCatalog::from_json(json).unwrap();
        assert_eq!(
            catalog.rules()[0].calculation,
            Calculation::Unrecognized {
                tag: "PER_METRE".into()
            }
        );
    }

    #[test]
    fn test_malformed_json() {
        let err = InMemoryCatalog::from_json("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::Catalog(_)));
    }
}
