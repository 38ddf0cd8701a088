//! # Product Resolver
//!
//! Picks the concrete product for a rule.
//!
//! ```text
//! candidates ──► first with is_primary ──► else first in catalog order ──► else None
//!                        │
//!                        ▼
//!          Supplier(..) → fields from the supplier product
//!          Direct {..}  → fields from the candidate itself
//! ```

use crate::types::{AccessoryRule, CandidateProduct, ProductInfo, ProductSource};

/// Selects the product for a rule, `None` when it has no candidates.
pub fn resolve_product(rule: &AccessoryRule) -> Option<ProductInfo> {
    select_candidate(&rule.candidates).map(ProductInfo::from)
}

fn select_candidate(candidates: &[CandidateProduct]) -> Option<&CandidateProduct> {
    candidates
        .iter()
        .find(|c| c.is_primary)
        .or_else(|| candidates.first())
}

impl From<&CandidateProduct> for ProductInfo {
    fn from(candidate: &CandidateProduct) -> Self {
        match &candidate.source {
            ProductSource::Supplier(product) => ProductInfo {
                supplier_product_id: Some(product.id.clone()),
                supplier_id: Some(product.supplier_id.clone()),
                supplier_name: Some(product.supplier_name.clone()),
                unit_cost: product.unit_cost,
                brand: product.brand.clone(),
                model: product.model.clone(),
                sku: product.sku.clone(),
            },
            ProductSource::Direct {
                unit_cost,
                brand,
                model,
                sku,
            } => ProductInfo {
                unit_cost: *unit_cost,
                brand: brand.clone(),
                model: model.clone(),
                sku: sku.clone(),
                ..ProductInfo::default()
            },
        }
    }
}
