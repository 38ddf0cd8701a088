//! # Accessory Service
//!
//! Wraps the engine with configuration and report assembly.
//!
//! ## Report Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  JobSpecs                                                               │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  calculate_from_catalog(specs, catalog, config.options())               │
//! │     │                                                                   │
//! │     ├──► lines                                                          │
//! │     ├──► group_totals(group_by_supplier)   → supplier_totals            │
//! │     ├──► group_totals(group_by_category)   → category_totals            │
//! │     └──► summarize(lines, config.tax_rate) → summary                    │
//! │                                                                         │
//! │  + report_id (UUID v4) + generated_at (UTC)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The report id and timestamp are the only non-deterministic fields; the
//! engine output inside a report matches a direct engine call.

use chrono::{DateTime, Utc};
use helios_core::aggregate::{group_by_category, group_by_supplier, group_totals, summarize};
use helios_core::{
    calculate_from_catalog, CalculatedAccessory, CalculationOptions, CostSummary,
    InMemoryCatalog, JobSpecs, Money, RuleCatalog,
};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{ServiceError, ServiceResult};
use crate::snapshot::load_catalog_snapshot;

/// Output of one calculation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccessoryReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub specs: JobSpecs,
    pub lines: Vec<CalculatedAccessory>,
    /// Subtotal per supplier id, `NO_SUPPLIER` for unlinked lines.
    pub supplier_totals: IndexMap<String, Money>,
    pub category_totals: IndexMap<String, Money>,
    pub summary: CostSummary,
}

impl AccessoryReport {
    /// Lines without a usable unit cost.
    pub fn uncosted_lines(&self) -> impl Iterator<Item = &CalculatedAccessory> {
        self.lines.iter().filter(|line| !line.is_costed())
    }
}

/// Runs accessory calculations against a catalog with configured defaults.
#[derive(Debug)]
pub struct AccessoryService<C = InMemoryCatalog> {
    config: EngineConfig,
    catalog: C,
}

impl AccessoryService<InMemoryCatalog> {
    /// Builds the service from config, loading the configured snapshot.
    pub fn from_config(config: EngineConfig) -> ServiceResult<Self> {
        let path = config.catalog_path().ok_or(ServiceError::MissingCatalog)?;
        let catalog = load_catalog_snapshot(path)?;
        Ok(Self::new(config, catalog))
    }
}

impl<C: RuleCatalog> AccessoryService<C> {
    pub fn new(config: EngineConfig, catalog: C) -> Self {
        AccessoryService { config, catalog }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Calculates a report with the configured options.
    pub fn calculate(&self, specs: &JobSpecs) -> ServiceResult<AccessoryReport> {
        self.calculate_with(specs, &self.config.options())
    }

    /// Calculates a report with explicit options.
    pub fn calculate_with(
        &self,
        specs: &JobSpecs,
        options: &CalculationOptions,
    ) -> ServiceResult<AccessoryReport> {
        let lines = calculate_from_catalog(specs, &self.catalog, options)?;

        let supplier_totals = group_totals(&group_by_supplier(&lines));
        let category_totals = group_totals(&group_by_category(&lines));
        let summary = summarize(&lines, self.config.tax_rate());

        let report = AccessoryReport {
            report_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            specs: specs.clone(),
            lines,
            supplier_totals,
            category_totals,
            summary,
        };

        info!(
            report_id = %report.report_id,
            lines = report.lines.len(),
            total = %report.summary.total,
            "Accessory report generated"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_core::calculate_accessories;

    const SNAPSHOT: &str = r#"[
        {
            "id": "rail-end-clamps", "name": "Rail end clamps", "category": "MOUNTING",
            "calculation_type": "PER_PANEL", "multiplier": 1, "base_quantity": 4,
            "round_up": true, "is_required": true, "priority": 100,
            "products": [{ "supplier_product": {
                "id": "sp-1", "supplier_id": "sup-rails", "supplier_name": "Rail Co",
                "unit_cost": 3.2 } }]
        },
        {
            "id": "isolator", "name": "DC isolator", "category": "ELECTRICAL",
            "calculation_type": "FIXED", "base_quantity": 2, "is_required": true,
            "priority": 50, "products": [{ "unit_cost": 45.0 }]
        },
        {
            "id": "labels", "name": "Warning labels", "category": "ELECTRICAL",
            "calculation_type": "FIXED", "base_quantity": 1, "is_required": false
        }
    ]"#;

    fn service(config: EngineConfig) -> AccessoryService {
        AccessoryService::new(config, InMemoryCatalog::from_json(SNAPSHOT).unwrap())
    }

    #[test]
    fn test_report_totals() {
        let report = service(EngineConfig::default())
            .calculate(&JobSpecs::new(8.0, 20))
            .unwrap();

        assert_eq!(report.lines.len(), 2);
        assert_eq!(report.supplier_totals["sup-rails"].cents(), 7680);
        assert_eq!(report.supplier_totals["NO_SUPPLIER"].cents(), 9000);
        assert_eq!(report.category_totals["MOUNTING"].cents(), 7680);
        assert_eq!(report.summary.subtotal.cents(), 16680);
        assert_eq!(report.summary.tax.cents(), 1668);
        assert_eq!(report.summary.total.cents(), 18348);
        assert_eq!(report.uncosted_lines().count(), 0);
    }

    #[test]
    fn test_report_matches_engine_output() {
        let svc = service(EngineConfig::default());
        let specs = JobSpecs::new(8.0, 20);
        let report = svc.calculate(&specs).unwrap();

        let direct = calculate_accessories(
            &specs,
            svc.catalog().rules(),
            &CalculationOptions::required_only(),
        );
        assert_eq!(report.lines, direct);
    }

    #[test]
    fn test_configured_options_apply() {
        let mut config = EngineConfig::default();
        config.calculation.include_optional = true;
        config.tax.rate_bps = 0;
        let report = service(config).calculate(&JobSpecs::new(8.0, 20)).unwrap();

        assert_eq!(report.lines.len(), 3);
        assert_eq!(report.uncosted_lines().count(), 1);
        assert!(report.summary.tax.is_zero());
    }

    #[test]
    fn test_report_ids_are_unique() {
        let svc = service(EngineConfig::default());
        let specs = JobSpecs::new(8.0, 20);
        let a = svc.calculate(&specs).unwrap();
        let b = svc.calculate(&specs).unwrap();
        assert_ne!(a.report_id, b.report_id);
        assert_eq!(a.lines, b.lines);
    }

    #[test]
    fn test_from_config_requires_catalog_path() {
        let err = AccessoryService::from_config(EngineConfig::default()).unwrap_err();
        assert!(matches!(err, ServiceError::MissingCatalog));
    }

    #[test]
    fn test_from_config_loads_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, SNAPSHOT).unwrap();

        let mut config = EngineConfig::default();
        config.catalog.path = Some(path);
        let svc = AccessoryService::from_config(config).unwrap();
        assert_eq!(svc.catalog().len(), 3);
    }

    #[test]
    fn test_report_serializes() {
        let report = service(EngineConfig::default())
            .calculate(&JobSpecs::new(8.0, 20))
            .unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["lines"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["supplier_totals"]["sup-rails"], 7680);
    }
}
