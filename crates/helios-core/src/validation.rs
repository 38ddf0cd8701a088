//! # Validation Module
//!
//! Input validation helpers for job specs and catalog rules.
//!
//! ## Where Validation Happens
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Catalog load (InMemoryCatalog::from_rules)                            │
//! │  └── validate_catalog: problems are LOGGED, rules are kept             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Caller, before a run                                                   │
//! │  └── validate_job_specs: reject nonsense specs up front                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Pipeline                                                               │
//! │  └── never rejects: bad rules degrade to "no line"                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use helios_core::types::JobSpecs;
//! use helios_core::validation::validate_job_specs;
//!
//! assert!(validate_job_specs(&JobSpecs::new(6.6, 15)).is_ok());
//! assert!(validate_job_specs(&JobSpecs::new(-1.0, 15)).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::formula::validate_formula;
use crate::types::{AccessoryRule, Calculation, JobSpecs};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Largest accepted tax rate (100%).
pub const MAX_TAX_RATE_BPS: u32 = 10_000;

// =============================================================================
// Job Specs
// =============================================================================

/// Validates job specs.
///
/// ## Rules
/// - System size finite and non-negative
/// - Battery capacity, when recorded, finite and non-negative
/// - A recorded battery capacity requires `has_battery`
/// - `stories`, when set, at least 1
pub fn validate_job_specs(specs: &JobSpecs) -> ValidationResult<()> {
    non_negative("system_size_kw", specs.system_size_kw)?;

    if let Some(capacity) = specs.battery_capacity_kwh {
        non_negative("battery_capacity_kwh", capacity)?;
        if !specs.has_battery && capacity > 0.0 {
            return Err(ValidationError::Conflict {
                field: "battery_capacity_kwh".to_string(),
                other: "has_battery".to_string(),
                reason: "capacity recorded for a job without a battery".to_string(),
            });
        }
    }

    if let Some(0) = specs.stories {
        return Err(ValidationError::TooSmall {
            field: "stories".to_string(),
            min: 1.0,
        });
    }

    Ok(())
}

// =============================================================================
// Rules
// =============================================================================

/// Validates a single catalog rule.
///
/// Returns the first problem found.
pub fn validate_rule(rule: &AccessoryRule) -> ValidationResult<()> {
    required("id", &rule.id)?;
    required("name", &rule.name)?;
    required("category", &rule.category)?;

    match &rule.calculation {
        Calculation::Fixed => {}
        Calculation::PerPanel { multiplier }
        | Calculation::PerKw { multiplier }
        | Calculation::PerBattery { multiplier } => finite("multiplier", *multiplier)?,
        Calculation::Formula { expression } => validate_formula(expression)?,
        Calculation::Unrecognized { tag } => {
            return Err(ValidationError::UnknownCalculationType(tag.clone()))
        }
    }

    finite("base_quantity", rule.base_quantity)?;
    non_negative("min_quantity", rule.min_quantity)?;

    if let Some(max) = rule.max_quantity {
        finite("max_quantity", max)?;
        if max < rule.min_quantity {
            return Err(ValidationError::Conflict {
                field: "max_quantity".to_string(),
                other: "min_quantity".to_string(),
                reason: format!("max {} is below min {}", max, rule.min_quantity),
            });
        }
    }

    Ok(())
}

/// Validates a whole catalog, collecting every problem.
///
/// Each error is scoped to its rule id. Duplicate ids are reported once per
/// repeat.
pub fn validate_catalog(rules: &[AccessoryRule]) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();

    for rule in rules {
        if let Err(error) = validate_rule(rule) {
            errors.push(ValidationError::for_rule(&rule.id, error));
        }
        if !seen.insert(rule.id.as_str()) {
            errors.push(ValidationError::Duplicate {
                field: "rule id".to_string(),
                value: rule.id.clone(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > MAX_TAX_RATE_BPS {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: i64::from(MAX_TAX_RATE_BPS),
        });
    }
    Ok(())
}

// =============================================================================
// Field Helpers
// =============================================================================

fn required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    Ok(())
}

fn non_negative(field: &str, value: f64) -> ValidationResult<()> {
    finite(field, value)?;
    if value < 0.0 {
        return Err(ValidationError::Negative {
            field: field.to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;

    fn rule(id: &str, calculation: Calculation) -> AccessoryRule {
        AccessoryRule {
            id: id.into(),
            name: "Cable ties".into(),
            category: "ELECTRICAL".into(),
            product_type: None,
            calculation,
            base_quantity: 0.0,
            round_up: false,
            min_quantity: 0.0,
            max_quantity: None,
            is_required: true,
            is_active: true,
            priority: 0,
            unit: None,
            notes: None,
            candidates: vec![],
        }
    }

    #[test]
    fn test_validate_job_specs() {
        assert!(validate_job_specs(&JobSpecs::new(6.6, 15)).is_ok());
        assert!(validate_job_specs(&JobSpecs::new(6.6, 15).with_battery(13.5)).is_ok());

        assert!(matches!(
            validate_job_specs(&JobSpecs::new(f64::NAN, 15)),
            Err(ValidationError::NotFinite { .. })
        ));
        assert!(matches!(
            validate_job_specs(&JobSpecs::new(6.6, 15).with_battery(-2.0)),
            Err(ValidationError::Negative { .. })
        ));

        let mut stale = JobSpecs::new(6.6, 15);
        stale.battery_capacity_kwh = Some(10.0);
        assert!(matches!(
            validate_job_specs(&stale),
            Err(ValidationError::Conflict { .. })
        ));

        let mut no_floors = JobSpecs::new(6.6, 15);
        no_floors.stories = Some(0);
        assert!(validate_job_specs(&no_floors).is_err());
    }

    #[test]
    fn test_validate_rule() {
        assert!(validate_rule(&rule("r1", Calculation::PerPanel { multiplier: 2.0 })).is_ok());

        let mut blank = rule("r1", Calculation::Fixed);
        blank.name = "  ".into();
        assert!(matches!(
            validate_rule(&blank),
            Err(ValidationError::Required { ref field }) if field == "name"
        ));

        let bad_formula = rule(
            "r2",
            Calculation::Formula {
                expression: "panelCount * costPerPanel".into(),
            },
        );
        assert!(matches!(
            validate_rule(&bad_formula),
            Err(ValidationError::Formula(FormulaError::UnknownIdentifier(_)))
        ));

        let mut inverted = rule("r3", Calculation::Fixed);
        inverted.min_quantity = 5.0;
        inverted.max_quantity = Some(2.0);
        assert!(matches!(
            validate_rule(&inverted),
            Err(ValidationError::Conflict { .. })
        ));

        let unknown = rule(
            "r4",
            Calculation::Unrecognized {
                tag: "PER_STRING".into(),
            },
        );
        assert!(matches!(
            validate_rule(&unknown),
            Err(ValidationError::UnknownCalculationType(_))
        ));
    }

    #[test]
    fn test_validate_catalog_collects_everything() {
        let rules = vec![
            rule("a", Calculation::Fixed),
            rule("b", Calculation::PerKw { multiplier: f64::INFINITY }),
            rule("a", Calculation::Fixed),
        ];
        let errors = validate_catalog(&rules).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors[0].to_string(),
            "rule b: multiplier must be a finite number"
        );
        assert!(matches!(errors[1], ValidationError::Duplicate { .. }));

        assert!(validate_catalog(&rules[..1]).is_ok());
    }

    #[test]
    fn test_validate_tax_rate_bps() {
        assert!(validate_tax_rate_bps(0).is_ok());
        assert!(validate_tax_rate_bps(1000).is_ok());
        assert!(validate_tax_rate_bps(10_000).is_ok());
        assert!(validate_tax_rate_bps(10_001).is_err());
    }
}
