//! # Error Types
//!
//! Domain-specific error types for helios-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  helios-core errors (this file)                                        │
//! │  ├── CoreError        - Catalog and general domain errors              │
//! │  ├── ValidationError  - Job spec / rule validation failures            │
//! │  └── FormulaError     - Formula parse and evaluation failures          │
//! │                                                                         │
//! │  helios-service errors (separate crate)                                │
//! │  └── ServiceError     - Config, snapshot file and report failures      │
//! │                                                                         │
//! │  Flow: FormulaError → ValidationError → CoreError → ServiceError       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT An Error
//! The calculation pipeline itself never returns these. A bad formula, an
//! unknown calculation type or a rule without products degrades that single
//! rule to "no line" (or "line without cost") and is reported via `tracing`.
//! Errors only surface from validation helpers and catalog access.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The rule catalog could not be read or decoded.
    ///
    /// ## When This Occurs
    /// - Catalog snapshot JSON is malformed
    /// - A catalog backend failed to answer a query
    #[error("Catalog unavailable: {0}")]
    Catalog(String),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Catalog(err.to_string())
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Produced by [`crate::validation`]. Validating job specs is the caller's
/// responsibility; the engine computes whatever it is given.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Numeric value must be zero or greater.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Numeric value is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be at least {min}")]
    TooSmall { field: String, min: f64 },

    /// Integer setting outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Two fields contradict each other.
    #[error("{field} conflicts with {other}: {reason}")]
    Conflict {
        field: String,
        other: String,
        reason: String,
    },

    /// Formula does not parse.
    #[error("formula is invalid: {0}")]
    Formula(#[from] FormulaError),

    /// Calculation type tag is not one the engine understands.
    #[error("unknown calculation type '{0}'")]
    UnknownCalculationType(String),

    /// Duplicate value (e.g., duplicate rule id in a catalog).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },

    /// Problem attached to a specific catalog rule.
    #[error("rule {rule_id}: {source}")]
    Rule {
        rule_id: String,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// Attaches a rule id to a field-level validation error.
    pub fn for_rule(rule_id: impl Into<String>, source: ValidationError) -> Self {
        ValidationError::Rule {
            rule_id: rule_id.into(),
            source: Box::new(source),
        }
    }
}

// =============================================================================
// Formula Error
// =============================================================================

/// Formula parse and evaluation failures.
///
/// Every variant is recoverable: the quantity resolver turns any of them
/// into a zero quantity for the offending rule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    #[error("formula is empty")]
    Empty,

    #[error("formula is longer than {max} characters")]
    TooLong { max: usize },

    #[error("unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("invalid number '{0}'")]
    InvalidNumber(String),

    #[error("unknown identifier '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {actual}")]
    Arity {
        function: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

/// Result type for formula parsing and evaluation.
pub type FormulaResult<T> = Result<T, FormulaError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FormulaError::Arity {
            function: "CEIL",
            expected: "1",
            actual: 2,
        };
        assert_eq!(err.to_string(), "CEIL expects 1 argument(s), got 2");

        let err = FormulaError::UnknownIdentifier("process".to_string());
        assert_eq!(err.to_string(), "unknown identifier 'process'");
    }

    #[test]
    fn test_rule_scoped_validation_message() {
        let err = ValidationError::for_rule(
            "rule-7",
            ValidationError::Required {
                field: "name".to_string(),
            },
        );
        assert_eq!(err.to_string(), "rule rule-7: name is required");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Formula(FormulaError::Empty);
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_json_error_becomes_catalog_error() {
        let json_err = serde_json::from_str::<Vec<u8>>("not json").unwrap_err();
        let core_err: CoreError = json_err.into();
        assert!(matches!(core_err, CoreError::Catalog(_)));
    }
}
