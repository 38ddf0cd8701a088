//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HELIOS_CATALOG_PATH=/srv/helios/catalog.json                       │
//! │     HELIOS_INCLUDE_OPTIONAL=true                                       │
//! │     HELIOS_CATEGORIES=MOUNTING,ELECTRICAL                              │
//! │     HELIOS_TAX_RATE_BPS=1000                                           │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/helios/helios.toml (Linux)                               │
//! │     ~/Library/Application Support/com.helios.helios/helios.toml (macOS)│
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     required rules only, all categories, 10% GST                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [catalog]
//! path = "catalog.json"
//!
//! [calculation]
//! include_optional = false
//! categories = ["MOUNTING", "ELECTRICAL"]
//!
//! [tax]
//! rate_bps = 1000
//! ```

use helios_core::types::{CalculationOptions, TaxRate};
use helios_core::validation::validate_tax_rate_bps;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ServiceError, ServiceResult};

/// Config file name inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "helios.toml";

// =============================================================================
// Sections
// =============================================================================

/// Where the rule catalog snapshot lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogSettings {
    /// JSON snapshot file (array of catalog rules).
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Default run options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CalculationSettings {
    /// Include rules not flagged as required.
    #[serde(default)]
    pub include_optional: bool,

    /// Restrict runs to these categories. Absent means all.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
}

impl CalculationSettings {
    pub fn options(&self) -> CalculationOptions {
        CalculationOptions {
            include_optional: self.include_optional,
            category_filter: self.categories.clone(),
        }
    }
}

/// Tax applied to the material subtotal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSettings {
    /// Rate in basis points (1000 = 10%).
    #[serde(default = "default_tax_rate_bps")]
    pub rate_bps: u32,
}

fn default_tax_rate_bps() -> u32 {
    TaxRate::GST.bps()
}

impl Default for TaxSettings {
    fn default() -> Self {
        TaxSettings {
            rate_bps: default_tax_rate_bps(),
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub catalog: CatalogSettings,

    #[serde(default)]
    pub calculation: CalculationSettings,

    #[serde(default)]
    pub tax: TaxSettings,
}

impl EngineConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (helios.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ServiceResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load engine config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML document. Missing sections take their defaults.
    pub fn from_toml(contents: &str) -> ServiceResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        validate_tax_rate_bps(self.tax.rate_bps)
            .map_err(|e| ServiceError::InvalidConfig(e.to_string()))?;

        if let Some(categories) = &self.calculation.categories {
            if categories.iter().any(|c| c.trim().is_empty()) {
                return Err(ServiceError::InvalidConfig(
                    "categories must not contain empty names".into(),
                ));
            }
        }

        if let Some(path) = &self.catalog.path {
            if path.as_os_str().is_empty() {
                return Err(ServiceError::InvalidConfig(
                    "catalog path must not be empty".into(),
                ));
            }
        }

        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `HELIOS_*` overrides from a variable lookup.
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("HELIOS_CATALOG_PATH") {
            debug!(path = %path, "Overriding catalog path from environment");
            self.catalog.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("HELIOS_INCLUDE_OPTIONAL") {
            match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => self.calculation.include_optional = true,
                "0" | "false" | "no" => self.calculation.include_optional = false,
                _ => warn!(value = %value, "Unknown HELIOS_INCLUDE_OPTIONAL value"),
            }
        }

        if let Some(value) = lookup("HELIOS_CATEGORIES") {
            let categories: Vec<String> = value
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect();
            self.calculation.categories = if categories.is_empty() {
                None
            } else {
                Some(categories)
            };
        }

        if let Some(value) = lookup("HELIOS_TAX_RATE_BPS") {
            match value.trim().parse::<u32>() {
                Ok(bps) => {
                    debug!(bps, "Overriding tax rate from environment");
                    self.tax.rate_bps = bps;
                }
                Err(_) => warn!(value = %value, "Invalid HELIOS_TAX_RATE_BPS value"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "helios", "helios")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax.rate_bps)
    }

    pub fn options(&self) -> CalculationOptions {
        self.calculation.options()
    }

    pub fn catalog_path(&self) -> Option<&PathBuf> {
        self.catalog.path.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.tax.rate_bps, 1000);
        assert!(!config.calculation.include_optional);
        assert_eq!(config.catalog.path, None);
        assert_eq!(config.options(), CalculationOptions::required_only());
    }

    #[test]
    fn test_from_toml() {
        let config = EngineConfig::from_toml(
            r#"
            [catalog]
            path = "catalog.json"

            [calculation]
            include_optional = true
            categories = ["MOUNTING"]
            "#,
        )
        .unwrap();
        assert_eq!(config.catalog_path(), Some(&PathBuf::from("catalog.json")));
        assert!(config.options().include_optional);
        assert!(config.options().allows_category("MOUNTING"));
        assert!(!config.options().allows_category("ELECTRICAL"));
        assert_eq!(config.tax_rate(), TaxRate::GST);
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml("[tax]\nrate_bps = \"ten\"").unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("HELIOS_CATALOG_PATH", "/srv/catalog.json"),
            ("HELIOS_INCLUDE_OPTIONAL", "yes"),
            ("HELIOS_CATEGORIES", " MOUNTING, ,ELECTRICAL "),
            ("HELIOS_TAX_RATE_BPS", "0"),
        ]));
        assert_eq!(
            config.catalog_path(),
            Some(&PathBuf::from("/srv/catalog.json"))
        );
        assert!(config.calculation.include_optional);
        assert_eq!(
            config.calculation.categories,
            Some(vec!["MOUNTING".to_string(), "ELECTRICAL".to_string()])
        );
        assert_eq!(config.tax.rate_bps, 0);
    }

    #[test]
    fn test_bad_env_values_are_ignored() {
        let mut config = EngineConfig::default();
        config.apply_overrides(lookup(&[
            ("HELIOS_INCLUDE_OPTIONAL", "maybe"),
            ("HELIOS_TAX_RATE_BPS", "ten percent"),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_validation() {
        let mut config = EngineConfig::default();
        assert!(config.validate().is_ok());

        config.tax.rate_bps = 10_001;
        assert!(config.validate().is_err());

        config.tax.rate_bps = 1000;
        config.calculation.categories = Some(vec![" ".into()]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[tax]\nrate_bps = 1500\n").unwrap();

        let config = EngineConfig::load(Some(path)).unwrap();
        assert_eq!(config.tax.rate_bps, 1500);

        let missing = dir.path().join("absent.toml");
        let config = EngineConfig::load_or_default(Some(missing));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[tax]"));
        assert!(toml_str.contains("rate_bps = 1000"));
    }
}
