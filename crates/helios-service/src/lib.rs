//! # helios-service: Host Glue for Helios
//!
//! Loads configuration and catalog snapshots, installs logging, and turns
//! engine output into timestamped reports. All file and environment access
//! for Helios happens here; `helios-core` stays pure.
//!
//! ## Startup Sequence
//! ```text
//! init_tracing()
//!      │
//!      ▼
//! EngineConfig::load(None)          defaults → helios.toml → HELIOS_* env
//!      │
//!      ▼
//! AccessoryService::from_config     reads [catalog] path into InMemoryCatalog
//!      │
//!      ▼
//! service.calculate(&specs)         → AccessoryReport
//! ```

pub mod config;
pub mod error;
pub mod service;
pub mod snapshot;
pub mod telemetry;

pub use config::EngineConfig;
pub use error::{ServiceError, ServiceResult};
pub use service::{AccessoryReport, AccessoryService};
pub use snapshot::load_catalog_snapshot;
pub use telemetry::init_tracing;
