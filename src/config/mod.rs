//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → CatalogConfig (validated, immutable)
//!     → handed to startup, which builds the store and exporters
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CatalogConfig, ListenerConfig, LogFileConfig, LogFormat, LogRotation, ObservabilityConfig,
    SpanExporterKind, StoreBackend, StoreConfig, TimeoutConfig, TracingConfig, ValidationConfig,
};
