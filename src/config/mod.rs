//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AdapterConfig (validated, immutable)
//!     → handed to ServiceClientRegistry
//!
//! On reload:
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → registry swaps Arc<AdapterConfig> and drops cached descriptors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Secrets may be referenced by environment variable name

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::AdapterConfig;
pub use schema::ContentType;
pub use schema::Credentials;
pub use schema::HttpConfig;
pub use schema::ProxySettings;
pub use schema::TenantConfig;
