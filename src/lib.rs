//! Provisioning adapter for a device-management platform's REST API.

pub mod client;
pub mod config;
pub mod directory;
pub mod identity;
pub mod observability;

pub use client::{RequestExecutor, ServiceClientRegistry};
pub use config::schema::AdapterConfig;
pub use directory::DeviceDirectory;
pub use identity::IdentityResolver;
