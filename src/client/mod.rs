//! Outbound HTTP client subsystem.
//!
//! # Data Flow
//! ```text
//! RequestSpec (method, path, body, token, api version)
//!     → registry.rs (tenant lookup, cached transport + headers)
//!     → failover.rs (current base URL)
//!     → descriptor.rs (resolved URL, headers, content type)
//!     → executor.rs (encode body, exchange, classify)
//!     → response.rs (status, reason, parsed body)
//!
//! On connection refused / host not found (relative paths only):
//!     → failover.rs advances the tenant's index
//!     → executor.rs retries from resolution
//! ```
//!
//! # Design Decisions
//! - One cached client per tenant, shared by all concurrent calls
//! - Failover index is shared state, advanced by compare-and-swap
//! - Passthrough tokens and per-call options never enter the cache
//! - Low-level transport codes never reach the caller

pub mod descriptor;
pub mod error;
pub mod executor;
pub mod failover;
pub mod registry;
pub mod response;

pub use descriptor::{ApiVersion, ConnectionDescriptor, RequestOptions, RequestSpec};
pub use error::{ClientError, ClientResult, ErrorCategory, RequestContext};
pub use executor::RequestExecutor;
pub use registry::ServiceClientRegistry;
pub use response::{ResponseBody, ResponseEnvelope};
