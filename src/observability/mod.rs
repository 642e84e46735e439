//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / executor / resolver produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and histograms via the metrics facade)
//!
//! Consumers:
//!     → Log output (stderr, filtered by RUST_LOG)
//!     → Whatever metrics recorder the host process installs
//! ```
//!
//! # Design Decisions
//! - Structured key=value fields, never interpolated secrets
//! - Metrics are no-ops until a recorder is installed
//! - Tenant is the only high-cardinality label

pub mod logging;
pub mod metrics;
