//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! external anchor (base64)
//!     → anchor.rs (decode to the platform's hyphenated UUID)
//!     → resolver.rs (search endpoint + exact match)
//!     → ResolvedIdentity (internal id, numeric id, attributes)
//! ```

pub mod anchor;
pub mod resolver;

pub use anchor::{decode, encode, MalformedAnchor};
pub use resolver::{DisplayAttributes, IdentityResolver, LookupIntent, ResolvedIdentity, ResourceKind};
