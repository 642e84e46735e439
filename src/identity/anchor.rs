//! Identity anchor codec.
//!
//! The device-management platform stores an external directory object id as
//! a hyphenated UUID, while the directory side exchanges the same 16 bytes as
//! base64 in mixed-endian GUID order: the first group of 4 bytes, and the two
//! following groups of 2 bytes, are byte-reversed; the last 8 bytes keep their
//! order.
//!
//! ```text
//! anchor bytes:  b0 b1 b2 b3 | b4 b5 | b6 b7 | b8 .. b15
//! uuid text:     b3b2b1b0 - b5b4 - b7b6 - b8b9 - b10..b15
//! ```
//!
//! The transform is a fixed permutation, so [`decode`] and [`encode`] are
//! exact inverses for canonical input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use uuid::Uuid;

/// Input that is not a valid anchor or UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed anchor '{input}': {reason}")]
pub struct MalformedAnchor {
    pub input: String,
    pub reason: &'static str,
}

impl MalformedAnchor {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Decode a base64 external anchor into the vendor's hyphenated UUID form.
pub fn decode(anchor: &str) -> Result<String, MalformedAnchor> {
    let bytes = STANDARD
        .decode(anchor.trim())
        .map_err(|_| MalformedAnchor::new(anchor, "invalid base64"))?;

    let bytes: [u8; 16] = bytes
        .try_into()
        .map_err(|_| MalformedAnchor::new(anchor, "anchor must decode to exactly 16 bytes"))?;

    Ok(Uuid::from_bytes_le(bytes).hyphenated().to_string())
}

/// Encode a vendor UUID (hyphens optional) into a base64 external anchor.
pub fn encode(uuid: &str) -> Result<String, MalformedAnchor> {
    let digits: String = uuid.trim().chars().filter(|c| *c != '-').collect();

    if digits.len() != 32 {
        return Err(MalformedAnchor::new(uuid, "uuid must contain exactly 32 hex digits"));
    }
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(MalformedAnchor::new(uuid, "uuid contains non-hex characters"));
    }

    let parsed = Uuid::try_parse(&digits)
        .map_err(|_| MalformedAnchor::new(uuid, "uuid contains non-hex characters"))?;

    Ok(STANDARD.encode(parsed.to_bytes_le()))
}
