//! Content-addressed identity for stories and cards.
//!
//! A card "is" a story when both hash to the same [`IdentityKey`]. Nothing
//! is stored between runs: every run recomputes keys from the names and
//! descriptions already on the board.

use serde::Serialize;
use std::fmt;

/// Unit separator; not expected inside names or descriptions.
const SEPARATOR: u8 = 0x1F;

/// Hex-encoded blake3 digest of `name`, a separator byte, and `description`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    #[must_use]
    pub fn new(name: &str, description: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(name.as_bytes());
        hasher.update(&[SEPARATOR]);
        hasher.update(description.as_bytes());
        Self(hasher.finalize().to_hex().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, enough to tell keys apart in logs.
    #[must_use]
    pub fn short(&self) -> &str {
        &self.0[..12]
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
