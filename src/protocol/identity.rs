//! Identity fingerprints
//!
//! Relays and authorities are identified by the SHA-1 digest of their RSA
//! identity key, written as 40 hex characters.

use crate::error::{DirectoryError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of an identity digest in bytes
pub const DIGEST_LEN: usize = 20;

/// A 20-byte identity digest
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HexDigest([u8; DIGEST_LEN]);

impl HexDigest {
    pub fn from_bytes(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a 40 character hex string (case-insensitive, spaces ignored)
    pub fn from_hex(s: &str) -> Result<Self> {
        let normalized: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = hex::decode(&normalized)
            .map_err(|e| DirectoryError::InvalidIdentity(format!("{}: {}", s, e)))?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| {
            DirectoryError::InvalidIdentity(format!("{}: expected {} bytes", s, DIGEST_LEN))
        })?;
        Ok(Self(bytes))
    }

    /// Parse the self-identifying `$<40 hex>` router name form
    pub fn from_dollar_name(name: &str) -> Option<Self> {
        let hex = name.strip_prefix('$')?;
        if hex.len() != DIGEST_LEN * 2 {
            return None;
        }
        Self::from_hex(hex).ok()
    }

    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    /// Uppercase hex
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.0)
    }

    /// First eight hex characters, for log lines
    pub fn short(&self) -> String {
        hex::encode_upper(&self.0[..4])
    }
}

impl FromStr for HexDigest {
    type Err = DirectoryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for HexDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HexDigest({})", self.to_hex())
    }
}
