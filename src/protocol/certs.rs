//! Directory authority key certificates
//!
//! Each authority signs consensus documents with a medium-term signing
//! key. A key certificate binds that signing key to the authority's
//! long-term identity. We only need to know which authority it belongs
//! to, which signing key it carries, and when it expires.
//!
//! Reference: dir-spec.txt Section 3.1

use super::identity::HexDigest;
use serde::{Deserialize, Serialize};

/// An authority key certificate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCertificate {
    /// v3 identity fingerprint of the authority that owns this key
    pub authority_fingerprint: HexDigest,

    /// Fingerprint of the signing key
    pub signing_key_fingerprint: HexDigest,

    /// DER-encoded RSA public signing key (PKCS#1 RSAPublicKey)
    pub signing_key_der: Vec<u8>,

    /// dir-key-published (Unix seconds)
    pub published: u64,

    /// dir-key-expires (Unix seconds)
    pub expires: u64,
}

impl KeyCertificate {
    pub fn is_expired_at(&self, now: u64) -> bool {
        now >= self.expires
    }
}
