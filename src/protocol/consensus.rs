//! Consensus documents
//!
//! The directory consumes already-parsed consensus documents through the
//! `ConsensusDocument` trait. `NetworkStatus` is the bundled
//! implementation: a parsed document plus its signatures, verified
//! against the authority certificates we know.

use super::consensus_verify::ConsensusVerifier;
use super::identity::HexDigest;
use super::relay::RouterStatus;
use crate::authority::AuthorityGuard;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A signing certificate that must be known before a document can verify
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequiredCertificate {
    /// Authority whose certificate is missing
    pub authority: HexDigest,

    /// Signing key fingerprint the certificate must carry
    pub signing_key: HexDigest,
}

/// Outcome of checking a document's signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    /// Not enough valid signatures, and no missing certificate could fix that
    Failed,

    /// Could verify once these certificates are known
    NeedCertificates(HashSet<RequiredCertificate>),

    /// Enough authorities signed
    Verified,
}

/// A parsed, not yet validated consensus document
pub trait ConsensusDocument: Send + Sync + fmt::Debug {
    /// valid-after time (Unix seconds)
    fn valid_after(&self) -> u64;

    /// Whether the document is still within its validity window
    fn is_live(&self) -> bool;

    /// Digest of the signed portion; identifies the document
    fn digest(&self) -> [u8; 32];

    /// Router status entries in document order
    fn router_status_entries(&self) -> &[RouterStatus];

    /// Check signatures against the authority certificates known now
    ///
    /// Takes the authority guard, so verification only ever happens with
    /// the authority lock held.
    fn verify_signatures(&self, authorities: &AuthorityGuard<'_>) -> VerificationStatus;
}

/// Whether two handles refer to the same document
pub fn same_document(a: &Arc<dyn ConsensusDocument>, b: &Arc<dyn ConsensusDocument>) -> bool {
    Arc::ptr_eq(a, b) || a.digest() == b.digest()
}

/// A parsed directory signature from the consensus
#[derive(Debug, Clone)]
pub struct DirectorySignature {
    /// Algorithm (usually "sha256")
    pub algorithm: String,
    /// Identity fingerprint of the signing authority
    pub identity: HexDigest,
    /// Signing key digest
    pub signing_key_digest: HexDigest,
    /// The actual signature bytes
    pub signature: Vec<u8>,
}

/// Parsed consensus document
#[derive(Debug, Clone)]
pub struct NetworkStatus {
    /// Consensus valid-after time
    pub valid_after: u64,

    /// Consensus fresh-until time
    pub fresh_until: u64,

    /// Consensus valid-until time
    pub valid_until: u64,

    /// All router status entries
    pub entries: Vec<RouterStatus>,

    /// Authority signatures over `signed_portion`
    pub signatures: Vec<DirectorySignature>,

    /// Document text up to and including the first signature header line
    signed_portion: Vec<u8>,

    /// SHA-256 of `signed_portion`
    digest: [u8; 32],

    /// Signatures needed to verify
    min_signatures: usize,
}

impl NetworkStatus {
    pub fn new(
        valid_after: u64,
        fresh_until: u64,
        valid_until: u64,
        entries: Vec<RouterStatus>,
        signed_portion: Vec<u8>,
        signatures: Vec<DirectorySignature>,
        min_signatures: usize,
    ) -> Self {
        let digest = Sha256::digest(&signed_portion).into();
        Self {
            valid_after,
            fresh_until,
            valid_until,
            entries,
            signatures,
            signed_portion,
            digest,
            min_signatures,
        }
    }

    pub fn signed_portion(&self) -> &[u8] {
        &self.signed_portion
    }

    pub fn min_signatures(&self) -> usize {
        self.min_signatures
    }

    /// Check if this consensus is still fresh
    pub fn is_fresh_at(&self, now: u64) -> bool {
        now < self.fresh_until
    }

    /// Check if this consensus is still valid
    pub fn is_live_at(&self, now: u64) -> bool {
        now < self.valid_until
    }
}

impl ConsensusDocument for NetworkStatus {
    fn valid_after(&self) -> u64 {
        self.valid_after
    }

    fn is_live(&self) -> bool {
        self.is_live_at(super::unix_now())
    }

    fn digest(&self) -> [u8; 32] {
        self.digest
    }

    fn router_status_entries(&self) -> &[RouterStatus] {
        &self.entries
    }

    fn verify_signatures(&self, authorities: &AuthorityGuard<'_>) -> VerificationStatus {
        ConsensusVerifier::new(self.min_signatures).verify(self, authorities)
    }
}
