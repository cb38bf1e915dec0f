//! Directory protocol documents
//!
//! This module holds the already-parsed documents the directory works on:
//! - Identity fingerprints
//! - Router status entries and router descriptors
//! - Authority key certificates
//! - Consensus documents and their signature verification

mod identity;
mod relay;
mod certs;
mod consensus;
mod consensus_verify;

pub use identity::{HexDigest, DIGEST_LEN};
pub use relay::{
    RouterDescriptor, RouterFlags, RouterStatus,
    FLAG_BAD_DIRECTORY, FLAG_GUARD, FLAG_RUNNING, FLAG_V2DIR, FLAG_VALID, UNNAMED,
};
pub use certs::KeyCertificate;
pub use consensus::{
    same_document, ConsensusDocument, DirectorySignature, NetworkStatus,
    RequiredCertificate, VerificationStatus,
};
pub use consensus_verify::ConsensusVerifier;

/// Get current time in seconds since Unix epoch
pub(crate) fn unix_now() -> u64 {
    use web_time::SystemTime;

    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
