//! Consensus signature verification
//!
//! Verifies that the consensus document was signed by a sufficient number
//! of directory authorities. This is critical to prevent a malicious cache
//! from injecting fake relays.
//!
//! ## Outcomes
//!
//! 1. **Verified**: at least `min_signatures` known authorities produced a
//!    valid RSA signature with a certified signing key
//! 2. **NeedCertificates**: too few verified so far, but enough signers
//!    whose certificate we do not hold yet to reach the threshold
//! 3. **Failed**: the threshold is out of reach even with every missing
//!    certificate
//!
//! Reference: dir-spec.txt Section 3.4.1

use super::consensus::{DirectorySignature, NetworkStatus, RequiredCertificate, VerificationStatus};
use crate::authority::AuthorityGuard;
use std::collections::HashSet;

/// Consensus signature verifier
pub struct ConsensusVerifier {
    min_signatures: usize,
}

impl ConsensusVerifier {
    pub fn new(min_signatures: usize) -> Self {
        Self { min_signatures }
    }

    /// Validate that a signature has correct RSA format.
    ///
    /// RSA-1024 signatures are 128 bytes, RSA-2048 are 256 bytes.
    /// This catches trivially forged signatures (empty, wrong length, all zeros).
    fn validate_signature_format(sig_bytes: &[u8]) -> bool {
        let valid_lengths = [128, 256, 384, 512];
        if !valid_lengths.contains(&sig_bytes.len()) {
            return false;
        }

        if sig_bytes.iter().all(|&b| b == 0) {
            return false;
        }

        // Too uniform to be a real signature
        let unique_bytes: HashSet<u8> = sig_bytes.iter().copied().collect();
        unique_bytes.len() >= 8
    }

    /// RSA-PKCS1 verification of one signature with a certified signing key
    fn verify_rsa_signature(signed_portion: &[u8], sig: &DirectorySignature, signing_key_der: &[u8]) -> bool {
        use ring::signature;

        let verify_algo: &dyn signature::VerificationAlgorithm = match sig.algorithm.as_str() {
            "sha256" => &signature::RSA_PKCS1_2048_8192_SHA256,
            _ => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        };

        signature::UnparsedPublicKey::new(verify_algo, signing_key_der)
            .verify(signed_portion, &sig.signature)
            .is_ok()
    }

    /// Check every signature on `doc` against the authorities' certificates
    pub fn verify(&self, doc: &NetworkStatus, authorities: &AuthorityGuard<'_>) -> VerificationStatus {
        let now = super::unix_now();
        let mut verified: HashSet<_> = HashSet::new();
        let mut missing: HashSet<RequiredCertificate> = HashSet::new();

        for sig in &doc.signatures {
            let auth = match authorities.authority_by_identity(&sig.identity) {
                Some(a) => a,
                None => {
                    log::debug!("  Unknown signer: {}", sig.identity.short());
                    continue;
                }
            };

            // One vote per authority
            if verified.contains(&sig.identity) {
                continue;
            }

            let cert = match auth.certificate_for_signing_key(&sig.signing_key_digest) {
                Some(c) if !c.is_expired_at(now) => c,
                _ => {
                    missing.insert(RequiredCertificate {
                        authority: sig.identity,
                        signing_key: sig.signing_key_digest,
                    });
                    continue;
                }
            };

            if !Self::validate_signature_format(&sig.signature) {
                log::warn!("  {} signature has invalid format ({} bytes, rejected)",
                    auth.name(), sig.signature.len());
                continue;
            }

            if Self::verify_rsa_signature(doc.signed_portion(), sig, &cert.signing_key_der) {
                log::debug!("  Verified authority: {} (algo={})", auth.name(), sig.algorithm);
                verified.insert(sig.identity);
            } else {
                log::warn!("  RSA signature verification failed for authority {}", auth.name());
            }
        }

        // An authority that verified under one key needs no other certificate
        missing.retain(|required| !verified.contains(&required.authority));
        let missing_authorities: HashSet<_> = missing.iter().map(|r| r.authority).collect();

        log::debug!("  Authority signatures: {}/{} ({} authorities missing certificates)",
            verified.len(), self.min_signatures, missing_authorities.len());

        if verified.len() >= self.min_signatures {
            VerificationStatus::Verified
        } else if verified.len() + missing_authorities.len() >= self.min_signatures {
            VerificationStatus::NeedCertificates(missing)
        } else {
            VerificationStatus::Failed
        }
    }
}
