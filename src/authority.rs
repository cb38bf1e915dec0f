//! Trusted directory authorities
//!
//! The authorities are the fixed set of servers whose signatures make a
//! consensus valid. Their identities are static; their signing-key
//! certificates accumulate at runtime as we load or download them.
//!
//! ## Locking
//!
//! The authority set has its own lock. Whenever both the authority lock
//! and the directory registry lock are needed, the authority lock comes
//! first. The only way to take both is `AuthorityGuard::lock_nested`, so
//! holding an `AuthorityGuard` is the proof that the outer lock is held.

use crate::protocol::{HexDigest, KeyCertificate};
use parking_lot::{Mutex, MutexGuard};

/// Tor directory authority information
#[derive(Debug, Clone)]
pub struct DirectoryAuthority {
    /// Authority nickname
    pub name: &'static str,
    /// RSA identity fingerprint (hex, 40 chars = SHA-1 of RSA identity key)
    pub v3ident: &'static str,
    /// Directory address
    pub address: &'static str,
}

/// Hardcoded directory authority v3ident fingerprints
///
/// From Tor source code (`src/app/config/auth_dirs.inc`).
pub const DIRECTORY_AUTHORITIES: &[DirectoryAuthority] = &[
    DirectoryAuthority {
        name: "moria1",
        v3ident: "D586D18309DED4CD6D57C18FDB97EFA96D330566",
        address: "128.31.0.39:9231",
    },
    DirectoryAuthority {
        name: "tor26",
        v3ident: "14C131DFC5C6F93646BE72FA1401C02A8DF2E8B4",
        address: "217.196.147.77:80",
    },
    DirectoryAuthority {
        name: "dizum",
        v3ident: "E8A9C45EDE6D711294FADF8E7951F4DE6CA56B58",
        address: "45.66.35.11:80",
    },
    DirectoryAuthority {
        name: "gabelmoo",
        v3ident: "ED03BB616EB2F60BEC80151114BB25CEF515B226",
        address: "131.188.40.189:80",
    },
    DirectoryAuthority {
        name: "dannenberg",
        v3ident: "0232AF901C31A04EE9848595AF9BB7620D4C5B2E",
        address: "193.23.244.244:80",
    },
    DirectoryAuthority {
        name: "maatuska",
        v3ident: "49015F787433103580E3B66A1707A00E60F2D15B",
        address: "171.25.193.9:443",
    },
    DirectoryAuthority {
        name: "Faravahar",
        v3ident: "EFCBE720AB3A82B99F9E953CD5BF50F7EEFC7B97",
        address: "216.218.219.41:80",
    },
    DirectoryAuthority {
        name: "longclaw",
        v3ident: "23D15D965BC35114467363C165C4F724B64B4F66",
        address: "199.58.81.140:80",
    },
    DirectoryAuthority {
        name: "bastet",
        v3ident: "27102BC123E7AF1D4741AE047E160C91ADC76B21",
        address: "204.13.164.118:80",
    },
];

/// One authority and the certificates we hold for it
#[derive(Debug, Clone)]
pub struct DirectoryServer {
    name: String,
    v3ident: HexDigest,
    address: String,
    certificates: Vec<KeyCertificate>,
}

impl DirectoryServer {
    pub fn new(name: impl Into<String>, v3ident: HexDigest, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            v3ident,
            address: address.into(),
            certificates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn v3ident(&self) -> &HexDigest {
        &self.v3ident
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn certificates(&self) -> &[KeyCertificate] {
        &self.certificates
    }

    /// Certificate carrying the given signing key, if we have one
    pub fn certificate_for_signing_key(&self, signing_key: &HexDigest) -> Option<&KeyCertificate> {
        self.certificates
            .iter()
            .find(|c| &c.signing_key_fingerprint == signing_key)
    }

    /// Store a certificate; a newer one for the same signing key replaces the old
    ///
    /// Returns false if the certificate names another authority or is not
    /// newer than the one we already hold.
    pub fn add_certificate(&mut self, cert: KeyCertificate) -> bool {
        if cert.authority_fingerprint != self.v3ident {
            return false;
        }
        if let Some(existing) = self
            .certificates
            .iter_mut()
            .find(|c| c.signing_key_fingerprint == cert.signing_key_fingerprint)
        {
            if cert.published <= existing.published {
                return false;
            }
            *existing = cert;
            return true;
        }
        self.certificates.push(cert);
        true
    }
}

/// The shared set of trusted authorities
pub struct TrustedAuthorities {
    servers: Mutex<Vec<DirectoryServer>>,
}

impl TrustedAuthorities {
    pub fn new(servers: Vec<DirectoryServer>) -> Self {
        Self {
            servers: Mutex::new(servers),
        }
    }

    /// Take the authority lock
    pub fn lock(&self) -> AuthorityGuard<'_> {
        AuthorityGuard {
            servers: self.servers.lock(),
        }
    }
}

impl Default for TrustedAuthorities {
    fn default() -> Self {
        let servers = DIRECTORY_AUTHORITIES
            .iter()
            .filter_map(|auth| {
                let v3ident = HexDigest::from_hex(auth.v3ident).ok()?;
                Some(DirectoryServer::new(auth.name, v3ident, auth.address))
            })
            .collect();
        Self::new(servers)
    }
}

/// Proof of holding the authority lock
pub struct AuthorityGuard<'a> {
    servers: MutexGuard<'a, Vec<DirectoryServer>>,
}

impl<'a> AuthorityGuard<'a> {
    pub fn authority_servers(&self) -> &[DirectoryServer] {
        &self.servers
    }

    pub fn authority_by_identity(&self, identity: &HexDigest) -> Option<&DirectoryServer> {
        self.servers.iter().find(|s| &s.v3ident == identity)
    }

    /// Store a certificate on the authority it names
    ///
    /// Returns false when no such authority exists or the certificate is
    /// already known.
    pub fn add_certificate(&mut self, cert: KeyCertificate) -> bool {
        match self
            .servers
            .iter_mut()
            .find(|s| s.v3ident == cert.authority_fingerprint)
        {
            Some(server) => server.add_certificate(cert),
            None => false,
        }
    }

    /// Whether the certificate names one of our authorities
    pub fn knows_authority(&self, cert: &KeyCertificate) -> bool {
        self.authority_by_identity(&cert.authority_fingerprint).is_some()
    }

    /// All certificates across all authorities
    pub fn all_certificates(&self) -> Vec<KeyCertificate> {
        self.servers
            .iter()
            .flat_map(|s| s.certificates.iter().cloned())
            .collect()
    }

    /// Take `inner` while already holding the authority lock
    ///
    /// This is the only sanctioned way to hold both locks, which keeps the
    /// acquisition order authority -> registry.
    pub fn lock_nested<'g, T>(&'g mut self, inner: &'g Mutex<T>) -> NestedGuard<'g, 'a, T> {
        let state = inner.lock();
        NestedGuard {
            authorities: self,
            state,
        }
    }
}

/// Both locks held, authority lock outermost
pub struct NestedGuard<'g, 'a, T> {
    pub authorities: &'g mut AuthorityGuard<'a>,
    pub state: MutexGuard<'g, T>,
}
