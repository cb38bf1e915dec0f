//! Router status entries and router descriptors
//!
//! A status entry is a relay's line in the consensus; a descriptor is
//! the fuller document the relay publishes itself. Both are keyed by
//! the relay's identity fingerprint.

use super::identity::HexDigest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};

pub const FLAG_RUNNING: &str = "Running";
pub const FLAG_VALID: &str = "Valid";
pub const FLAG_V2DIR: &str = "V2Dir";
pub const FLAG_BAD_DIRECTORY: &str = "BadDirectory";
pub const FLAG_GUARD: &str = "Guard";

/// Nickname shared by every relay that did not pick one
pub const UNNAMED: &str = "Unnamed";

/// Flags attached to a status entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterFlags(BTreeSet<String>);

impl RouterFlags {
    /// Parse flags from the consensus `s` line body
    pub fn from_string(flags: &str) -> Self {
        Self(flags.split_whitespace().map(str::to_string).collect())
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.0.contains(flag)
    }

    pub fn insert(&mut self, flag: impl Into<String>) {
        self.0.insert(flag.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for RouterFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// A relay's entry in a consensus document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterStatus {
    /// Relay nickname
    pub nickname: String,

    /// Identity fingerprint (join key with descriptors)
    pub identity: HexDigest,

    /// Digest of the descriptor this entry refers to
    pub descriptor_digest: HexDigest,

    /// Publication time of that descriptor (Unix seconds)
    pub published: u64,

    /// IPv4/IPv6 address
    pub address: IpAddr,

    /// OR (Onion Router) port
    pub or_port: u16,

    /// Directory port, 0 when the relay serves no directory
    pub dir_port: u16,

    /// Status flags
    pub flags: RouterFlags,

    /// Consensus bandwidth weight
    #[serde(default)]
    pub bandwidth: Option<u64>,
}

impl RouterStatus {
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.has_flag(flag)
    }

    /// Both Running and Valid; only such entries enter the registry
    pub fn is_usable(&self) -> bool {
        self.has_flag(FLAG_RUNNING) && self.has_flag(FLAG_VALID)
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.address, self.or_port)
    }
}

/// A relay-published router descriptor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterDescriptor {
    pub nickname: String,

    /// Identity fingerprint of the publishing relay
    pub identity: HexDigest,

    /// Digest of this document
    pub descriptor_digest: HexDigest,

    /// Publication time (Unix seconds)
    pub published: u64,

    pub address: IpAddr,
    pub or_port: u16,
    pub dir_port: u16,

    /// ntor onion key (base64)
    #[serde(default)]
    pub ntor_onion_key: Option<String>,

    /// Family declaration, "$<fingerprint> $<fingerprint> ..."
    #[serde(default)]
    pub family: Option<String>,

    /// Platform string, e.g. "Tor 0.4.8.9 on Linux"
    #[serde(default)]
    pub platform: Option<String>,
}

impl RouterDescriptor {
    /// Whether this descriptor was published strictly after `other`
    pub fn is_newer_than(&self, other: &RouterDescriptor) -> bool {
        self.published > other.published
    }
}

// Two descriptors are the same document iff their digests match.
impl PartialEq for RouterDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.descriptor_digest == other.descriptor_digest
    }
}

impl Eq for RouterDescriptor {}
