//! # Tor Directory State
//!
//! The client-side directory manager of a Tor client: it holds the
//! network view derived from consensus documents signed by the directory
//! authorities, joins it with router descriptors as they arrive, and
//! keeps the client's guard entries.
//!
//! ## Architecture
//!
//! ```text
//! fetchers / DirectoryStore
//!   ↓ consensus, certificates, descriptors
//! Directory
//!   ├─ TrustedAuthorities   (authority lock, certificates)
//!   ├─ DirectoryState       (registry lock: routers, consensus)
//!   ├─ BootstrapGate        (one-shot load)
//!   └─ StateFile            (guard entries)
//!   ↓
//! circuit builders, path selection
//! ```
//!
//! ## Features
//!
//! - **Certificate-aware adoption**: a consensus missing signing
//!   certificates waits as pending and is adopted once they arrive
//! - **Stale-document rejection**: older or duplicate consensuses and
//!   descriptors never replace newer state
//! - **Lazy bootstrap**: queries wait until the cached state is loaded,
//!   with blocking, timed and async waits
//! - **Thread-safe**: one `Directory` is shared across worker threads

pub mod authority;
pub mod bootstrap;
pub mod config;
pub mod directory;
pub mod error;
pub mod events;
pub mod guards;
pub mod protocol;
pub mod random_set;
pub mod storage;

pub use authority::{DirectoryServer, TrustedAuthorities, DIRECTORY_AUTHORITIES};
pub use config::DirectoryConfig;
pub use directory::{Directory, Router};
pub use error::{DirectoryError, ErrorCode, Result};
pub use events::EventHandler;
pub use guards::GuardEntry;
pub use protocol::{
    ConsensusDocument, HexDigest, KeyCertificate, RequiredCertificate, RouterDescriptor,
    RouterStatus, VerificationStatus,
};
pub use storage::{DirectorySink, DirectoryStore, MemoryStore};
