// Storage module for directory persistence
//
// The directory does not know how documents are encoded on disk. It
// talks to a `DirectoryStore`, which pushes cached documents back in
// through a `DirectorySink` at load time and accepts snapshots to save.
// Every call is synchronous and best-effort: a store that fails logs
// and carries on.

mod memory;

pub use memory::{MemoryStore, StoreStats};

use crate::guards::StateFile;
use crate::protocol::{ConsensusDocument, KeyCertificate, RouterDescriptor};
use std::sync::Arc;

/// Receiver of documents read back from a store
pub trait DirectorySink {
    fn add_certificate(&self, certificate: KeyCertificate);

    fn add_consensus_document(&self, consensus: Arc<dyn ConsensusDocument>, from_cache: bool);

    fn add_router_descriptor(&self, descriptor: RouterDescriptor);
}

/// Persistence gateway for directory state
pub trait DirectoryStore: Send + Sync {
    fn load_certificates(&self, sink: &dyn DirectorySink);

    fn load_consensus(&self, sink: &dyn DirectorySink);

    fn load_router_descriptors(&self, sink: &dyn DirectorySink);

    /// Feed the saved state file (guard entries) into `state`
    fn load_state_file(&self, state: &StateFile);

    fn save_certificates(&self, certificates: &[KeyCertificate]);

    fn save_consensus(&self, consensus: &Arc<dyn ConsensusDocument>);

    fn save_router_descriptors(&self, descriptors: &[Arc<RouterDescriptor>]);

    fn save_state_file(&self, data: &[u8]);
}
