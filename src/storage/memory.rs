// In-memory directory store
//
// Keeps the last saved snapshot of every document kind and counts save
// calls. Useful for embedding without a disk and for tests.

use super::{DirectorySink, DirectoryStore};
use crate::guards::StateFile;
use crate::protocol::{ConsensusDocument, KeyCertificate, RouterDescriptor};
use parking_lot::Mutex;
use std::sync::Arc;

/// How many times each save was called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub certificate_saves: usize,
    pub consensus_saves: usize,
    pub descriptor_saves: usize,
    pub state_file_saves: usize,
}

#[derive(Default)]
struct Contents {
    certificates: Vec<KeyCertificate>,
    consensus: Option<Arc<dyn ConsensusDocument>>,
    descriptors: Vec<Arc<RouterDescriptor>>,
    state_file: Option<Vec<u8>>,
    stats: StoreStats,
}

#[derive(Default)]
pub struct MemoryStore {
    contents: Mutex<Contents>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate the cached consensus
    pub fn with_consensus(self, consensus: Arc<dyn ConsensusDocument>) -> Self {
        self.contents.lock().consensus = Some(consensus);
        self
    }

    pub fn with_certificates(self, certificates: Vec<KeyCertificate>) -> Self {
        self.contents.lock().certificates = certificates;
        self
    }

    pub fn with_descriptors(self, descriptors: Vec<RouterDescriptor>) -> Self {
        self.contents.lock().descriptors = descriptors.into_iter().map(Arc::new).collect();
        self
    }

    pub fn with_state_file(self, data: Vec<u8>) -> Self {
        self.contents.lock().state_file = Some(data);
        self
    }

    pub fn stats(&self) -> StoreStats {
        self.contents.lock().stats
    }

    pub fn saved_consensus(&self) -> Option<Arc<dyn ConsensusDocument>> {
        self.contents.lock().consensus.clone()
    }

    pub fn saved_certificates(&self) -> Vec<KeyCertificate> {
        self.contents.lock().certificates.clone()
    }

    pub fn saved_descriptors(&self) -> Vec<Arc<RouterDescriptor>> {
        self.contents.lock().descriptors.clone()
    }

    pub fn saved_state_file(&self) -> Option<Vec<u8>> {
        self.contents.lock().state_file.clone()
    }
}

impl DirectoryStore for MemoryStore {
    fn load_certificates(&self, sink: &dyn DirectorySink) {
        // The sink may call back into us; never hold the lock across it
        let certificates = self.contents.lock().certificates.clone();
        log::debug!("Loading {} cached certificates", certificates.len());
        for cert in certificates {
            sink.add_certificate(cert);
        }
    }

    fn load_consensus(&self, sink: &dyn DirectorySink) {
        let consensus = self.contents.lock().consensus.clone();
        match consensus {
            Some(consensus) => sink.add_consensus_document(consensus, true),
            None => log::debug!("No cached consensus found"),
        }
    }

    fn load_router_descriptors(&self, sink: &dyn DirectorySink) {
        let descriptors = self.contents.lock().descriptors.clone();
        log::debug!("Loading {} cached descriptors", descriptors.len());
        for descriptor in descriptors {
            sink.add_router_descriptor(descriptor.as_ref().clone());
        }
    }

    fn load_state_file(&self, state: &StateFile) {
        let data = self.contents.lock().state_file.clone();
        if let Some(data) = data {
            if let Err(e) = state.parse(&data) {
                log::warn!("⚠️ Failed to load state file: {}", e);
            }
        }
    }

    fn save_certificates(&self, certificates: &[KeyCertificate]) {
        let mut contents = self.contents.lock();
        contents.certificates = certificates.to_vec();
        contents.stats.certificate_saves += 1;
    }

    fn save_consensus(&self, consensus: &Arc<dyn ConsensusDocument>) {
        let mut contents = self.contents.lock();
        contents.consensus = Some(consensus.clone());
        contents.stats.consensus_saves += 1;
    }

    fn save_router_descriptors(&self, descriptors: &[Arc<RouterDescriptor>]) {
        let mut contents = self.contents.lock();
        contents.descriptors = descriptors.to_vec();
        contents.stats.descriptor_saves += 1;
    }

    fn save_state_file(&self, data: &[u8]) {
        let mut contents = self.contents.lock();
        contents.state_file = Some(data.to_vec());
        contents.stats.state_file_saves += 1;
    }
}
