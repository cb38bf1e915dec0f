//! Shared fixtures for the directory integration tests

#![allow(dead_code)]

use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::sync::mpsc;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tor_dirstate::authority::AuthorityGuard;
use tor_dirstate::guards::StateFile;
use tor_dirstate::protocol::RouterFlags;
use tor_dirstate::{
    ConsensusDocument, DirectorySink, DirectoryStore, EventHandler, HexDigest, KeyCertificate,
    MemoryStore, RequiredCertificate, RouterDescriptor, RouterStatus, VerificationStatus,
    DIRECTORY_AUTHORITIES,
};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn id(byte: u8) -> HexDigest {
    HexDigest::from_bytes([byte; 20])
}

/// Status entry published long enough ago to be downloadable
pub fn status(byte: u8, nickname: &str, flags: &str) -> RouterStatus {
    RouterStatus {
        nickname: nickname.into(),
        identity: id(byte),
        descriptor_digest: id(byte),
        published: 0,
        address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, byte)),
        or_port: 9001,
        dir_port: 0,
        flags: RouterFlags::from_string(flags),
        bandwidth: Some(1_000),
    }
}

pub fn cache_status(byte: u8, nickname: &str) -> RouterStatus {
    RouterStatus {
        dir_port: 9030,
        ..status(byte, nickname, "Running Valid V2Dir")
    }
}

/// Descriptor matching the digest listed by `status(byte, ..)`
pub fn descriptor(byte: u8, published: u64) -> RouterDescriptor {
    RouterDescriptor {
        nickname: format!("relay{}", byte),
        identity: id(byte),
        descriptor_digest: id(byte),
        published,
        address: IpAddr::V4(Ipv4Addr::new(10, 0, 0, byte)),
        or_port: 9001,
        dir_port: 0,
        ntor_onion_key: Some("bnRvci1rZXk=".into()),
        family: None,
        platform: Some("Tor 0.4.8.10".into()),
    }
}

pub fn authority_identity(index: usize) -> HexDigest {
    HexDigest::from_hex(DIRECTORY_AUTHORITIES[index].v3ident).expect("authority fingerprint")
}

pub fn certificate(authority: HexDigest, signing_key: u8) -> KeyCertificate {
    KeyCertificate {
        authority_fingerprint: authority,
        signing_key_fingerprint: id(signing_key),
        signing_key_der: vec![0x30, 0x00],
        published: 0,
        expires: u64::MAX,
    }
}

pub fn required(authority: HexDigest, signing_key: u8) -> RequiredCertificate {
    RequiredCertificate {
        authority,
        signing_key: id(signing_key),
    }
}

/// Consensus double with a queue of verification outcomes
///
/// The last outcome repeats once the queue runs dry.
#[derive(Debug)]
pub struct ScriptedConsensus {
    valid_after: u64,
    live: bool,
    entries: Vec<RouterStatus>,
    outcomes: Mutex<VecDeque<VerificationStatus>>,
    last: Mutex<VerificationStatus>,
    verifications: AtomicUsize,
}

impl ScriptedConsensus {
    pub fn new(valid_after: u64, entries: Vec<RouterStatus>) -> Self {
        Self {
            valid_after,
            live: true,
            entries,
            outcomes: Mutex::new(VecDeque::new()),
            last: Mutex::new(VerificationStatus::Verified),
            verifications: AtomicUsize::new(0),
        }
    }

    pub fn not_live(mut self) -> Self {
        self.live = false;
        self
    }

    pub fn with_outcomes(self, outcomes: Vec<VerificationStatus>) -> Self {
        *self.outcomes.lock() = outcomes.into();
        self
    }

    pub fn needing(self, required: &[RequiredCertificate]) -> Self {
        let set: HashSet<_> = required.iter().cloned().collect();
        self.with_outcomes(vec![
            VerificationStatus::NeedCertificates(set),
            VerificationStatus::Verified,
        ])
    }

    pub fn verifications(&self) -> usize {
        self.verifications.load(Ordering::SeqCst)
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl ConsensusDocument for ScriptedConsensus {
    fn valid_after(&self) -> u64 {
        self.valid_after
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn digest(&self) -> [u8; 32] {
        let mut digest = [0u8; 32];
        digest[..8].copy_from_slice(&self.valid_after.to_be_bytes());
        digest[8] = self.entries.len() as u8;
        digest
    }

    fn router_status_entries(&self) -> &[RouterStatus] {
        &self.entries
    }

    fn verify_signatures(&self, _authorities: &AuthorityGuard<'_>) -> VerificationStatus {
        self.verifications.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock();
        if let Some(next) = self.outcomes.lock().pop_front() {
            *last = next;
        }
        last.clone()
    }
}

/// Handler counting the signals it receives
pub fn counting_handler() -> (Arc<AtomicUsize>, Arc<dyn EventHandler>) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = count.clone();
    let handler: Arc<dyn EventHandler> = Arc::new(move || {
        inner.fetch_add(1, Ordering::SeqCst);
    });
    (count, handler)
}

/// Which save a `GatedStore` holds back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Consensus,
    Descriptors,
}

/// Store whose first save of one kind blocks until released
///
/// `entered` fires once that save has started; sending on the release
/// channel lets it finish.
pub struct GatedStore {
    pub inner: MemoryStore,
    gate: Gate,
    entered: Mutex<Option<mpsc::Sender<()>>>,
    release: Mutex<Option<mpsc::Receiver<()>>>,
}

impl GatedStore {
    pub fn new(gate: Gate) -> (Arc<Self>, mpsc::Receiver<()>, mpsc::Sender<()>) {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel();
        let store = Arc::new(Self {
            inner: MemoryStore::new(),
            gate,
            entered: Mutex::new(Some(entered_tx)),
            release: Mutex::new(Some(release_rx)),
        });
        (store, entered_rx, release_tx)
    }

    fn hold(&self, kind: Gate) {
        if kind != self.gate {
            return;
        }
        let release = self.release.lock().take();
        if let Some(release) = release {
            if let Some(entered) = self.entered.lock().take() {
                let _ = entered.send(());
            }
            let _ = release.recv();
        }
    }
}

impl DirectoryStore for GatedStore {
    fn load_certificates(&self, sink: &dyn DirectorySink) {
        self.inner.load_certificates(sink);
    }

    fn load_consensus(&self, sink: &dyn DirectorySink) {
        self.inner.load_consensus(sink);
    }

    fn load_router_descriptors(&self, sink: &dyn DirectorySink) {
        self.inner.load_router_descriptors(sink);
    }

    fn load_state_file(&self, state: &StateFile) {
        self.inner.load_state_file(state);
    }

    fn save_certificates(&self, certificates: &[KeyCertificate]) {
        self.inner.save_certificates(certificates);
    }

    fn save_consensus(&self, consensus: &Arc<dyn ConsensusDocument>) {
        self.hold(Gate::Consensus);
        self.inner.save_consensus(consensus);
    }

    fn save_router_descriptors(&self, descriptors: &[Arc<RouterDescriptor>]) {
        self.hold(Gate::Descriptors);
        self.inner.save_router_descriptors(descriptors);
    }

    fn save_state_file(&self, data: &[u8]) {
        self.inner.save_state_file(data);
    }
}
