//! Guard Entry Persistence
//!
//! Keeps the list of chosen entry guards in the client state file.
//!
//! ## Security Rationale
//!
//! Guard persistence is crucial for security:
//! - Using the same guards for months limits an adversary's observation window
//! - Frequent guard rotation increases chance of hitting malicious guards
//!
//! Selection policy lives elsewhere in the client; this module only
//! stores, lists and removes entries, and writes the state file back
//! through the `DirectoryStore` after every change.

use crate::directory::Router;
use crate::error::{DirectoryError, Result};
use crate::protocol::HexDigest;
use crate::storage::DirectoryStore;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Version of the state file format
pub const STATE_FILE_VERSION: u32 = 1;

/// A persisted entry guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardEntry {
    /// Guard nickname at selection time
    pub nickname: String,

    /// Guard identity fingerprint
    pub identity: HexDigest,

    /// Platform string of the guard when chosen
    #[serde(default)]
    pub version: Option<String>,

    /// When this guard was chosen (Unix seconds)
    pub created: u64,

    /// Since when the guard has been unreachable
    #[serde(default)]
    pub down_since: Option<u64>,

    /// Last time we tried to connect while it was down
    #[serde(default)]
    pub last_connect_attempt: Option<u64>,

    /// Since when the guard has been missing from the consensus
    #[serde(default)]
    pub unlisted_since: Option<u64>,
}

impl GuardEntry {
    pub fn is_down(&self) -> bool {
        self.down_since.is_some()
    }

    /// Record a failed connection
    pub fn mark_down(&mut self, now: u64) {
        if self.down_since.is_none() {
            self.down_since = Some(now);
        }
        self.last_connect_attempt = Some(now);
    }

    /// Record a successful connection
    pub fn clear_down(&mut self) {
        self.down_since = None;
        self.last_connect_attempt = None;
    }

    pub fn mark_unlisted(&mut self, now: u64) {
        if self.unlisted_since.is_none() {
            self.unlisted_since = Some(now);
        }
    }

    pub fn clear_unlisted(&mut self) {
        self.unlisted_since = None;
    }
}

#[derive(Serialize, Deserialize)]
struct StateFileData {
    version: u32,
    guards: Vec<GuardEntry>,
}

/// Client state file holding guard entries
pub struct StateFile {
    store: Arc<dyn DirectoryStore>,
    entries: Mutex<Vec<GuardEntry>>,
}

impl StateFile {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self {
            store,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Build an entry for `router`; it is not stored until `add_guard_entry`
    pub fn create_guard_entry_for(&self, router: &Router) -> GuardEntry {
        GuardEntry {
            nickname: router.nickname().to_string(),
            identity: *router.identity(),
            version: router
                .current_descriptor()
                .and_then(|d| d.platform.clone()),
            created: crate::protocol::unix_now(),
            down_since: None,
            last_connect_attempt: None,
            unlisted_since: None,
        }
    }

    pub fn guard_entries(&self) -> Vec<GuardEntry> {
        self.entries.lock().clone()
    }

    /// Add an entry; an entry with the same identity is left in place
    pub fn add_guard_entry(&self, entry: GuardEntry) {
        let mut entries = self.entries.lock();
        if entries.iter().any(|e| e.identity == entry.identity) {
            log::debug!("Guard {} already in state file", entry.identity.short());
            return;
        }
        log::info!("🛡️ Adding guard {} ({})", entry.nickname, entry.identity.short());
        entries.push(entry);
        self.write(&entries);
    }

    /// Remove the entry with the same identity, if present
    pub fn remove_guard_entry(&self, entry: &GuardEntry) {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|e| e.identity != entry.identity);
        if entries.len() != before {
            log::info!("🗑️ Removed guard {} ({})", entry.nickname, entry.identity.short());
            self.write(&entries);
        }
    }

    /// Replace the in-memory entries with a saved state file
    pub fn parse(&self, data: &[u8]) -> Result<()> {
        let parsed: StateFileData = serde_json::from_slice(data)
            .map_err(|e| DirectoryError::StateFile(format!("Failed to deserialize state file: {}", e)))?;
        if parsed.version != STATE_FILE_VERSION {
            return Err(DirectoryError::StateFile(format!(
                "Unsupported state file version {}",
                parsed.version
            )));
        }
        log::info!("📂 Loaded {} guard entries from state file", parsed.guards.len());
        *self.entries.lock() = parsed.guards;
        Ok(())
    }

    /// Serialize entries to JSON for storage
    pub fn to_json(&self) -> Result<Vec<u8>> {
        Self::encode(&self.entries.lock())
    }

    fn encode(entries: &[GuardEntry]) -> Result<Vec<u8>> {
        let data = StateFileData {
            version: STATE_FILE_VERSION,
            guards: entries.to_vec(),
        };
        serde_json::to_vec(&data)
            .map_err(|e| DirectoryError::StateFile(format!("Failed to serialize state file: {}", e)))
    }

    // Called with the entries lock held so saves land in mutation order.
    fn write(&self, entries: &[GuardEntry]) {
        match Self::encode(entries) {
            Ok(bytes) => self.store.save_state_file(&bytes),
            Err(e) => log::warn!("⚠️ {}", e),
        }
    }
}
