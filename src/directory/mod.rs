//! Directory state manager
//!
//! `Directory` is the client's view of the network: the current
//! consensus, the routers it lists, the descriptors we hold for them and
//! the guard entries we picked. One instance is shared between fetch
//! workers, circuit builders and maintenance tasks.
//!
//! ## Locking
//!
//! Two locks guard the state:
//! - the authority lock inside `TrustedAuthorities`
//! - the registry lock around `DirectoryState`
//!
//! Whenever both are needed the authority lock is taken first, and the
//! registry lock is reached through `AuthorityGuard::lock_nested`. Store
//! saves and listener callbacks run after both locks are released.
//!
//! Saves are ordered by a third lock, `save_order`, taken before the
//! registry lock is released. Snapshots therefore reach the store in the
//! order they were taken, and the last save always holds the newest one.
//!
//! ## Bootstrap
//!
//! Queries on router and guard state wait until `load_from_store` has
//! run once. Documents pushed in through `DirectorySink` do not wait, as
//! the store itself feeds them during the load.

mod registry;
mod router;
mod selection;
mod state;

pub use router::Router;

use crate::authority::{AuthorityGuard, DirectoryServer, TrustedAuthorities};
use crate::bootstrap::BootstrapGate;
use crate::config::DirectoryConfig;
use crate::error::{DirectoryError, Result};
use crate::events::{EventHandler, EventManager};
use crate::guards::{GuardEntry, StateFile};
use crate::protocol::{
    unix_now, ConsensusDocument, HexDigest, KeyCertificate, RequiredCertificate, RouterDescriptor,
    UNNAMED,
};
use crate::storage::{DirectorySink, DirectoryStore};
use parking_lot::{Condvar, Mutex, MutexGuard};
use rand::rngs::StdRng;
use rand::SeedableRng;
use state::{DirectoryState, Effects};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use web_time::Instant;

/// Length of a `$<hex identity>` router name
const DOLLAR_NAME_LEN: usize = 41;

pub struct Directory {
    config: DirectoryConfig,
    store: Arc<dyn DirectoryStore>,
    authorities: Arc<TrustedAuthorities>,
    gate: BootstrapGate,
    state: Mutex<DirectoryState>,
    state_changed: Condvar,
    save_order: Mutex<()>,
    consensus_changed: EventManager,
    rng: Mutex<StdRng>,
    state_file: StateFile,
}

impl Directory {
    /// Directory trusting the well-known authorities
    pub fn new(config: DirectoryConfig, store: Arc<dyn DirectoryStore>) -> Self {
        Self::with_authorities(config, store, Arc::new(TrustedAuthorities::default()))
    }

    /// Directory sharing an authority registry with other components
    pub fn with_authorities(
        config: DirectoryConfig,
        store: Arc<dyn DirectoryStore>,
        authorities: Arc<TrustedAuthorities>,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            state_file: StateFile::new(store.clone()),
            config,
            store,
            authorities,
            gate: BootstrapGate::new(),
            state: Mutex::new(DirectoryState::new()),
            state_changed: Condvar::new(),
            save_order: Mutex::new(()),
            consensus_changed: EventManager::new(),
            rng: Mutex::new(rng),
        }
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    pub fn authorities(&self) -> &Arc<TrustedAuthorities> {
        &self.authorities
    }

    // ===== Bootstrap =====

    /// Load cached documents and the state file from the store
    ///
    /// Runs once; later calls return immediately, or wait if a load is
    /// still in progress on another thread.
    pub fn load_from_store(&self) {
        let loaded = self.gate.run_once(|| {
            log::info!("📂 Loading cached network information");
            let mut last = Instant::now();
            let mut phase = |name: &str| {
                log::debug!("Loaded {} in {} ms", name, last.elapsed().as_millis());
                last = Instant::now();
            };

            self.store.load_certificates(self);
            phase("certificates");

            self.store.load_consensus(self);
            phase("consensus");

            self.store.load_router_descriptors(self);
            phase("descriptors");

            self.store.load_state_file(&self.state_file);
            phase("state file");
        });
        if loaded {
            log::info!("✅ Directory loaded");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.gate.is_loaded()
    }

    /// Block until the directory has been loaded
    pub fn wait_until_loaded(&self) {
        self.gate.wait();
    }

    /// Block until loaded or `timeout` elapses
    pub fn wait_until_loaded_timeout(&self, timeout: Duration) -> Result<()> {
        self.gate.wait_timeout(timeout)
    }

    /// Wait bounded by the configured bootstrap timeout, if any
    pub fn wait_until_loaded_timeout_default(&self) -> Result<()> {
        match self.config.bootstrap_timeout() {
            Some(timeout) => self.wait_until_loaded_timeout(timeout),
            None => {
                self.wait_until_loaded();
                Ok(())
            }
        }
    }

    /// Resolves once the directory is loaded; dropping it cancels the wait
    pub fn loaded(&self) -> impl Future<Output = bool> + Send + 'static {
        self.gate.loaded()
    }

    // ===== Consensus =====

    pub fn current_consensus(&self) -> Option<Arc<dyn ConsensusDocument>> {
        self.state.lock().current_consensus().cloned()
    }

    pub fn has_pending_consensus(&self) -> bool {
        let mut authorities = self.authorities.lock();
        let nested = authorities.lock_nested(&self.state);
        let pending = nested.state.has_pending_consensus();
        pending
    }

    /// Certificates still needed by the pending consensus
    pub fn required_certificates(&self) -> HashSet<RequiredCertificate> {
        self.state.lock().required_certificates().clone()
    }

    /// Submit a consensus document
    ///
    /// Rejected documents are dropped with a log line. `from_cache`
    /// suppresses the consensus save.
    pub fn add_consensus(&self, consensus: Arc<dyn ConsensusDocument>, from_cache: bool) {
        let (effects, save_order) = {
            let mut authorities = self.authorities.lock();
            let nested = authorities.lock_nested(&self.state);
            let authorities: &AuthorityGuard<'_> = nested.authorities;
            let mut state = nested.state;
            let effects = state.add_consensus_document(authorities, consensus, from_cache);
            let save_order = self.save_order_for(&effects);
            (effects, save_order)
        };
        self.apply_effects(effects, save_order);
    }

    /// Submit an authority key certificate
    pub fn add_key_certificate(&self, certificate: KeyCertificate) {
        let (effects, save_order) = {
            let mut authorities = self.authorities.lock();
            let nested = authorities.lock_nested(&self.state);
            let authorities = nested.authorities;
            let mut state = nested.state;
            let effects = state.add_certificate(authorities, certificate);
            let save_order = self.save_order_for(&effects);
            (effects, save_order)
        };
        self.apply_effects(effects, save_order);
    }

    pub fn register_consensus_changed_handler(&self, handler: Arc<dyn EventHandler>) {
        self.consensus_changed.add_listener(handler);
    }

    pub fn unregister_consensus_changed_handler(&self, handler: &Arc<dyn EventHandler>) {
        self.consensus_changed.remove_listener(handler);
    }

    // ===== Descriptors =====

    /// Submit a router descriptor
    pub fn add_descriptor(&self, descriptor: RouterDescriptor) {
        let (effects, save_order) = {
            let mut state = self.state.lock();
            let effects = state.add_descriptor(descriptor);
            let save_order = self.save_order_for(&effects);
            (effects, save_order)
        };
        self.apply_effects(effects, save_order);
    }

    pub fn add_descriptors(&self, descriptors: impl IntoIterator<Item = RouterDescriptor>) {
        let mut changed = false;
        {
            let mut state = self.state.lock();
            for descriptor in descriptors {
                changed |= state.add_descriptor(descriptor).descriptors_changed;
            }
        }
        if changed {
            self.state_changed.notify_all();
        }
    }

    /// Remove the router a bad descriptor belongs to
    pub fn mark_descriptor_invalid(&self, descriptor: &RouterDescriptor) {
        self.wait_until_loaded();
        self.state.lock().remove_router(&descriptor.identity);
    }

    /// Routers that need a descriptor fetch, in random order
    pub fn routers_with_downloadable_descriptors(&self) -> Vec<Router> {
        self.wait_until_loaded();
        let mut routers = self
            .state
            .lock()
            .downloadable_routers(unix_now(), self.config.descriptor_download_delay_secs);
        selection::shuffle_in_place(&mut routers, &mut *self.rng.lock());
        routers
    }

    // ===== Minimum router info =====

    pub fn have_minimum_router_info(&self) -> bool {
        self.state
            .lock()
            .have_minimum_router_info(unix_now(), self.config.descriptor_download_delay_secs)
    }

    /// Block until enough descriptors are known, or `timeout` elapses
    ///
    /// Returns the final value of `have_minimum_router_info`.
    pub fn wait_for_minimum_router_info(&self, timeout: Duration) -> bool {
        // A timeout past the end of the clock waits without bound
        let deadline = Instant::now().checked_add(timeout);
        let delay = self.config.descriptor_download_delay_secs;
        let mut state = self.state.lock();
        loop {
            if state.have_minimum_router_info(unix_now(), delay) {
                return true;
            }
            let deadline = match deadline {
                Some(deadline) => deadline,
                None => {
                    self.state_changed.wait(&mut state);
                    continue;
                }
            };
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            if self
                .state_changed
                .wait_for(&mut state, deadline - now)
                .timed_out()
            {
                return state.have_minimum_router_info(unix_now(), delay);
            }
        }
    }

    // ===== Lookups =====

    /// Look up by nickname, or by `$<hex identity>`
    ///
    /// "Unnamed" and malformed `$` names never match.
    pub fn router_by_name(&self, name: &str) -> Option<Router> {
        if name == UNNAMED {
            return None;
        }
        if name.len() == DOLLAR_NAME_LEN && name.starts_with('$') {
            let identity = HexDigest::from_dollar_name(name)?;
            return self.router_by_identity(&identity);
        }
        self.wait_until_loaded();
        self.state.lock().registry.by_nickname(name).cloned()
    }

    pub fn router_by_identity(&self, identity: &HexDigest) -> Option<Router> {
        self.wait_until_loaded();
        self.state.lock().registry.get(identity).cloned()
    }

    /// Resolve every name
    ///
    /// With `strict_name_lookup` an unknown name fails the whole batch,
    /// otherwise unknown names are skipped.
    pub fn router_list_by_names<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Router>> {
        self.wait_until_loaded();
        let mut routers = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.router_by_name(name) {
                Some(router) => routers.push(router),
                None if self.config.strict_name_lookup => {
                    return Err(DirectoryError::RouterNotFound(name.to_string()));
                }
                None => log::debug!("Skipping unknown router name: {}", name),
            }
        }
        Ok(routers)
    }

    /// Resolve every name, one result per name
    pub fn lookup_routers_by_names<S: AsRef<str>>(&self, names: &[S]) -> Vec<Option<Router>> {
        names
            .iter()
            .map(|name| self.router_by_name(name.as_ref()))
            .collect()
    }

    pub fn all_routers(&self) -> Vec<Router> {
        self.wait_until_loaded();
        self.state.lock().registry.routers().cloned().collect()
    }

    // ===== Authorities and caches =====

    pub fn directory_authorities(&self) -> Vec<DirectoryServer> {
        self.authorities.lock().authority_servers().to_vec()
    }

    pub fn random_directory_authority(&self) -> Option<DirectoryServer> {
        let authorities = self.authorities.lock();
        selection::pick_uniform(authorities.authority_servers(), &mut *self.rng.lock()).cloned()
    }

    pub fn random_directory_cache(&self) -> Option<Router> {
        self.wait_until_loaded();
        let state = self.state.lock();
        let mut rng = self.rng.lock();
        state.registry.random_directory_cache(&mut *rng).cloned()
    }

    pub fn directory_caches(&self) -> Vec<Router> {
        self.wait_until_loaded();
        self.state.lock().registry.directory_caches().cloned().collect()
    }

    // ===== Persistence =====

    /// Save every known authority certificate
    pub fn store_certificates(&self) {
        let (certificates, _save_order) = {
            let authorities = self.authorities.lock();
            (authorities.all_certificates(), self.save_order.lock())
        };
        self.store.save_certificates(&certificates);
    }

    /// Save the current consensus, if any
    pub fn store_consensus(&self) {
        let (consensus, _save_order) = {
            let state = self.state.lock();
            let consensus = match state.current_consensus() {
                Some(consensus) => consensus.clone(),
                None => return,
            };
            (consensus, self.save_order.lock())
        };
        self.store.save_consensus(&consensus);
    }

    /// Save descriptors if any changed since the last save
    pub fn store_descriptors(&self) {
        let (descriptors, _save_order) = {
            let mut state = self.state.lock();
            let descriptors = match state.take_dirty_descriptors() {
                Some(descriptors) => descriptors,
                None => return,
            };
            (descriptors, self.save_order.lock())
        };
        self.store.save_router_descriptors(&descriptors);
    }

    /// Take the save-order lock if `effects` has anything to save
    ///
    /// Must be called while the registry lock is still held.
    fn save_order_for(&self, effects: &Effects) -> Option<MutexGuard<'_, ()>> {
        effects.has_saves().then(|| self.save_order.lock())
    }

    fn apply_effects(&self, effects: Effects, save_order: Option<MutexGuard<'_, ()>>) {
        if let Some(consensus) = &effects.save_consensus {
            self.store.save_consensus(consensus);
        }
        if let Some(descriptors) = &effects.save_descriptors {
            self.store.save_router_descriptors(descriptors);
        }
        // Listeners may submit documents themselves
        drop(save_order);

        if effects.consensus_changed || effects.descriptors_changed {
            self.state_changed.notify_all();
        }
        if effects.consensus_changed {
            self.consensus_changed.fire_event();
        }
    }

    // ===== Guard entries =====

    pub fn create_guard_entry_for(&self, router: &Router) -> GuardEntry {
        self.wait_until_loaded();
        self.state_file.create_guard_entry_for(router)
    }

    pub fn guard_entries(&self) -> Vec<GuardEntry> {
        self.wait_until_loaded();
        self.state_file.guard_entries()
    }

    pub fn add_guard_entry(&self, entry: GuardEntry) {
        self.wait_until_loaded();
        self.state_file.add_guard_entry(entry);
    }

    pub fn remove_guard_entry(&self, entry: &GuardEntry) {
        self.wait_until_loaded();
        self.state_file.remove_guard_entry(entry);
    }
}

impl DirectorySink for Directory {
    fn add_certificate(&self, certificate: KeyCertificate) {
        self.add_key_certificate(certificate);
    }

    fn add_consensus_document(&self, consensus: Arc<dyn ConsensusDocument>, from_cache: bool) {
        self.add_consensus(consensus, from_cache);
    }

    fn add_router_descriptor(&self, descriptor: RouterDescriptor) {
        self.add_descriptor(descriptor);
    }
}
