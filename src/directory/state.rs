//! Mutable directory state and the transitions on it
//!
//! Everything here runs with the registry lock held. Transitions that
//! need certificate knowledge take an `AuthorityGuard` as well, so they
//! can only be reached through `AuthorityGuard::lock_nested`.
//!
//! Nothing here performs I/O or calls listeners. Transitions return
//! `Effects`, which the caller applies after releasing the locks.

use super::registry::RouterRegistry;
use super::router::Router;
use crate::authority::AuthorityGuard;
use crate::protocol::{
    same_document, ConsensusDocument, HexDigest, KeyCertificate, RequiredCertificate, RouterDescriptor,
    VerificationStatus,
};
use std::collections::HashSet;
use std::sync::Arc;

/// Side effects of a state transition, applied outside the locks
#[derive(Default)]
pub(crate) struct Effects {
    pub save_consensus: Option<Arc<dyn ConsensusDocument>>,
    pub save_descriptors: Option<Vec<Arc<RouterDescriptor>>>,
    pub consensus_changed: bool,
    pub descriptors_changed: bool,
}

impl Effects {
    pub fn has_saves(&self) -> bool {
        self.save_consensus.is_some() || self.save_descriptors.is_some()
    }
}

#[derive(Debug)]
struct MinimumInfo {
    have: bool,
    need_recalculate: bool,
}

pub(crate) struct DirectoryState {
    pub registry: RouterRegistry,
    current_consensus: Option<Arc<dyn ConsensusDocument>>,
    pending_consensus: Option<Arc<dyn ConsensusDocument>>,
    required_certificates: HashSet<RequiredCertificate>,
    descriptors_dirty: bool,
    min_info: MinimumInfo,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self {
            registry: RouterRegistry::new(),
            current_consensus: None,
            pending_consensus: None,
            required_certificates: HashSet::new(),
            descriptors_dirty: false,
            min_info: MinimumInfo {
                have: false,
                need_recalculate: true,
            },
        }
    }

    pub fn current_consensus(&self) -> Option<&Arc<dyn ConsensusDocument>> {
        self.current_consensus.as_ref()
    }

    pub fn has_pending_consensus(&self) -> bool {
        self.pending_consensus.is_some()
    }

    pub fn required_certificates(&self) -> &HashSet<RequiredCertificate> {
        &self.required_certificates
    }

    // ===== Consensus adoption =====

    /// Validate `consensus` and install it if its signatures verify
    pub fn add_consensus_document(
        &mut self,
        authorities: &AuthorityGuard<'_>,
        consensus: Arc<dyn ConsensusDocument>,
        from_cache: bool,
    ) -> Effects {
        if !self.admissible(&consensus) {
            return Effects::default();
        }

        match consensus.verify_signatures(authorities) {
            VerificationStatus::Failed => {
                log::warn!("Unable to verify signatures on consensus document, discarding...");
                Effects::default()
            }
            VerificationStatus::NeedCertificates(required) => {
                log::info!(
                    "📜 Consensus waiting for {} authority certificates",
                    required.len()
                );
                self.required_certificates.extend(required);
                self.pending_consensus = Some(consensus);
                Effects::default()
            }
            VerificationStatus::Verified => self.install(consensus, from_cache),
        }
    }

    /// Equality and ordering checks against the installed consensus
    fn admissible(&self, consensus: &Arc<dyn ConsensusDocument>) -> bool {
        let current = match &self.current_consensus {
            Some(current) => current,
            None => return true,
        };
        if same_document(consensus, current) {
            log::debug!("Consensus document already installed");
            return false;
        }
        if consensus.valid_after() < current.valid_after() {
            log::warn!("New consensus document is older than current consensus document");
            return false;
        }
        true
    }

    /// Rebuild the registry from a verified consensus and install it
    fn install(&mut self, consensus: Arc<dyn ConsensusDocument>, from_cache: bool) -> Effects {
        let mut known = self.registry.take_all();

        for status in consensus.router_status_entries() {
            if !status.is_usable() {
                continue;
            }
            let router = match known.remove(&status.identity) {
                Some(mut router) => {
                    self.descriptors_dirty = true;
                    router.update_status(status.clone());
                    router
                }
                None => Router::from_status(status.clone()),
            };
            self.registry.insert(router);
        }
        log::info!(
            "📊 Loaded {} routers from consensus document",
            self.registry.len()
        );

        // A pending document no newer than this one could never be adopted
        if let Some(pending) = &self.pending_consensus {
            if pending.valid_after() <= consensus.valid_after() {
                self.pending_consensus = None;
            }
        }

        self.current_consensus = Some(consensus.clone());
        self.min_info.need_recalculate = true;

        Effects {
            save_consensus: (!from_cache).then_some(consensus),
            save_descriptors: self.take_dirty_descriptors(),
            consensus_changed: true,
            descriptors_changed: false,
        }
    }

    // ===== Certificate resolution =====

    /// Store a certificate and re-run a pending consensus it unblocks
    pub fn add_certificate(
        &mut self,
        authorities: &mut AuthorityGuard<'_>,
        certificate: KeyCertificate,
    ) -> Effects {
        let was_required = self.remove_required_certificate(&certificate);

        if !authorities.knows_authority(&certificate) {
            log::warn!(
                "Certificate read for unknown directory authority with identity: {}",
                certificate.authority_fingerprint
            );
            return Effects::default();
        }
        authorities.add_certificate(certificate);

        if !was_required {
            return Effects::default();
        }
        let pending = match self.pending_consensus.clone() {
            Some(pending) => pending,
            None => return Effects::default(),
        };

        match pending.verify_signatures(authorities) {
            VerificationStatus::Failed => {
                log::warn!("Pending consensus failed verification, discarding...");
                self.pending_consensus = None;
                Effects::default()
            }
            VerificationStatus::Verified => {
                log::info!("✅ Pending consensus verified");
                self.pending_consensus = None;
                if self.admissible(&pending) {
                    self.install(pending, false)
                } else {
                    Effects::default()
                }
            }
            VerificationStatus::NeedCertificates(required) => {
                self.required_certificates.extend(required);
                Effects::default()
            }
        }
    }

    fn remove_required_certificate(&mut self, certificate: &KeyCertificate) -> bool {
        let matching = self
            .required_certificates
            .iter()
            .find(|r| r.signing_key == certificate.signing_key_fingerprint)
            .cloned();
        match matching {
            Some(required) => self.required_certificates.remove(&required),
            None => false,
        }
    }

    // ===== Descriptor merge =====

    /// Attach a descriptor to its router if it is new and not stale
    pub fn add_descriptor(&mut self, descriptor: RouterDescriptor) -> Effects {
        let identity = descriptor.identity;
        let consensus_live = self
            .current_consensus
            .as_ref()
            .map(|c| c.is_live())
            .unwrap_or(false);

        let router = match self.registry.get_mut(&identity) {
            Some(router) => router,
            None => {
                if consensus_live {
                    log::warn!("Could not find router for descriptor: {}", identity);
                }
                return Effects::default();
            }
        };

        if let Some(old) = router.current_descriptor() {
            if **old == descriptor {
                return Effects::default();
            }
            if old.is_newer_than(&descriptor) {
                log::warn!(
                    "Attempting to add descriptor to router which is older than the descriptor we already have"
                );
                return Effects::default();
            }
        }

        router.update_descriptor(Arc::new(descriptor));
        self.registry.classify(&identity);
        self.descriptors_dirty = true;
        self.min_info.need_recalculate = true;

        Effects {
            descriptors_changed: true,
            ..Effects::default()
        }
    }

    /// Drop a router whose descriptor turned out to be unusable
    pub fn remove_router(&mut self, identity: &HexDigest) -> bool {
        log::debug!("Removing: {}", identity);
        let removed = self.registry.remove(identity).is_some();
        if removed {
            self.min_info.need_recalculate = true;
        }
        removed
    }

    /// Snapshot descriptors for saving and clear the dirty flag
    ///
    /// None if nothing changed since the last snapshot.
    pub fn take_dirty_descriptors(&mut self) -> Option<Vec<Arc<RouterDescriptor>>> {
        if !self.descriptors_dirty {
            return None;
        }
        self.descriptors_dirty = false;
        Some(
            self.registry
                .routers()
                .filter_map(|r| r.current_descriptor().cloned())
                .collect(),
        )
    }

    // ===== Minimum router info =====

    /// Whether more than a quarter of routers have usable descriptors
    ///
    /// Cached until the next adoption or descriptor merge.
    pub fn have_minimum_router_info(&mut self, now: u64, delay_secs: u64) -> bool {
        let live = self
            .current_consensus
            .as_ref()
            .map(|c| c.is_live())
            .unwrap_or(false);
        if !live {
            self.min_info.need_recalculate = true;
            self.min_info.have = false;
            return false;
        }
        if !self.min_info.need_recalculate {
            return self.min_info.have;
        }

        let router_count = self.registry.len();
        let descriptor_count = self
            .registry
            .routers()
            .filter(|r| !r.is_descriptor_downloadable_at(now, delay_secs))
            .count();

        self.min_info.need_recalculate = false;
        self.min_info.have = descriptor_count * 4 > router_count;
        log::debug!(
            "Minimum router info: {}/{} descriptors, have={}",
            descriptor_count,
            router_count,
            self.min_info.have
        );
        self.min_info.have
    }

    /// Routers whose descriptor should be fetched
    pub fn downloadable_routers(&self, now: u64, delay_secs: u64) -> Vec<Router> {
        self.registry
            .routers()
            .filter(|r| r.is_descriptor_downloadable_at(now, delay_secs))
            .cloned()
            .collect()
    }
}
