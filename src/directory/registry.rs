//! Router registry
//!
//! Three indices over the routers of the current consensus:
//! - identity -> router (authoritative)
//! - nickname -> identity (best effort, first registrant wins)
//! - directory caches (random-draw set)
//!
//! The registry knows nothing about locks; `DirectoryState` owns it and
//! lives behind the directory's registry mutex.

use super::router::Router;
use crate::protocol::{HexDigest, FLAG_BAD_DIRECTORY, FLAG_V2DIR, UNNAMED};
use crate::random_set::RandomSet;
use rand::Rng;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub(crate) struct RouterRegistry {
    by_identity: HashMap<HexDigest, Router>,
    by_nickname: HashMap<String, HexDigest>,
    directory_caches: RandomSet<HexDigest>,
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty every index, handing back the old identity map
    pub fn take_all(&mut self) -> HashMap<HexDigest, Router> {
        self.by_nickname.clear();
        self.directory_caches.clear();
        std::mem::take(&mut self.by_identity)
    }

    /// Insert into the identity and nickname maps and classify
    pub fn insert(&mut self, router: Router) {
        let identity = *router.identity();
        self.add_by_nickname(&router);
        self.by_identity.insert(identity, router);
        self.classify(&identity);
    }

    fn add_by_nickname(&mut self, router: &Router) {
        let name = router.nickname();
        if name.is_empty() || name == UNNAMED {
            return;
        }
        if self.by_nickname.contains_key(name) {
            log::trace!("Duplicate router nickname: {}", name);
            return;
        }
        self.by_nickname.insert(name.to_string(), *router.identity());
    }

    /// Recompute directory-cache membership for one router
    pub fn classify(&mut self, identity: &HexDigest) {
        match self.by_identity.get(identity) {
            Some(router) if Self::is_valid_directory_cache(router) => {
                self.directory_caches.add(*identity);
            }
            _ => {
                self.directory_caches.remove(identity);
            }
        }
    }

    fn is_valid_directory_cache(router: &Router) -> bool {
        if router.directory_port() == 0 {
            return false;
        }
        if router.has_flag(FLAG_BAD_DIRECTORY) {
            return false;
        }
        router.has_flag(FLAG_V2DIR)
    }

    /// Remove a router from every index
    ///
    /// The nickname entry goes only if it still names this router.
    pub fn remove(&mut self, identity: &HexDigest) -> Option<Router> {
        let router = self.by_identity.remove(identity)?;
        if self.by_nickname.get(router.nickname()) == Some(identity) {
            self.by_nickname.remove(router.nickname());
        }
        self.directory_caches.remove(identity);
        Some(router)
    }

    pub fn get(&self, identity: &HexDigest) -> Option<&Router> {
        self.by_identity.get(identity)
    }

    pub fn get_mut(&mut self, identity: &HexDigest) -> Option<&mut Router> {
        self.by_identity.get_mut(identity)
    }

    pub fn by_nickname(&self, name: &str) -> Option<&Router> {
        if name == UNNAMED {
            return None;
        }
        let identity = self.by_nickname.get(name)?;
        self.by_identity.get(identity)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn routers(&self) -> impl Iterator<Item = &Router> {
        self.by_identity.values()
    }

    #[cfg(test)]
    fn is_directory_cache(&self, identity: &HexDigest) -> bool {
        self.directory_caches.contains(identity)
    }

    pub fn directory_caches(&self) -> impl Iterator<Item = &Router> {
        self.directory_caches
            .iter()
            .filter_map(|id| self.by_identity.get(id))
    }

    pub fn random_directory_cache<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Router> {
        let identity = self.directory_caches.random(rng)?;
        self.by_identity.get(identity)
    }

    #[cfg(test)]
    pub fn nickname_target(&self, name: &str) -> Option<&HexDigest> {
        self.by_nickname.get(name)
    }
}
