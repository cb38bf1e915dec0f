//! Router records
//!
//! A `Router` joins the latest consensus status entry for a relay with
//! the latest descriptor we hold for it.

use crate::protocol::{HexDigest, RouterDescriptor, RouterStatus};
use std::sync::Arc;

/// Registry entry for one relay
///
/// Cloning is cheap; lookups hand out clones as snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    status: Arc<RouterStatus>,
    descriptor: Option<Arc<RouterDescriptor>>,
}

impl Router {
    /// New router known only from its status entry
    pub fn from_status(status: RouterStatus) -> Self {
        Self {
            status: Arc::new(status),
            descriptor: None,
        }
    }

    pub(crate) fn update_status(&mut self, status: RouterStatus) {
        self.status = Arc::new(status);
    }

    pub(crate) fn update_descriptor(&mut self, descriptor: Arc<RouterDescriptor>) {
        self.descriptor = Some(descriptor);
    }

    pub fn status(&self) -> &RouterStatus {
        &self.status
    }

    pub fn current_descriptor(&self) -> Option<&Arc<RouterDescriptor>> {
        self.descriptor.as_ref()
    }

    pub fn identity(&self) -> &HexDigest {
        &self.status.identity
    }

    pub fn nickname(&self) -> &str {
        &self.status.nickname
    }

    pub fn directory_port(&self) -> u16 {
        self.status.dir_port
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.status.has_flag(flag)
    }

    /// ntor onion key from the descriptor, if we have one
    pub fn ntor_onion_key(&self) -> Option<&str> {
        self.descriptor.as_ref()?.ntor_onion_key.as_deref()
    }

    /// Whether our descriptor matches the one the consensus lists
    pub fn has_current_descriptor(&self) -> bool {
        self.descriptor
            .as_ref()
            .map(|d| d.descriptor_digest == self.status.descriptor_digest)
            .unwrap_or(false)
    }

    /// Whether a descriptor fetch is warranted at `now`
    ///
    /// True when we lack the listed descriptor and it was published at
    /// least `delay_secs` ago; caches may not have a younger one yet.
    pub fn is_descriptor_downloadable_at(&self, now: u64, delay_secs: u64) -> bool {
        if self.has_current_descriptor() {
            return false;
        }
        now.saturating_sub(self.status.published) > delay_secs
    }
}
