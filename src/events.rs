//! Consensus-changed notifications
//!
//! Listeners register a handler and get a content-free signal after each
//! successful consensus adoption. Late registrants get no replay.

use parking_lot::Mutex;
use std::sync::Arc;

/// Receiver of "consensus changed" signals
pub trait EventHandler: Send + Sync {
    fn handle_event(&self);
}

impl<F> EventHandler for F
where
    F: Fn() + Send + Sync,
{
    fn handle_event(&self) {
        self()
    }
}

/// Registered handler list
#[derive(Default)]
pub struct EventManager {
    handlers: Mutex<Vec<Arc<dyn EventHandler>>>,
}

impl EventManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.lock().push(handler);
    }

    /// Remove a handler previously added (matched by pointer)
    pub fn remove_listener(&self, handler: &Arc<dyn EventHandler>) {
        self.handlers.lock().retain(|h| !Arc::ptr_eq(h, handler));
    }

    pub fn listener_count(&self) -> usize {
        self.handlers.lock().len()
    }

    /// Signal every handler registered at this moment
    ///
    /// Handlers run without the list lock held, so they may register or
    /// unregister themselves.
    pub fn fire_event(&self) {
        let handlers: Vec<_> = self.handlers.lock().clone();
        log::debug!("Firing consensus changed event to {} handlers", handlers.len());
        for handler in handlers {
            handler.handle_event();
        }
    }
}
