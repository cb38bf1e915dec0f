//! One-shot bootstrap gate
//!
//! The first caller of `run_once` performs the load; everyone else,
//! blocking or async, waits until it has finished. Once loaded the gate
//! never closes again.
//!
//! Blocking waits come in an unbounded and a timed flavour. The async
//! wait is a future backed by a oneshot channel; dropping it cancels the
//! wait.

use crate::error::{DirectoryError, Result};
use futures::channel::oneshot;
use parking_lot::{Condvar, Mutex};
use std::future::Future;
use std::time::Duration;
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Unloaded,
    Loading,
    Loaded,
}

struct GateState {
    phase: Phase,
    async_waiters: Vec<oneshot::Sender<()>>,
}

pub struct BootstrapGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl BootstrapGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState {
                phase: Phase::Unloaded,
                async_waiters: Vec::new(),
            }),
            changed: Condvar::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.state.lock().phase == Phase::Loaded
    }

    /// Run `load` unless some caller already did
    ///
    /// A caller arriving while another load is in progress waits for it.
    /// Returns true if this call performed the load. If `load` panics the
    /// gate reopens so a later caller can try again.
    pub fn run_once<F: FnOnce()>(&self, load: F) -> bool {
        {
            let mut state = self.state.lock();
            loop {
                match state.phase {
                    Phase::Loaded => return false,
                    Phase::Loading => self.changed.wait(&mut state),
                    Phase::Unloaded => break,
                }
            }
            state.phase = Phase::Loading;
        }

        let reset = ResetOnUnwind { gate: self };
        load();
        std::mem::forget(reset);

        self.mark_loaded();
        true
    }

    fn mark_loaded(&self) {
        let waiters = {
            let mut state = self.state.lock();
            state.phase = Phase::Loaded;
            std::mem::take(&mut state.async_waiters)
        };
        self.changed.notify_all();
        for tx in waiters {
            // Receiver gone means the waiter was cancelled
            let _ = tx.send(());
        }
    }

    /// Block until loaded
    ///
    /// Re-checks the phase after every wakeup, spurious or not.
    pub fn wait(&self) {
        let mut state = self.state.lock();
        while state.phase != Phase::Loaded {
            self.changed.wait(&mut state);
        }
    }

    /// Block until loaded or until `timeout` has passed
    ///
    /// A timeout too large to represent as a deadline waits without bound.
    pub fn wait_timeout(&self, timeout: Duration) -> Result<()> {
        let deadline = match Instant::now().checked_add(timeout) {
            Some(deadline) => deadline,
            None => {
                self.wait();
                return Ok(());
            }
        };
        let mut state = self.state.lock();
        while state.phase != Phase::Loaded {
            let now = Instant::now();
            if now >= deadline {
                log::warn!("Timed out after {:?} waiting for directory to load", timeout);
                return Err(DirectoryError::BootstrapTimeout(timeout));
            }
            self.changed.wait_for(&mut state, deadline - now);
        }
        Ok(())
    }

    /// Future resolving once loaded
    ///
    /// Resolves to false only if the gate is dropped before loading.
    pub fn loaded(&self) -> impl Future<Output = bool> + Send + 'static {
        let rx = {
            let mut state = self.state.lock();
            if state.phase == Phase::Loaded {
                None
            } else {
                state.async_waiters.retain(|tx| !tx.is_canceled());
                let (tx, rx) = oneshot::channel();
                state.async_waiters.push(tx);
                Some(rx)
            }
        };
        async move {
            match rx {
                None => true,
                Some(rx) => rx.await.is_ok(),
            }
        }
    }
}

impl Default for BootstrapGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Reopens the gate if the loader unwinds
struct ResetOnUnwind<'a> {
    gate: &'a BootstrapGate,
}

impl Drop for ResetOnUnwind<'_> {
    fn drop(&mut self) {
        log::warn!("Directory load did not complete, reopening bootstrap gate");
        self.gate.state.lock().phase = Phase::Unloaded;
        self.gate.changed.notify_all();
    }
}
