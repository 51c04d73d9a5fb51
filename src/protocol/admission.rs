//! # Admission Control
//!
//! Caps how many clients may hold a session at the same time.
//!
//! The active count lives behind a single mutex; every change to it happens
//! under that lock, so `0 <= active <= max_clients` holds at all times.
//! Sessions normally hold an [`AdmissionPermit`], which gives the slot back
//! exactly once when dropped, whichever way the session ends.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::constants;

#[derive(Debug)]
pub struct AdmissionController {
    max_clients: usize,
    active: Mutex<usize>,
}

impl AdmissionController {
    pub fn new(max_clients: usize) -> Self {
        Self {
            max_clients,
            active: Mutex::new(0),
        }
    }

    // A panic while holding the lock cannot leave the counter half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.active.lock().unwrap_or_else(|poisoned| {
            warn!("{}", constants::ERR_LOCK_POISONED);
            poisoned.into_inner()
        })
    }

    /// Reserve a slot if one is free.
    ///
    /// Every `true` must be paired with exactly one [`release`](Self::release).
    pub fn try_admit(&self) -> bool {
        let mut active = self.lock();
        if *active < self.max_clients {
            *active += 1;
            debug!(active = *active, max = self.max_clients, "Slot reserved");
            true
        } else {
            false
        }
    }

    /// Give back a slot obtained from [`try_admit`](Self::try_admit)
    pub fn release(&self) {
        let mut active = self.lock();
        if *active == 0 {
            warn!("Release without a matching admission");
            return;
        }
        *active -= 1;
        debug!(active = *active, max = self.max_clients, "Slot released");
    }

    /// Reserve a slot that is released automatically when the permit drops
    pub fn admit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        self.try_admit().then(|| AdmissionPermit {
            controller: Arc::clone(self),
        })
    }

    pub fn active(&self) -> usize {
        *self.lock()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }
}

/// One reserved session slot
#[derive(Debug)]
pub struct AdmissionPermit {
    controller: Arc<AdmissionController>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.controller.release();
    }
}
