//! Live subscriptions: one handle per attachment, and a manager that keeps at
//! most one attachment per path for the view that owns it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::error::AppError;
use crate::store::{path, SnapshotCallback, StoreClient, SubscriptionId};

pub mod views;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachState {
    Detached,
    Attaching,
    Attached,
}

/// A single live attachment. Detach it explicitly; dropping an attached
/// handle detaches it too but logs a warning.
pub struct SubscriptionHandle {
    store: Arc<dyn StoreClient>,
    path: String,
    id: Option<SubscriptionId>,
}

impl SubscriptionHandle {
    pub async fn attach(
        store: Arc<dyn StoreClient>,
        path: &str,
        callback: SnapshotCallback,
    ) -> Result<Self, AppError> {
        let path = path::normalize(path);
        let id = store.subscribe(&path, callback).await?;
        debug!(%path, backend = store.backend_tag(), "subscription attached");
        Ok(Self {
            store,
            path,
            id: Some(id),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn state(&self) -> AttachState {
        if self.id.is_some() {
            AttachState::Attached
        } else {
            AttachState::Detached
        }
    }

    pub fn detach(&mut self) {
        if let Some(id) = self.id.take() {
            self.store.unsubscribe(id);
            debug!(path = %self.path, "subscription detached");
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if self.id.is_some() {
            warn!(path = %self.path, "subscription handle dropped while attached");
            self.detach();
        }
    }
}

enum Slot {
    Attaching(u64),
    Attached(SubscriptionHandle),
}

/// Owns the attachments of one view. Attaching a path that is already
/// attached replaces the old attachment, so callbacks never double up.
pub struct SubscriptionManager {
    store: Arc<dyn StoreClient>,
    slots: Mutex<HashMap<String, Slot>>,
    tickets: AtomicU64,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn StoreClient>) -> Self {
        Self {
            store,
            slots: Mutex::new(HashMap::new()),
            tickets: AtomicU64::new(0),
        }
    }

    pub async fn attach(&self, path: &str, callback: SnapshotCallback) -> Result<(), AppError> {
        let path = path::normalize(path);
        let ticket = self.tickets.fetch_add(1, Ordering::SeqCst);

        let previous = self.slots().insert(path.clone(), Slot::Attaching(ticket));
        if let Some(Slot::Attached(mut old)) = previous {
            debug!(%path, "replacing existing attachment");
            old.detach();
        }

        let attached = SubscriptionHandle::attach(self.store.clone(), &path, callback).await;

        let mut slots = self.slots();
        let still_wanted = matches!(slots.get(&path), Some(Slot::Attaching(t)) if *t == ticket);
        match attached {
            Ok(handle) if still_wanted => {
                slots.insert(path, Slot::Attached(handle));
                Ok(())
            }
            Ok(mut handle) => {
                // detached or re-attached while this attach was in flight
                drop(slots);
                handle.detach();
                Ok(())
            }
            Err(e) => {
                if still_wanted {
                    slots.remove(&path);
                }
                Err(e)
            }
        }
    }

    /// Returns whether anything was attached (or attaching) at `path`.
    pub fn detach(&self, path: &str) -> bool {
        let removed = self.slots().remove(&path::normalize(path));
        match removed {
            Some(Slot::Attached(mut handle)) => {
                handle.detach();
                true
            }
            Some(Slot::Attaching(_)) => true,
            None => false,
        }
    }

    pub fn detach_all(&self) {
        let drained: Vec<Slot> = self.slots().drain().map(|(_, slot)| slot).collect();
        for slot in drained {
            if let Slot::Attached(mut handle) = slot {
                handle.detach();
            }
        }
    }

    pub fn state(&self, path: &str) -> AttachState {
        match self.slots().get(&path::normalize(path)) {
            Some(Slot::Attached(_)) => AttachState::Attached,
            Some(Slot::Attaching(_)) => AttachState::Attaching,
            None => AttachState::Detached,
        }
    }

    pub fn attached_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .slots()
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Attached(_)))
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.detach_all();
    }
}
