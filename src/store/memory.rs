use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{
    new_push_key, path, tree, Snapshot, SnapshotCallback, StoreClient, SubscriptionId, Watcher,
};
use crate::error::AppError;

/// In-process document tree. Watchers are notified synchronously after each
/// mutation, and only when the value they see actually changed.
#[derive(Default)]
pub struct MemoryStore {
    root: Mutex<Value>,
    watchers: Mutex<HashMap<u64, Watcher>>,
    next_id: AtomicU64,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent operation fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn watcher_count(&self) -> usize {
        lock(&self.watchers).len()
    }

    fn check_available(&self, path: &str, writing: bool) -> Result<(), AppError> {
        if !self.unavailable.load(Ordering::SeqCst) {
            return Ok(());
        }
        let code = Some("unavailable".to_string());
        Err(if writing {
            AppError::write(path, code, "store unavailable")
        } else {
            AppError::read(path, code, "store unavailable")
        })
    }

    fn current(&self, path: &str) -> Option<Value> {
        let root = lock(&self.root);
        tree::get_at(&root, &path::segments(path)).cloned()
    }

    fn mutate(&self, path: &str, value: Value) {
        {
            let mut root = lock(&self.root);
            tree::set_at(&mut root, &path::segments(path), value);
        }
        self.notify(path);
    }

    fn notify(&self, changed: &str) {
        let root = lock(&self.root).clone();
        let mut due = Vec::new();
        {
            let mut watchers = lock(&self.watchers);
            for watcher in watchers.values_mut() {
                if !path::is_related(&watcher.path, changed) {
                    continue;
                }
                let now = tree::get_at(&root, &path::segments(&watcher.path)).cloned();
                if let Some(callback) = watcher.observe(&now) {
                    due.push((callback, Snapshot::new(watcher.path.clone(), now)));
                }
            }
        }
        debug!(path = changed, notified = due.len(), "memory store change");
        for (callback, snapshot) in due {
            callback(snapshot);
        }
    }
}

#[async_trait]
impl StoreClient for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn read_path(&self, path: &str) -> Result<Option<Value>, AppError> {
        self.check_available(path, false)?;
        Ok(self.current(path))
    }

    async fn write_path(&self, path: &str, value: Value) -> Result<(), AppError> {
        self.check_available(path, true)?;
        self.mutate(path, value);
        Ok(())
    }

    async fn push_path(&self, path: &str, value: Value) -> Result<String, AppError> {
        self.check_available(path, true)?;
        let key = new_push_key();
        self.mutate(&path::child(path, &key), value);
        Ok(key)
    }

    async fn delete_path(&self, path: &str) -> Result<(), AppError> {
        self.check_available(path, true)?;
        self.mutate(path, Value::Null);
        Ok(())
    }

    async fn subscribe(
        &self,
        path: &str,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionId, AppError> {
        self.check_available(path, false)?;
        let path = path::normalize(path);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        lock(&self.watchers).insert(id, Watcher::pending(path.clone(), callback));
        let current = self.current(&path);
        let due = lock(&self.watchers)
            .get_mut(&id)
            .and_then(|watcher| watcher.seed(&current));
        if let Some(callback) = due {
            callback(Snapshot::new(path, current));
        }
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.watchers).remove(&id.0);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
