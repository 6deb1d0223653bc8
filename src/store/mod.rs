//! Remote collection store: a JSON document tree addressed by slash-separated
//! paths, with live subscriptions on any path.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::AppError;

mod memory;
pub mod path;
mod postgres;
mod tree;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Point-in-time value of a watched path.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub path: String,
    pub value: Option<Value>,
}

impl Snapshot {
    pub fn new(path: impl Into<String>, value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            value,
        }
    }

    pub fn exists(&self) -> bool {
        self.value.as_ref().is_some_and(|v| !tree::is_empty(v))
    }

    pub fn val(&self) -> Option<&Value> {
        self.value.as_ref().filter(|v| !tree::is_empty(v))
    }

    /// Last segment of the watched path.
    pub fn key(&self) -> &str {
        path::last_segment(&self.path)
    }
}

pub type SnapshotCallback = Arc<dyn Fn(Snapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

#[async_trait]
pub trait StoreClient: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    async fn read_path(&self, path: &str) -> Result<Option<Value>, AppError>;

    /// Replaces whatever is stored at `path`. Writing `null` removes it.
    async fn write_path(&self, path: &str, value: Value) -> Result<(), AppError>;

    /// Stores `value` under a fresh child key of `path` and returns the key.
    async fn push_path(&self, path: &str, value: Value) -> Result<String, AppError>;

    async fn delete_path(&self, path: &str) -> Result<(), AppError>;

    /// Invokes `callback` with the current value right away and again every
    /// time the value at `path` changes.
    async fn subscribe(
        &self,
        path: &str,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionId, AppError>;

    /// Stops further callbacks. A notification already being delivered may
    /// still arrive once.
    fn unsubscribe(&self, id: SubscriptionId);
}

pub(crate) fn new_push_key() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// A registered subscriber, shared by both backends.
///
/// A watcher is registered before its attach-time read so that a write
/// committing in between still reaches it. Until its first snapshot goes out
/// it is not primed, and any change notification delivers unconditionally.
pub(crate) struct Watcher {
    pub path: String,
    pub callback: SnapshotCallback,
    last: Option<Value>,
    primed: bool,
}

impl Watcher {
    pub fn pending(path: String, callback: SnapshotCallback) -> Self {
        Self {
            path,
            callback,
            last: None,
            primed: false,
        }
    }

    /// Records the value now at the watched path. Returns the callback when
    /// a snapshot is due: the first one always, later ones only on change.
    pub fn observe(&mut self, now: &Option<Value>) -> Option<SnapshotCallback> {
        if self.primed && self.last == *now {
            return None;
        }
        self.primed = true;
        self.last = now.clone();
        Some(self.callback.clone())
    }

    /// Attach-time snapshot. Skipped when a change notification already
    /// delivered a newer one.
    pub fn seed(&mut self, current: &Option<Value>) -> Option<SnapshotCallback> {
        if self.primed {
            None
        } else {
            self.observe(current)
        }
    }
}
