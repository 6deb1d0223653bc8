use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgListener, PgPool, Postgres, Transaction};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{
    new_push_key, path, tree, Snapshot, SnapshotCallback, StoreClient, SubscriptionId, Watcher,
};
use crate::error::AppError;

const CHANNEL: &str = "document_changes";

/// Postgres-backed store. Every record lives in one `documents` row keyed by
/// its full path; reading a collection reassembles the rows below it.
/// Change notifications travel over `LISTEN/NOTIFY`.
pub struct PgStore {
    inner: Arc<Inner>,
    next_id: AtomicU64,
    listener: JoinHandle<()>,
}

struct Inner {
    db: PgPool,
    watchers: Mutex<HashMap<u64, Watcher>>,
}

impl PgStore {
    pub async fn connect(db: PgPool) -> anyhow::Result<Self> {
        let mut listener = PgListener::connect_with(&db)
            .await
            .context("connect change listener")?;
        listener
            .listen(CHANNEL)
            .await
            .with_context(|| format!("listen on {CHANNEL}"))?;

        let inner = Arc::new(Inner {
            db,
            watchers: Mutex::new(HashMap::new()),
        });

        let dispatcher = inner.clone();
        let listener = tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => dispatcher.dispatch(notification.payload()).await,
                    Err(e) => {
                        // PgListener reconnects on its own; changes made while
                        // disconnected are not replayed.
                        warn!(error = %e, "change listener error");
                    }
                }
            }
        });

        Ok(Self {
            inner,
            next_id: AtomicU64::new(0),
            listener,
        })
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

impl Inner {
    async fn read(&self, path: &str) -> Result<Option<Value>, AppError> {
        let path = path::normalize(path);
        let rows = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT path, value
              FROM documents
             WHERE $1 = '' OR path = $1 OR starts_with(path, $1 || '/')
                OR starts_with($1, path || '/')
            "#,
        )
        .bind(&path)
        .fetch_all(&self.db)
        .await
        .map_err(|e| AppError::read(&path, db_code(&e), &e))?;

        Ok(tree::assemble(&path::segments(&path), rows))
    }

    async fn write(&self, path: &str, value: Value) -> Result<(), AppError> {
        let path = path::normalize(path);
        let fail = |e: sqlx::Error| AppError::write(&path, db_code(&e), &e);

        let mut tx = self.db.begin().await.map_err(fail)?;

        let ancestor = sqlx::query_as::<_, (String, Value)>(
            r#"
            SELECT path, value
              FROM documents
             WHERE starts_with($1, path || '/')
             ORDER BY length(path) DESC
             LIMIT 1
            "#,
        )
        .bind(&path)
        .fetch_optional(&mut *tx)
        .await
        .map_err(fail)?;

        match ancestor {
            Some((record_path, record)) => {
                let target = path::segments(&path);
                let rel = &target[path::segments(&record_path).len()..];
                match tree::merge_into(record, rel, value) {
                    Some(record) => upsert(&mut tx, &record_path, &record).await.map_err(fail)?,
                    None => delete_exact(&mut tx, &record_path).await.map_err(fail)?,
                }
            }
            None => {
                sqlx::query(
                    r#"
                    DELETE FROM documents
                     WHERE $1 = '' OR path = $1 OR starts_with(path, $1 || '/')
                    "#,
                )
                .bind(&path)
                .execute(&mut *tx)
                .await
                .map_err(fail)?;
                if !tree::is_empty(&value) {
                    upsert(&mut tx, &path, &value).await.map_err(fail)?;
                }
            }
        }

        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANNEL)
            .bind(&path)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;

        tx.commit().await.map_err(fail)?;
        Ok(())
    }

    async fn dispatch(&self, changed: &str) {
        let related: Vec<(u64, String)> = lock(&self.watchers)
            .iter()
            .filter(|(_, w)| path::is_related(&w.path, changed))
            .map(|(id, w)| (*id, w.path.clone()))
            .collect();

        for (id, watched) in related {
            let now = match self.read(&watched).await {
                Ok(v) => v,
                Err(e) => {
                    error!(error = %e, path = %watched, "refresh after change failed");
                    continue;
                }
            };
            let due = lock(&self.watchers)
                .get_mut(&id)
                .and_then(|watcher| watcher.observe(&now));
            if let Some(callback) = due {
                callback(Snapshot::new(watched, now));
            }
        }
        debug!(path = changed, "postgres store change dispatched");
    }
}

async fn upsert(
    tx: &mut Transaction<'_, Postgres>,
    path: &str,
    value: &Value,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO documents (path, value, updated_at)
        VALUES ($1, $2, now())
        ON CONFLICT (path) DO UPDATE SET value = EXCLUDED.value, updated_at = now()
        "#,
    )
    .bind(path)
    .bind(value)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn delete_exact(tx: &mut Transaction<'_, Postgres>, path: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM documents WHERE path = $1")
        .bind(path)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

fn db_code(e: &sqlx::Error) -> Option<String> {
    e.as_database_error()
        .and_then(|d| d.code())
        .map(|c| c.into_owned())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl StoreClient for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn read_path(&self, path: &str) -> Result<Option<Value>, AppError> {
        self.inner.read(path).await
    }

    async fn write_path(&self, path: &str, value: Value) -> Result<(), AppError> {
        self.inner.write(path, value).await
    }

    async fn push_path(&self, path: &str, value: Value) -> Result<String, AppError> {
        let key = new_push_key();
        self.inner.write(&path::child(path, &key), value).await?;
        Ok(key)
    }

    async fn delete_path(&self, path: &str) -> Result<(), AppError> {
        self.inner.write(path, Value::Null).await
    }

    async fn subscribe(
        &self,
        path: &str,
        callback: SnapshotCallback,
    ) -> Result<SubscriptionId, AppError> {
        let path = path::normalize(path);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        // registered before the read so a write committing in between is
        // still dispatched to it
        lock(&self.inner.watchers).insert(id, Watcher::pending(path.clone(), callback));
        let current = match self.inner.read(&path).await {
            Ok(current) => current,
            Err(e) => {
                lock(&self.inner.watchers).remove(&id);
                return Err(e);
            }
        };
        let due = lock(&self.inner.watchers)
            .get_mut(&id)
            .and_then(|watcher| watcher.seed(&current));
        if let Some(callback) = due {
            callback(Snapshot::new(path, current));
        }
        Ok(SubscriptionId(id))
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        lock(&self.inner.watchers).remove(&id.0);
    }
}
