//! Auto-updating projections over the store.
//!
//! A [`LiveQuery`] re-runs its query after every commit that touches one of
//! the tables it depends on and publishes the result on a `watch` channel.
//! Subscribers always see the latest snapshot; intermediate ones may be
//! skipped.

use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::{Result, TilError};
use crate::storage::{Dao, SqliteStore, Tables};

/// Store handle shared between the repository and live queries
pub type SharedStore = Arc<Mutex<SqliteStore>>;

/// Lock the store and run `body` on the blocking pool.
/// The lock is held until `body` returns.
pub async fn with_store<T, F>(store: &SharedStore, body: F) -> Result<T>
where
    F: FnOnce(&SqliteStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let guard = store.clone().lock_owned().await;
    tokio::task::spawn_blocking(move || body(&guard))
        .await
        .map_err(|e| TilError::Storage(format!("Storage task failed: {}", e)))?
}

pub struct LiveQuery<T> {
    rx: watch::Receiver<Arc<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T>
where
    T: Send + Sync + 'static,
{
    /// Run `query` once and keep re-running it in a background task.
    ///
    /// The task stops once this handle and every receiver from
    /// [`subscribe`](Self::subscribe) are dropped.
    pub async fn start<F>(store: SharedStore, deps: Tables, query: F) -> Result<Self>
    where
        F: Fn(&Dao<'_>) -> Result<T> + Send + Sync + 'static,
    {
        let query = Arc::new(query);

        // snapshot and version are read under one lock so no commit falls between them
        let first = query.clone();
        let (initial, mut commits, mut seen) = with_store(&store, move |store| {
            let mut commits = store.subscribe();
            let initial = store.run(&*first)?;
            let seen = *commits.borrow_and_update();
            Ok((initial, commits, seen))
        })
        .await?;

        let (tx, rx) = watch::channel(Arc::new(initial));

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = commits.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tx.closed() => break,
                }

                let current = *commits.borrow_and_update();
                let changed = current.changed_since(&seen);
                seen = current;
                if !changed.intersects(deps) {
                    continue;
                }

                let refresh = query.clone();
                match with_store(&store, move |store| store.run(&*refresh)).await {
                    Ok(value) => {
                        tx.send_replace(Arc::new(value));
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "live query refresh failed, keeping last value");
                    }
                }
            }
            tracing::debug!("live query stopped");
        });

        Ok(Self { rx, task })
    }

    /// A receiver that observes every future refresh
    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.rx.clone()
    }

    /// The latest published snapshot
    pub fn get(&self) -> Arc<T> {
        self.rx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}
