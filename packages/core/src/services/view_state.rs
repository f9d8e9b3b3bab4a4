//! Collapse View-State Persistence
//!
//! Owns the collapsed-id set and its durable persistence. Collapse state is
//! view state: it lives next to the tree, keyed by node id, never on the
//! node records themselves.
//!
//! # Model
//!
//! - Toggling updates the local set synchronously (immediate visual
//!   feedback) and enqueues a batched persistence operation keyed by node
//!   id; a later toggle of the same id replaces the queued entry.
//! - The batch flushes when it reaches `max_batch_size` or when the
//!   debounce window elapses with no new operations, whichever comes first.
//!   A flush failure re-queues the failed entries at the front and records
//!   the error; the local set is never rolled back.
//! - The initial load retries with exponential backoff (bounded attempts);
//!   the failure is sticky until a successful load or a manual
//!   [`ViewStateService::retry_load`].
//!
//! All persistence goes through the optional [`CollapseStore`]
//! collaborator; with no store configured, toggles still work locally and
//! nothing is persisted.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors surfaced by collapse-state persistence collaborators
#[derive(Error, Debug, Clone)]
pub enum ViewStateError {
    #[error("Collapse state storage failed: {0}")]
    Storage(String),
}

/// One queued collapse-state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseChange {
    pub node_id: String,
    pub collapsed: bool,
}

/// Host-side storage contract for collapse state.
///
/// All methods are optional in spirit: a host that cannot load simply
/// returns an empty set, and absence of the whole collaborator disables
/// persistence without erroring.
#[async_trait]
pub trait CollapseStore: Send + Sync {
    /// Load the persisted collapsed-id set
    async fn load(&self) -> Result<HashSet<String>, ViewStateError>;

    /// Persist the whole set (bulk replace, bypasses batching)
    async fn save_all(&self, collapsed: &HashSet<String>) -> Result<(), ViewStateError>;

    /// Persist a batch of individual changes
    async fn save_batch(&self, changes: &[CollapseChange]) -> Result<(), ViewStateError>;
}

/// Tuning knobs for the persistence subsystem
#[derive(Debug, Clone)]
pub struct ViewStateConfig {
    /// Call `load` on construction
    pub load_on_start: bool,
    /// Flush as soon as the queue reaches this size
    pub max_batch_size: usize,
    /// Flush after this long with no new operations
    pub debounce: Duration,
    /// Maximum automatic load attempts before the error sticks
    pub max_load_attempts: u32,
    /// First retry delay; doubles per attempt
    pub backoff_base: Duration,
    /// Retry delay ceiling
    pub backoff_cap: Duration,
}

impl Default for ViewStateConfig {
    fn default() -> Self {
        Self {
            load_on_start: true,
            max_batch_size: 50,
            debounce: Duration::from_millis(500),
            max_load_attempts: 3,
            backoff_base: Duration::from_secs(1),
            backoff_cap: Duration::from_secs(8),
        }
    }
}

/// Where the initial load currently stands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    /// No load requested (no store, or `load_on_start` off)
    Idle,
    /// A load attempt is in flight
    Loading,
    /// The persisted set was applied
    Loaded,
    /// All automatic attempts failed; sticky until `retry_load`
    Failed { attempts: u32, message: String },
}

#[derive(Debug)]
struct ViewStateInner {
    collapsed: HashSet<String>,
    queue: Vec<CollapseChange>,
    load_state: LoadState,
    last_flush_error: Option<String>,
}

/// Collapse-state owner: local set + batched persistence
pub struct ViewStateService {
    inner: Arc<Mutex<ViewStateInner>>,
    store: Option<Arc<dyn CollapseStore>>,
    config: ViewStateConfig,
    activity_tx: mpsc::Sender<()>,
}

impl ViewStateService {
    /// Create the service and start its background debounce task.
    ///
    /// Must be called within a tokio runtime. When `load_on_start` is set
    /// and a store is present, the initial load (with bounded backoff)
    /// starts immediately.
    pub fn new(store: Option<Arc<dyn CollapseStore>>, config: ViewStateConfig) -> Self {
        let inner = Arc::new(Mutex::new(ViewStateInner {
            collapsed: HashSet::new(),
            queue: Vec::new(),
            load_state: LoadState::Idle,
            last_flush_error: None,
        }));

        let (activity_tx, mut activity_rx) = mpsc::channel::<()>(16);

        // Debounce task: every ping restarts the quiet window; flush when it
        // elapses. Exits when the service (the only sender) is dropped.
        {
            let inner = Arc::clone(&inner);
            let store = store.clone();
            let debounce = config.debounce;
            tokio::spawn(async move {
                while activity_rx.recv().await.is_some() {
                    loop {
                        tokio::select! {
                            _ = tokio::time::sleep(debounce) => {
                                flush_queue(&inner, store.as_deref()).await;
                                break;
                            }
                            ping = activity_rx.recv() => {
                                if ping.is_none() {
                                    flush_queue(&inner, store.as_deref()).await;
                                    return;
                                }
                                // new activity: restart the window
                            }
                        }
                    }
                }
            });
        }

        let service = Self {
            inner,
            store,
            config,
            activity_tx,
        };

        if service.config.load_on_start && service.store.is_some() {
            service.spawn_load();
        }

        service
    }

    /// Whether a node's subtree is currently hidden
    pub fn is_collapsed(&self, id: &str) -> bool {
        self.lock_inner().collapsed.contains(id)
    }

    /// Snapshot of the collapsed-id set
    pub fn collapsed_snapshot(&self) -> HashSet<String> {
        self.lock_inner().collapsed.clone()
    }

    /// Flip a node's collapse state; returns the new state.
    ///
    /// The local set updates synchronously; persistence is enqueued.
    pub fn toggle(&self, id: &str) -> bool {
        let now_collapsed = {
            let mut inner = self.lock_inner();
            if !inner.collapsed.remove(id) {
                inner.collapsed.insert(id.to_string());
                true
            } else {
                false
            }
        };
        self.enqueue(CollapseChange {
            node_id: id.to_string(),
            collapsed: now_collapsed,
        });
        now_collapsed
    }

    /// Ensure a node is expanded; returns true when it was collapsed.
    ///
    /// Used by children transfer: a parent that just received nodes is
    /// auto-expanded so the new content is not silently hidden.
    pub fn expand(&self, id: &str) -> bool {
        let was_collapsed = self.lock_inner().collapsed.remove(id);
        if was_collapsed {
            self.enqueue(CollapseChange {
                node_id: id.to_string(),
                collapsed: false,
            });
        }
        was_collapsed
    }

    /// Replace the whole set and persist it directly, bypassing the batch
    pub async fn set_collapsed_nodes(
        &self,
        collapsed: HashSet<String>,
    ) -> Result<(), ViewStateError> {
        {
            let mut inner = self.lock_inner();
            inner.collapsed = collapsed.clone();
            // queued single-node changes are superseded by the bulk write
            inner.queue.clear();
        }
        if let Some(store) = &self.store {
            store.save_all(&collapsed).await?;
        }
        Ok(())
    }

    /// Flush any pending batch immediately
    pub async fn force_save(&self) {
        flush_queue(&self.inner, self.store.as_deref()).await;
    }

    /// Current state of the initial load
    pub fn load_state(&self) -> LoadState {
        self.lock_inner().load_state.clone()
    }

    /// Error from the most recent failed flush, if any
    pub fn last_flush_error(&self) -> Option<String> {
        self.lock_inner().last_flush_error.clone()
    }

    /// Number of queued, not-yet-flushed changes
    pub fn pending_changes(&self) -> usize {
        self.lock_inner().queue.len()
    }

    /// Manually retry a failed load, resetting the attempt counter
    pub fn retry_load(&self) {
        if self.store.is_some() {
            self.spawn_load();
        }
    }

    fn enqueue(&self, change: CollapseChange) {
        if self.store.is_none() {
            return;
        }
        let flush_now = {
            let mut inner = self.lock_inner();
            // keyed by id: a newer change replaces the queued one in place
            match inner.queue.iter_mut().find(|c| c.node_id == change.node_id) {
                Some(slot) => *slot = change,
                None => inner.queue.push(change),
            }
            inner.queue.len() >= self.config.max_batch_size
        };

        if flush_now {
            let inner = Arc::clone(&self.inner);
            let store = self.store.clone();
            tokio::spawn(async move {
                flush_queue(&inner, store.as_deref()).await;
            });
        } else {
            // debounce ping; a full channel means the task will wake anyway
            let _ = self.activity_tx.try_send(());
        }
    }

    fn spawn_load(&self) {
        let Some(store) = self.store.clone() else {
            return;
        };
        let inner = Arc::clone(&self.inner);
        let max_attempts = self.config.max_load_attempts.max(1);
        let base = self.config.backoff_base;
        let cap = self.config.backoff_cap;

        tokio::spawn(async move {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                set_load_state(&inner, LoadState::Loading);
                match store.load().await {
                    Ok(set) => {
                        let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
                        guard.collapsed = set;
                        guard.load_state = LoadState::Loaded;
                        tracing::debug!(attempt, "collapse state loaded");
                        return;
                    }
                    Err(err) => {
                        tracing::warn!(attempt, error = %err, "collapse state load failed");
                        set_load_state(
                            &inner,
                            LoadState::Failed {
                                attempts: attempt,
                                message: err.to_string(),
                            },
                        );
                        if attempt >= max_attempts {
                            return;
                        }
                        let backoff = base
                            .saturating_mul(1u32 << (attempt - 1).min(16))
                            .min(cap);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        });
    }

    fn lock_inner(&self) -> std::sync::MutexGuard<'_, ViewStateInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn set_load_state(inner: &Arc<Mutex<ViewStateInner>>, state: LoadState) {
    inner
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .load_state = state;
}

/// Drain and persist the queue; on failure re-queue at the front.
async fn flush_queue(inner: &Arc<Mutex<ViewStateInner>>, store: Option<&dyn CollapseStore>) {
    let batch: Vec<CollapseChange> = {
        let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
        guard.queue.drain(..).collect()
    };
    if batch.is_empty() {
        return;
    }
    let Some(store) = store else {
        return;
    };

    match store.save_batch(&batch).await {
        Ok(()) => {
            let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
            guard.last_flush_error = None;
            tracing::debug!(entries = batch.len(), "collapse batch flushed");
        }
        Err(err) => {
            tracing::warn!(error = %err, entries = batch.len(), "collapse batch flush failed");
            let mut guard = inner.lock().unwrap_or_else(|p| p.into_inner());
            // failed entries go back to the front; anything re-toggled while
            // the flush was in flight keeps its newer value
            let mut requeued: Vec<CollapseChange> = batch
                .into_iter()
                .filter(|c| !guard.queue.iter().any(|q| q.node_id == c.node_id))
                .collect();
            requeued.append(&mut guard.queue);
            guard.queue = requeued;
            guard.last_flush_error = Some(err.to_string());
        }
    }
}

#[cfg(test)]
#[path = "view_state_test.rs"]
mod view_state_test;
