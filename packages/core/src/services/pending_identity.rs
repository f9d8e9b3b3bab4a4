//! Pending-Identity Lifecycle
//!
//! Newly created nodes get a generated identifier immediately, so the UI can
//! address and focus them before any backend round-trip. After a quiet
//! period the manager finalizes the durable identifier: by default the
//! generated id simply becomes durable (fire-and-forget creation, no swap),
//! but an [`IdentityFinalizer`] collaborator may supply a different durable
//! id, at which point the arena is re-keyed in place and a tree-changed
//! event is emitted.
//!
//! A finalization error is logged and retried exactly once after a fixed
//! delay; it is never retried indefinitely. Pending work is cancellable
//! (node deleted before the quiet period) and everything outstanding is
//! aborted when the manager is dropped.

use crate::models::Node;
use crate::services::error::NodeServiceError;
use crate::services::events::DomainEvent;
use crate::tree::Tree;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Quiet period between creation and finalization
pub const IDENTITY_QUIET_PERIOD: Duration = Duration::from_millis(300);

/// Delay before the single retry after a failed finalization
pub const IDENTITY_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Collaborator that assigns durable identifiers.
///
/// Return `Ok(Some(durable_id))` to replace the node's generated id, or
/// `Ok(None)` to keep it.
#[async_trait]
pub trait IdentityFinalizer: Send + Sync {
    async fn finalize(&self, node: &Node) -> Result<Option<String>, NodeServiceError>;
}

/// Tracks nodes whose durable identity is still pending
pub struct PendingIdentityManager {
    tree: Arc<Mutex<Tree>>,
    event_tx: broadcast::Sender<DomainEvent>,
    finalizer: Option<Arc<dyn IdentityFinalizer>>,
    pending: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
    quiet_period: Duration,
    retry_delay: Duration,
}

impl PendingIdentityManager {
    pub fn new(
        tree: Arc<Mutex<Tree>>,
        event_tx: broadcast::Sender<DomainEvent>,
        finalizer: Option<Arc<dyn IdentityFinalizer>>,
    ) -> Self {
        Self::with_timing(
            tree,
            event_tx,
            finalizer,
            IDENTITY_QUIET_PERIOD,
            IDENTITY_RETRY_DELAY,
        )
    }

    /// Constructor with explicit timing, for tests
    pub fn with_timing(
        tree: Arc<Mutex<Tree>>,
        event_tx: broadcast::Sender<DomainEvent>,
        finalizer: Option<Arc<dyn IdentityFinalizer>>,
        quiet_period: Duration,
        retry_delay: Duration,
    ) -> Self {
        Self {
            tree,
            event_tx,
            finalizer,
            pending: Arc::new(Mutex::new(HashMap::new())),
            quiet_period,
            retry_delay,
        }
    }

    /// Begin tracking a freshly created node.
    ///
    /// With no finalizer configured the generated id is already durable and
    /// nothing is scheduled. Tracking the same id again replaces (and
    /// cancels) the earlier schedule.
    pub fn track(&self, node_id: &str) {
        let Some(finalizer) = self.finalizer.clone() else {
            return;
        };

        let tree = Arc::clone(&self.tree);
        let event_tx = self.event_tx.clone();
        let pending = Arc::clone(&self.pending);
        let id = node_id.to_string();
        let task_id = id.clone();
        let quiet_period = self.quiet_period;
        let retry_delay = self.retry_delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;

            if let Err(err) = finalize_once(&tree, &event_tx, finalizer.as_ref(), &task_id).await {
                tracing::warn!(node_id = %task_id, error = %err, "identity finalization failed, retrying once");
                tokio::time::sleep(retry_delay).await;
                if let Err(err) =
                    finalize_once(&tree, &event_tx, finalizer.as_ref(), &task_id).await
                {
                    tracing::warn!(node_id = %task_id, error = %err, "identity finalization retry failed, giving up");
                }
            }

            lock_pending(&pending).remove(&task_id);
        });

        if let Some(old) = lock_pending(&self.pending).insert(id, handle) {
            old.abort();
        }
    }

    /// Cancel a pending conversion (e.g. the node was deleted first)
    pub fn cancel(&self, node_id: &str) {
        if let Some(handle) = lock_pending(&self.pending).remove(node_id) {
            handle.abort();
            tracing::debug!(node_id, "pending identity conversion cancelled");
        }
    }

    /// Number of conversions still outstanding
    pub fn pending_count(&self) -> usize {
        lock_pending(&self.pending).len()
    }

    /// Cancel everything outstanding
    pub fn shutdown(&self) {
        for (_, handle) in lock_pending(&self.pending).drain() {
            handle.abort();
        }
    }
}

impl Drop for PendingIdentityManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock_pending(
    pending: &Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
) -> std::sync::MutexGuard<'_, HashMap<String, JoinHandle<()>>> {
    pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn finalize_once(
    tree: &Arc<Mutex<Tree>>,
    event_tx: &broadcast::Sender<DomainEvent>,
    finalizer: &dyn IdentityFinalizer,
    node_id: &str,
) -> Result<(), NodeServiceError> {
    let node = {
        let guard = tree.lock().unwrap_or_else(|p| p.into_inner());
        guard.get(node_id).cloned()
    };
    // deleted during the quiet period: nothing to finalize
    let Some(node) = node else {
        return Ok(());
    };

    match finalizer.finalize(&node).await? {
        Some(durable_id) if durable_id != node_id => {
            let roots = {
                let mut guard = tree.lock().unwrap_or_else(|p| p.into_inner());
                guard.rename(node_id, &durable_id)?;
                guard.roots().to_vec()
            };
            tracing::debug!(node_id, durable_id = %durable_id, "node identity finalized");
            let _ = event_tx.send(DomainEvent::NodesChanged { roots });
        }
        _ => {
            // generated id stays durable; nothing to swap
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "pending_identity_test.rs"]
mod pending_identity_test;
