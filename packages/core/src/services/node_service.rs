//! Node CRUD and Command Orchestration
//!
//! [`NodeService`] owns the document forest and is the single entry point
//! for mutations: CRUD with position control, explicit move/reorder, and
//! the structural keyboard commands from [`crate::editing`]. Every
//! successful mutation updates the arena synchronously, then notifies
//! subscribers through the broadcast channel; persistence mirroring is the
//! host's business and never blocks or fails the local change.
//!
//! The service also wires the two background collaborators together:
//! created nodes are handed to the [`PendingIdentityManager`] for durable
//! identity, and children transfers that land under a collapsed node are
//! auto-expanded through the [`ViewStateService`].

use crate::behaviors::behavior_for;
use crate::editing::{self, EditCommand, EditOutcome};
use crate::models::{Node, NodeFactory, NodeType};
use crate::services::error::NodeServiceError;
use crate::services::events::{DomainEvent, DOMAIN_EVENT_CHANNEL_CAPACITY};
use crate::services::pending_identity::{IdentityFinalizer, PendingIdentityManager};
use crate::services::view_state::ViewStateService;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Parameters for creating a node at an explicit position
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNodeParams {
    pub node_type: NodeType,
    pub content: String,
    /// Parent to insert under; `None` creates a root
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Sibling to insert after; `None` appends at the end of the list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_after_id: Option<String>,
    /// Type-specific properties; defaults come from the node's behavior
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl CreateNodeParams {
    /// Convenience for the common case: a root text node
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            node_type: NodeType::Text,
            content: content.into(),
            parent_id: None,
            insert_after_id: None,
            properties: None,
        }
    }
}

/// In-place field updates for a node; `None` leaves the field as it is.
///
/// Position is never part of an update; use `move_node`/`reorder` for that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNodeParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl UpdateNodeParams {
    /// Replace just the content
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }

    /// Replace just the properties object
    pub fn properties(properties: serde_json::Value) -> Self {
        Self {
            properties: Some(properties),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.content.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
            && self.properties.is_none()
    }
}

/// The document engine's mutation facade
pub struct NodeService {
    tree: Arc<Mutex<Tree>>,
    view_state: Arc<ViewStateService>,
    pending: PendingIdentityManager,
    event_tx: broadcast::Sender<DomainEvent>,
}

impl NodeService {
    /// Create a service over an empty forest.
    ///
    /// Must be called within a tokio runtime (the collaborators spawn
    /// background tasks).
    pub fn new(view_state: Arc<ViewStateService>) -> Self {
        Self::with_finalizer(view_state, None)
    }

    /// Create a service with an identity finalizer for durable-id swaps
    pub fn with_finalizer(
        view_state: Arc<ViewStateService>,
        finalizer: Option<Arc<dyn IdentityFinalizer>>,
    ) -> Self {
        let tree = Arc::new(Mutex::new(Tree::new()));
        let (event_tx, _) = broadcast::channel(DOMAIN_EVENT_CHANNEL_CAPACITY);
        let pending =
            PendingIdentityManager::new(Arc::clone(&tree), event_tx.clone(), finalizer);
        Self {
            tree,
            view_state,
            pending,
            event_tx,
        }
    }

    /// Subscribe to domain events
    pub fn subscribe_to_events(&self) -> broadcast::Receiver<DomainEvent> {
        self.event_tx.subscribe()
    }

    /// The collapse view-state collaborator
    pub fn view_state(&self) -> &Arc<ViewStateService> {
        &self.view_state
    }

    /// The pending-identity collaborator
    pub fn pending_identity(&self) -> &PendingIdentityManager {
        &self.pending
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Look up a node by id (cloned snapshot)
    pub fn get_node(&self, id: &str) -> Option<Node> {
        self.lock_tree().get(id).cloned()
    }

    /// Ordered children of a node (cloned snapshots)
    pub fn get_children(&self, id: &str) -> Vec<Node> {
        let tree = self.lock_tree();
        tree.children_of(id)
            .iter()
            .filter_map(|cid| tree.get(cid).cloned())
            .collect()
    }

    /// Ordered top-level node ids
    pub fn roots(&self) -> Vec<String> {
        self.lock_tree().roots().to_vec()
    }

    /// Depth-first pre-order snapshot of the whole forest
    pub fn flatten(&self) -> Vec<Node> {
        self.lock_tree().flatten().into_iter().cloned().collect()
    }

    /// Pre-order ids as currently rendered: collapsed nodes appear, their
    /// descendants do not
    pub fn visible_ids(&self) -> Vec<String> {
        let collapsed = self.view_state.collapsed_snapshot();
        self.lock_tree().visible_ids(&collapsed)
    }

    // ------------------------------------------------------------------
    // CRUD
    // ------------------------------------------------------------------

    /// Create a node at the requested position.
    ///
    /// The node gets a generated id immediately and is handed to the
    /// pending-identity manager; durable storage is notified only when the
    /// content has any non-whitespace.
    pub fn create(&self, params: CreateNodeParams) -> Result<Node, NodeServiceError> {
        let mut node = NodeFactory::create(params.node_type, &params.content);
        if let Some(properties) = params.properties {
            if !properties.is_object() {
                return Err(NodeServiceError::invalid_update(
                    "properties must be a JSON object",
                ));
            }
            node.properties = properties;
        }
        node.validate()?;
        behavior_for(node.node_type).validate(&node)?;

        let created = node.clone();
        {
            let mut tree = self.lock_tree();
            let index = insertion_index(
                &tree,
                params.parent_id.as_deref(),
                params.insert_after_id.as_deref(),
            )?;
            match &params.parent_id {
                Some(pid) => tree.insert_child_at(pid, index, node)?,
                None => tree.insert_root_at(index, node)?,
            }
        }

        self.pending.track(&created.id);
        if !created.content.trim().is_empty() {
            self.emit(DomainEvent::NodeCreated {
                node: created.clone(),
                parent_id: params.parent_id,
                after_sibling_id: params.insert_after_id,
            });
        }
        self.emit_nodes_changed();
        tracing::debug!(node_id = %created.id, node_type = %created.node_type, "node created");
        Ok(created)
    }

    /// Update a node's fields in place.
    ///
    /// Position is untouched; fields left `None` in `params` keep their
    /// current value.
    pub fn update(&self, id: &str, params: UpdateNodeParams) -> Result<Node, NodeServiceError> {
        if params.is_empty() {
            return Err(NodeServiceError::invalid_update(
                "update requires at least one field",
            ));
        }

        let updated = {
            let mut tree = self.lock_tree();
            let node = tree
                .get_mut(id)
                .ok_or_else(|| NodeServiceError::node_not_found(id))?;
            // validate a candidate first so a rejected update leaves the
            // stored node untouched
            let mut candidate = node.clone();
            if let Some(content) = params.content {
                candidate.content = content;
            }
            if let Some(tags) = params.tags {
                candidate.tags = tags;
            }
            if let Some(metadata) = params.metadata {
                candidate.metadata = metadata;
            }
            if let Some(props) = params.properties {
                candidate.properties = props;
            }
            candidate.touch();
            candidate.validate()?;
            behavior_for(candidate.node_type).validate(&candidate)?;
            *node = candidate.clone();
            candidate
        };

        self.emit(DomainEvent::NodeUpdated {
            node: updated.clone(),
        });
        Ok(updated)
    }

    /// Delete a node.
    ///
    /// With `preserve_children` the children are promoted into the deleted
    /// node's position; otherwise the whole subtree goes. Exactly one
    /// deletion event fires, for the target node, with no merge context.
    pub fn delete(&self, id: &str, preserve_children: bool) -> Result<(), NodeServiceError> {
        let removed_ids: Vec<String> = {
            let mut tree = self.lock_tree();
            if preserve_children {
                let (node, _) = tree.remove_promote(id)?;
                vec![node.id]
            } else {
                tree.remove_subtree(id)?
                    .into_iter()
                    .map(|n| n.id)
                    .collect()
            }
        };

        for removed in &removed_ids {
            self.pending.cancel(removed);
        }
        self.emit(DomainEvent::NodeDeleted {
            id: id.to_string(),
            context: None,
        });
        self.emit_nodes_changed();
        tracing::debug!(node_id = id, preserve_children, "node deleted");
        Ok(())
    }

    /// Move a node (with its subtree) under a new parent.
    ///
    /// `insert_after_id: None` puts it at the front of the target list.
    pub fn move_node(
        &self,
        id: &str,
        new_parent_id: Option<&str>,
        insert_after_id: Option<&str>,
    ) -> Result<(), NodeServiceError> {
        {
            let mut tree = self.lock_tree();
            if !tree.contains(id) {
                return Err(NodeServiceError::node_not_found(id));
            }
            if let Some(pid) = new_parent_id {
                if !tree.contains(pid) {
                    return Err(NodeServiceError::node_not_found(pid));
                }
                if pid == id {
                    return Err(NodeServiceError::hierarchy_violation(format!(
                        "cannot move {id} under itself"
                    )));
                }
                if tree.is_ancestor(id, pid) {
                    return Err(NodeServiceError::hierarchy_violation(format!(
                        "cannot move {id} under its own descendant {pid}"
                    )));
                }
            }

            // resolve the anchor before detaching so a bad sibling id never
            // leaves the node dangling
            if let Some(after) = insert_after_id {
                if after == id {
                    return Err(NodeServiceError::invalid_update(format!(
                        "cannot move {id} after itself"
                    )));
                }
                sibling_position(&tree, new_parent_id, after)?;
            }

            tree.detach(id)?;
            let index = match insert_after_id {
                Some(after) => sibling_position(&tree, new_parent_id, after)? + 1,
                None => 0,
            };
            match new_parent_id {
                Some(pid) => tree.attach_child_at(pid, id, index)?,
                None => tree.attach_root_at(id, index)?,
            }
        }

        self.emit(DomainEvent::NodeMoved {
            id: id.to_string(),
            new_parent_id: new_parent_id.map(str::to_string),
            after_sibling_id: insert_after_id.map(str::to_string),
        });
        self.emit_nodes_changed();
        Ok(())
    }

    /// Reposition a node among its current siblings.
    ///
    /// `insert_after_id: None` moves it to the front of the list.
    pub fn reorder(&self, id: &str, insert_after_id: Option<&str>) -> Result<(), NodeServiceError> {
        {
            let mut tree = self.lock_tree();
            if !tree.contains(id) {
                return Err(NodeServiceError::node_not_found(id));
            }
            if insert_after_id == Some(id) {
                return Err(NodeServiceError::invalid_update(format!(
                    "cannot reorder {id} after itself"
                )));
            }
            let parent_id = tree.parent_of(id).map(str::to_string);
            if let Some(after) = insert_after_id {
                sibling_position(&tree, parent_id.as_deref(), after)?;
            }
            tree.detach(id)?;
            let index = match insert_after_id {
                Some(after) => sibling_position(&tree, parent_id.as_deref(), after)? + 1,
                None => 0,
            };
            match parent_id.as_deref() {
                Some(pid) => tree.attach_child_at(pid, id, index)?,
                None => tree.attach_root_at(id, index)?,
            }
        }

        self.emit(DomainEvent::NodeReordered {
            id: id.to_string(),
            after_sibling_id: insert_after_id.map(str::to_string),
        });
        self.emit_nodes_changed();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structural keyboard commands
    // ------------------------------------------------------------------

    /// Run a structural edit command against the focused node.
    ///
    /// Returns `Ok(None)` when the command declines; the tree is untouched
    /// and no events fire. On success the focus/cursor target comes back
    /// and the appropriate semantic events are emitted.
    pub fn execute_command(
        &self,
        node_id: &str,
        command: EditCommand,
    ) -> Result<Option<EditOutcome>, NodeServiceError> {
        let collapsed = self.view_state.collapsed_snapshot();

        let (result, created_position) = {
            let mut tree = self.lock_tree();
            let Some(result) = editing::execute(&mut tree, &collapsed, node_id, command)? else {
                return Ok(None);
            };
            // position of a split-created node, read while the lock is held
            let created_position = match &result.created {
                Some(node) => {
                    let after = previous_sibling_of(&tree, &node.id);
                    Some((node.parent_id.clone(), after))
                }
                None => None,
            };
            (result, created_position)
        };

        for id in &result.expanded {
            self.view_state.expand(id);
        }

        if let Some(node) = &result.created {
            self.pending.track(&node.id);
            if !node.content.trim().is_empty() {
                let (parent_id, after_sibling_id) = created_position.unwrap_or((None, None));
                self.emit(DomainEvent::NodeCreated {
                    node: node.clone(),
                    parent_id,
                    after_sibling_id,
                });
            }
        }

        if let Some((node, context)) = &result.deleted {
            self.pending.cancel(&node.id);
            self.emit(DomainEvent::NodeDeleted {
                id: node.id.clone(),
                context: Some(context.clone()),
            });
        }

        if let Some(moved_id) = &result.moved {
            let (new_parent_id, after_sibling_id) = {
                let tree = self.lock_tree();
                let parent = tree.parent_of(moved_id).map(str::to_string);
                (parent, previous_sibling_of(&tree, moved_id))
            };
            self.emit(DomainEvent::NodeMoved {
                id: moved_id.clone(),
                new_parent_id,
                after_sibling_id,
            });
        }

        self.emit_nodes_changed();
        Ok(Some(result.outcome))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn lock_tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: DomainEvent) {
        // fire-and-forget: no subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn emit_nodes_changed(&self) {
        let roots = self.lock_tree().roots().to_vec();
        self.emit(DomainEvent::NodesChanged { roots });
    }
}

/// Resolve the insertion index for a create within the target sibling list.
///
/// An unknown parent is an error; a sibling anchor that is no longer in the
/// list (deleted or moved since the caller last looked) degrades to an
/// append at the end.
fn insertion_index(
    tree: &Tree,
    parent_id: Option<&str>,
    insert_after_id: Option<&str>,
) -> Result<usize, NodeServiceError> {
    let list = match parent_id {
        Some(pid) => {
            if !tree.contains(pid) {
                return Err(NodeServiceError::node_not_found(pid));
            }
            tree.children_of(pid)
        }
        None => tree.roots(),
    };
    let anchor = insert_after_id.and_then(|after| list.iter().position(|s| s == after));
    Ok(match anchor {
        Some(index) => index + 1,
        None => list.len(),
    })
}

/// Index of `sibling_id` within the list owned by `parent_id` (roots when
/// `None`), verifying it actually lives there.
fn sibling_position(
    tree: &Tree,
    parent_id: Option<&str>,
    sibling_id: &str,
) -> Result<usize, NodeServiceError> {
    let list = match parent_id {
        Some(pid) => {
            if !tree.contains(pid) {
                return Err(NodeServiceError::node_not_found(pid));
            }
            tree.children_of(pid)
        }
        None => tree.roots(),
    };
    list.iter()
        .position(|s| s == sibling_id)
        .ok_or_else(|| {
            NodeServiceError::invalid_update(format!(
                "{sibling_id} is not a sibling in the target list"
            ))
        })
}

fn previous_sibling_of(tree: &Tree, id: &str) -> Option<String> {
    tree.previous_sibling(id).ok().flatten()
}

#[cfg(test)]
#[path = "node_service_test.rs"]
mod node_service_test;
