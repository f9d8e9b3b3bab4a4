//! Domain Events
//!
//! Events emitted by [`NodeService`](crate::services::NodeService) whenever
//! the document forest changes. They follow the observer pattern: the host
//! subscribes through a tokio broadcast channel and mirrors changes into its
//! own storage and rendering, without the engine coupling to either.
//!
//! Emission is fire-and-forget: a send with no subscribers (or a lagging
//! subscriber) never fails the local mutation. The engine's position is that
//! local state is always correct and external sync can lag or fail
//! independently.

use crate::editing::DeletionContext;
use crate::models::Node;

/// Broadcast channel capacity for domain events
pub const DOMAIN_EVENT_CHANNEL_CAPACITY: usize = 128;

/// Domain events emitted by the engine
///
/// `NodesChanged` fires after *every* structural mutation and carries the
/// new root list; the semantic events carry enough context for the host to
/// mirror the specific change in durable storage.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    /// The forest shape changed; re-render from this root list
    NodesChanged { roots: Vec<String> },

    /// A new node was created.
    ///
    /// Only emitted when the node's content contains non-whitespace, so
    /// empty scratch nodes (Enter at offset 0) never reach durable storage.
    NodeCreated {
        node: Node,
        parent_id: Option<String>,
        after_sibling_id: Option<String>,
    },

    /// An existing node's fields were updated (position untouched)
    NodeUpdated { node: Node },

    /// A node was deleted. `context` is present for merge deletions and
    /// describes which node absorbed the children and where the node sat.
    NodeDeleted {
        id: String,
        context: Option<DeletionContext>,
    },

    /// A node was moved to a new parent/position
    NodeMoved {
        id: String,
        new_parent_id: Option<String>,
        after_sibling_id: Option<String>,
    },

    /// A node was repositioned among its current siblings
    NodeReordered {
        id: String,
        after_sibling_id: Option<String>,
    },
}

impl DomainEvent {
    /// Get a string tag for the event type (debugging, logging, host routing)
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::NodesChanged { .. } => "nodes:changed",
            DomainEvent::NodeCreated { .. } => "node:created",
            DomainEvent::NodeUpdated { .. } => "node:updated",
            DomainEvent::NodeDeleted { .. } => "node:deleted",
            DomainEvent::NodeMoved { .. } => "node:moved",
            DomainEvent::NodeReordered { .. } => "node:reordered",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NodeFactory, NodeType};

    #[test]
    fn test_event_type_tags() {
        let node = NodeFactory::create(NodeType::Text, "x");
        let created = DomainEvent::NodeCreated {
            node,
            parent_id: None,
            after_sibling_id: None,
        };
        assert_eq!(created.event_type(), "node:created");
        assert_eq!(
            DomainEvent::NodesChanged { roots: vec![] }.event_type(),
            "nodes:changed"
        );
    }
}
