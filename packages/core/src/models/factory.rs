//! Node Factory
//!
//! Constructs nodes of a requested type with that type's default field
//! values. The defaults come from the behavior table (see
//! [`crate::behaviors`]), so the factory stays a thin facade: one place to
//! create a node from a type tag, used by the CRUD layer and by split when it
//! manufactures a same-type sibling.

use crate::behaviors::behavior_for;
use crate::models::{Node, NodeType};

/// Factory for nodes with per-type default properties
pub struct NodeFactory;

impl NodeFactory {
    /// Create a node of `node_type` with default properties and the given
    /// content.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use blockline_core::models::{NodeFactory, NodeType};
    ///
    /// let task = NodeFactory::create(NodeType::Task, "Buy milk");
    /// assert_eq!(
    ///     task.properties.pointer("/task/status").unwrap(),
    ///     "pending"
    /// );
    /// ```
    pub fn create(node_type: NodeType, content: impl Into<String>) -> Node {
        Node::new(
            node_type,
            content.into(),
            behavior_for(node_type).default_properties(),
        )
    }

    /// Create a node with an explicit id (host-provided identifiers)
    pub fn create_with_id(id: String, node_type: NodeType, content: impl Into<String>) -> Node {
        Node::new_with_id(
            id,
            node_type,
            content.into(),
            behavior_for(node_type).default_properties(),
        )
    }
}
