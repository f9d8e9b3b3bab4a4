//! Node Behavior System
//!
//! This module provides the per-type behavior table for the block types:
//!
//! - `NodeBehavior` trait - type-specific edit policy and default properties
//! - Built-in behaviors (`TextBehavior`, `TaskBehavior`, etc.)
//! - [`behavior_for`] - closed dispatch table selected by pattern match
//!
//! Dispatch is a `match` over [`NodeType`] returning `'static` behavior
//! instances. There is no runtime-mutable registry: the set of block types is
//! closed, and adding one is a compile-time change.

use crate::models::{Node, NodeType, ValidationError};
use serde_json::json;

/// Type-specific edit policy for a block type.
///
/// Structural edit algorithms consult the behavior of the nodes involved
/// before mutating the tree. A behavior that refuses an operation makes the
/// command a structural no-op, never an error.
pub trait NodeBehavior: Send + Sync {
    /// The block type this behavior handles
    fn node_type(&self) -> NodeType;

    /// Whether a node of this type may be merged away (its content absorbed
    /// by a neighbor and the node deleted).
    ///
    /// Metadata-bearing types refuse: silently dropping a task's status or a
    /// chat's recorded messages on a Backspace keystroke would lose data.
    fn allows_merge(&self) -> bool {
        true
    }

    /// Default `properties` object for a freshly created node of this type
    fn default_properties(&self) -> serde_json::Value {
        json!({})
    }

    /// Type-specific validation, called on create and update after the
    /// structural checks in [`Node::validate`].
    fn validate(&self, _node: &Node) -> Result<(), ValidationError> {
        Ok(())
    }
}

/// Plain text blocks: fully mergeable, no extra fields
pub struct TextBehavior;

impl NodeBehavior for TextBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Text
    }
}

/// Task blocks: refuse merging to protect status metadata
pub struct TaskBehavior;

impl NodeBehavior for TaskBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Task
    }

    fn allows_merge(&self) -> bool {
        false
    }

    fn default_properties(&self) -> serde_json::Value {
        json!({
            "task": {
                "status": "pending",
                "due_date": null,
            }
        })
    }

    fn validate(&self, node: &Node) -> Result<(), ValidationError> {
        if let Some(status) = node.properties.pointer("/task/status").and_then(|v| v.as_str()) {
            status
                .parse::<crate::models::TaskStatus>()
                .map_err(ValidationError::InvalidProperties)?;
        }
        Ok(())
    }
}

/// Date blocks: content is the date text, mergeable like text
pub struct DateBehavior;

impl NodeBehavior for DateBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Date
    }

    fn default_properties(&self) -> serde_json::Value {
        json!({
            "date": {
                "value": chrono::Utc::now().date_naive().format("%Y-%m-%d").to_string(),
                "format": crate::models::DEFAULT_DATE_FORMAT,
            }
        })
    }
}

/// Entity blocks: refuse merging to protect structured attributes
pub struct EntityBehavior;

impl NodeBehavior for EntityBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Entity
    }

    fn allows_merge(&self) -> bool {
        false
    }

    fn default_properties(&self) -> serde_json::Value {
        json!({
            "entity": {
                "kind": "generic",
                "attributes": {},
            }
        })
    }

    fn validate(&self, node: &Node) -> Result<(), ValidationError> {
        match node.properties.pointer("/entity/attributes") {
            None | Some(serde_json::Value::Object(_)) => Ok(()),
            Some(_) => Err(ValidationError::InvalidProperties(
                "entity.attributes must be a JSON object".to_string(),
            )),
        }
    }
}

/// Image blocks: content is the caption; payload reference in properties
pub struct ImageBehavior;

impl NodeBehavior for ImageBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Image
    }

    fn allows_merge(&self) -> bool {
        false
    }

    fn default_properties(&self) -> serde_json::Value {
        json!({
            "image": {
                "source": null,
                "alt": null,
                "metadata": {},
            }
        })
    }
}

/// Chat blocks: content is the question; messages recorded in properties
pub struct ChatBehavior;

impl NodeBehavior for ChatBehavior {
    fn node_type(&self) -> NodeType {
        NodeType::Chat
    }

    fn allows_merge(&self) -> bool {
        false
    }

    fn default_properties(&self) -> serde_json::Value {
        json!({
            "chat": {
                "session_id": null,
                "messages": [],
            }
        })
    }

    fn validate(&self, node: &Node) -> Result<(), ValidationError> {
        match node.properties.pointer("/chat/messages") {
            None | Some(serde_json::Value::Array(_)) => Ok(()),
            Some(_) => Err(ValidationError::InvalidProperties(
                "chat.messages must be a JSON array".to_string(),
            )),
        }
    }
}

/// Look up the behavior for a block type.
///
/// A closed table: every [`NodeType`] has exactly one behavior, selected at
/// compile time.
pub fn behavior_for(node_type: NodeType) -> &'static dyn NodeBehavior {
    match node_type {
        NodeType::Text => &TextBehavior,
        NodeType::Task => &TaskBehavior,
        NodeType::Date => &DateBehavior,
        NodeType::Entity => &EntityBehavior,
        NodeType::Image => &ImageBehavior,
        NodeType::Chat => &ChatBehavior,
    }
}
