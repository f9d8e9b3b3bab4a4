//! Node Data Structures
//!
//! This module defines the core `Node` struct and related types for Blockline's
//! universal block system.
//!
//! # Architecture
//!
//! - **Universal Node**: a single struct represents all block types
//! - **Pure JSON properties**: all type-specific data lives in the `properties` field
//! - **Arena relations**: `parent_id` and `children` are plain id references;
//!   the [`Tree`](crate::tree::Tree) arena owns every record, so there are no
//!   reference cycles to manage
//!
//! # Examples
//!
//! ```rust
//! use blockline_core::models::{Node, NodeType};
//! use serde_json::json;
//!
//! // Create a text node
//! let text = Node::new(NodeType::Text, "My first note".to_string(), json!({}));
//!
//! // Create a task node with properties
//! let task = Node::new(
//!     NodeType::Task,
//!     "Ship the release".to_string(),
//!     json!({ "task": { "status": "in_progress" } }),
//! );
//! assert!(task.validate().is_ok());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for Node operations
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid node type: {0}")]
    InvalidNodeType(String),

    #[error("Invalid node ID format: {0}")]
    InvalidId(String),

    #[error("Invalid parent reference: {0}")]
    InvalidParent(String),

    #[error("Properties validation failed: {0}")]
    InvalidProperties(String),
}

/// Closed vocabulary of block types.
///
/// The type decides which structural edit behavior applies (see
/// [`crate::behaviors`]) and which type-specific fields live in `properties`.
/// Dispatch happens through pattern matching on this enum rather than a
/// runtime-mutable registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Plain text block (default)
    Text,
    /// Task with a status
    Task,
    /// Calendar date block
    Date,
    /// Structured entity (person, place, ...)
    Entity,
    /// Image block (payload referenced, not embedded)
    Image,
    /// AI chat block (question + recorded messages)
    Chat,
}

impl NodeType {
    /// String tag used in serialized form and host-facing notifications
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Task => "task",
            Self::Date => "date",
            Self::Entity => "entity",
            Self::Image => "image",
            Self::Chat => "chat",
        }
    }

    /// All known node types, in a stable order
    pub const ALL: [NodeType; 6] = [
        Self::Text,
        Self::Task,
        Self::Date,
        Self::Entity,
        Self::Image,
        Self::Chat,
    ];
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "task" => Ok(Self::Task),
            "date" => Ok(Self::Date),
            "entity" => Ok(Self::Entity),
            "image" => Ok(Self::Image),
            "chat" => Ok(Self::Chat),
            other => Err(ValidationError::InvalidNodeType(other.to_string())),
        }
    }
}

/// Universal node structure for all block types in Blockline.
///
/// # Fields
///
/// - `id`: unique identifier (UUID string; immutable once durable)
/// - `node_type`: closed type tag deciding edit behavior and properties shape
/// - `content`: primary textual payload (opaque to the engine; no markdown
///   parsing happens here)
/// - `tags`: free-form labels, insertion order preserved
/// - `metadata`: free-form JSON object for host annotations
/// - `properties`: type-specific fields as a JSON object (task status, date
///   value/format, entity attributes, image source, chat messages)
/// - `parent_id`: id of the parent node; `None` means this node is a root
/// - `children`: ordered child ids (document order)
/// - `created_at` / `modified_at`: timestamps, `modified_at` bumped on update
///
/// # Pure JSON properties
///
/// ALL type-specific data is stored in the `properties` field, so new block
/// types never require changes to the record shape.
///
/// # Examples
///
/// ```rust
/// # use blockline_core::models::{Node, NodeType};
/// # use serde_json::json;
/// let task = Node::new(
///     NodeType::Task,
///     "Write documentation".to_string(),
///     json!({ "task": { "status": "pending" } }),
/// );
/// assert_eq!(task.node_type, NodeType::Task);
/// assert!(task.parent_id.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Unique identifier (UUID string)
    pub id: String,

    /// Block type tag
    pub node_type: NodeType,

    /// Primary content/text of the node
    pub content: String,

    /// Free-form labels (insertion order preserved)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    /// Free-form host metadata (JSON object)
    #[serde(default = "empty_object")]
    pub metadata: serde_json::Value,

    /// All type-specific fields (pure JSON)
    pub properties: serde_json::Value,

    /// Parent node id (`None` means root)
    pub parent_id: Option<String>,

    /// Ordered child ids (document order)
    #[serde(default)]
    pub children: Vec<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last modification timestamp
    pub modified_at: DateTime<Utc>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Node {
    /// Create a new Node with an auto-generated UUID.
    ///
    /// The node starts detached: no parent, no children. Attachment happens
    /// through [`Tree`](crate::tree::Tree) mutators.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use blockline_core::models::{Node, NodeType};
    /// # use serde_json::json;
    /// let node = Node::new(NodeType::Text, "Hello World".to_string(), json!({}));
    /// assert!(!node.id.is_empty());
    /// ```
    pub fn new(node_type: NodeType, content: String, properties: serde_json::Value) -> Self {
        Self::new_with_id(Uuid::new_v4().to_string(), node_type, content, properties)
    }

    /// Create a new Node with an explicit id (tests, host-provided ids).
    pub fn new_with_id(
        id: String,
        node_type: NodeType,
        content: String,
        properties: serde_json::Value,
    ) -> Self {
        let now = Utc::now();

        Self {
            id,
            node_type,
            content,
            tags: Vec::new(),
            metadata: empty_object(),
            properties,
            parent_id: None,
            children: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    /// Validate node structure and required fields.
    ///
    /// Content is allowed to be empty: blank nodes are valid during editing
    /// and are created every time the user presses Enter at offset 0.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if:
    /// - `id` is empty
    /// - `properties` or `metadata` is not a JSON object
    /// - the node references itself as parent or child
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.is_empty() {
            return Err(ValidationError::MissingField("id".to_string()));
        }

        if !self.properties.is_object() {
            return Err(ValidationError::InvalidProperties(format!(
                "properties must be a JSON object, got {}",
                json_kind(&self.properties)
            )));
        }

        if !self.metadata.is_object() {
            return Err(ValidationError::InvalidProperties(format!(
                "metadata must be a JSON object, got {}",
                json_kind(&self.metadata)
            )));
        }

        if self.parent_id.as_deref() == Some(self.id.as_str()) {
            return Err(ValidationError::InvalidParent(format!(
                "node {} references itself as parent",
                self.id
            )));
        }

        if self.children.iter().any(|c| c == &self.id) {
            return Err(ValidationError::InvalidParent(format!(
                "node {} references itself as child",
                self.id
            )));
        }

        Ok(())
    }

    /// Whether this node is a root (no parent)
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Content length in characters (cursor offsets are character offsets)
    pub fn content_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Add a tag if not already present; returns true when added
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if self.tags.iter().any(|t| t == &tag) {
            return false;
        }
        self.tags.push(tag);
        self.touch();
        true
    }

    /// Remove a tag by value; returns true when removed
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        let removed = self.tags.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    /// Set a single metadata field
    pub fn set_metadata_field(&mut self, key: impl Into<String>, value: serde_json::Value) {
        if let Some(map) = self.metadata.as_object_mut() {
            map.insert(key.into(), value);
            self.touch();
        }
    }

    /// Bump the modification timestamp
    pub fn touch(&mut self) {
        self.modified_at = Utc::now();
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
