//! Type-Safe TaskNode Wrapper
//!
//! Provides compile-time type safety and an ergonomic API for task nodes while
//! maintaining the universal Node storage model.
//!
//! # Examples
//!
//! ```rust
//! use blockline_core::models::{TaskNode, TaskStatus};
//!
//! let task = TaskNode::builder("Buy milk".to_string())
//!     .with_status(TaskStatus::InProgress)
//!     .build();
//!
//! assert_eq!(task.status(), TaskStatus::InProgress);
//! let node = task.into_node();
//! ```

use crate::models::{Node, NodeType, ValidationError};
use serde_json::json;
use std::str::FromStr;

/// Task status enum for type-safe status management.
///
/// Maps to string values under `properties.task.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task not yet started (default)
    Pending,
    /// Task currently being worked on
    InProgress,
    /// Task completed successfully
    Completed,
    /// Task cancelled and will not be completed
    Cancelled,
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Type-safe wrapper for task nodes.
///
/// The wrapper is a compile-time convenience: the underlying storage stays
/// the universal [`Node`] with task fields in `properties.task`.
pub struct TaskNode {
    node: Node,
}

impl TaskNode {
    /// Create a TaskNode from a universal Node.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::InvalidNodeType` if the node type is not
    /// [`NodeType::Task`].
    pub fn from_node(node: Node) -> Result<Self, ValidationError> {
        if node.node_type != NodeType::Task {
            return Err(ValidationError::InvalidNodeType(format!(
                "Expected 'task', got '{}'",
                node.node_type
            )));
        }
        Ok(Self { node })
    }

    /// Builder for a new TaskNode with the given content (task text)
    pub fn builder(content: String) -> TaskNodeBuilder {
        TaskNodeBuilder {
            content,
            status: TaskStatus::Pending,
            due_date: None,
        }
    }

    /// Current status; unknown/missing values fall back to `Pending`
    pub fn status(&self) -> TaskStatus {
        self.node
            .properties
            .pointer("/task/status")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse().ok())
            .unwrap_or(TaskStatus::Pending)
    }

    /// Set the status, bumping the modification timestamp
    pub fn set_status(&mut self, status: TaskStatus) {
        set_task_field(&mut self.node, "status", json!(status.to_string()));
    }

    /// Optional due date (ISO `YYYY-MM-DD`)
    pub fn due_date(&self) -> Option<String> {
        self.node
            .properties
            .pointer("/task/due_date")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Set or clear the due date
    pub fn set_due_date(&mut self, due_date: Option<String>) {
        set_task_field(
            &mut self.node,
            "due_date",
            due_date.map(serde_json::Value::String).unwrap_or(json!(null)),
        );
    }

    /// Get a reference to the underlying Node
    pub fn as_node(&self) -> &Node {
        &self.node
    }

    /// Get a mutable reference to the underlying Node
    pub fn as_node_mut(&mut self) -> &mut Node {
        &mut self.node
    }

    /// Convert back to the universal Node (consumes the wrapper)
    pub fn into_node(self) -> Node {
        self.node
    }
}

fn set_task_field(node: &mut Node, key: &str, value: serde_json::Value) {
    if !node.properties.is_object() {
        node.properties = json!({});
    }
    if let Some(obj) = node.properties.as_object_mut() {
        let task = obj.entry("task").or_insert_with(|| json!({}));
        if !task.is_object() {
            *task = json!({});
        }
        if let Some(task) = task.as_object_mut() {
            task.insert(key.to_string(), value);
        }
    }
    node.touch();
}

/// Builder for creating new TaskNode instances
pub struct TaskNodeBuilder {
    content: String,
    status: TaskStatus,
    due_date: Option<String>,
}

impl TaskNodeBuilder {
    /// Set the initial status
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set the due date (ISO `YYYY-MM-DD`)
    pub fn with_due_date(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    /// Build the TaskNode
    pub fn build(self) -> TaskNode {
        let properties = json!({
            "task": {
                "status": self.status.to_string(),
                "due_date": self.due_date,
            }
        });

        TaskNode {
            node: Node::new(NodeType::Task, self.content, properties),
        }
    }
}

#[cfg(test)]
#[path = "task_node_test.rs"]
mod task_node_test;
