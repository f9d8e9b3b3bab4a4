//! Service Layer Error Types
//!
//! Error types for service-layer operations. "Not found" is a normal,
//! recoverable result carried as an error variant with a descriptive
//! message, never a panic; structural no-ops (a declined edit command) are
//! not errors at all and never appear here.

use crate::models::ValidationError;
use crate::tree::TreeError;
use thiserror::Error;

/// Service operation errors
#[derive(Error, Debug)]
pub enum NodeServiceError {
    /// Node not found by ID
    #[error("Node not found: {id}")]
    NodeNotFound { id: String },

    /// Validation failed for node
    #[error("Node validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),

    /// Arena mutation failed
    #[error("Tree operation failed: {0}")]
    TreeOperationFailed(TreeError),

    /// Node hierarchy constraint violation (e.g. moving a node under its
    /// own descendant)
    #[error("Hierarchy constraint violated: {0}")]
    HierarchyViolation(String),

    /// Invalid update operation
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Identity finalization failed
    #[error("Identity finalization failed for {node_id}: {message}")]
    FinalizationFailed { node_id: String, message: String },
}

impl From<TreeError> for NodeServiceError {
    fn from(err: TreeError) -> Self {
        match err {
            TreeError::NodeNotFound { id } => Self::NodeNotFound { id },
            other => Self::TreeOperationFailed(other),
        }
    }
}

impl NodeServiceError {
    /// Create a node not found error
    pub fn node_not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }

    /// Create a hierarchy violation error
    pub fn hierarchy_violation(msg: impl Into<String>) -> Self {
        Self::HierarchyViolation(msg.into())
    }

    /// Create an invalid update error
    pub fn invalid_update(msg: impl Into<String>) -> Self {
        Self::InvalidUpdate(msg.into())
    }

    /// Create a finalization failure error
    pub fn finalization_failed(node_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FinalizationFailed {
            node_id: node_id.into(),
            message: message.into(),
        }
    }
}
