//! Structural Edit Algorithms
//!
//! Keyboard commands that change text content and tree shape at the same
//! time: Enter splits a node, Backspace/Delete merge visible neighbors, Tab
//! and Shift+Tab move subtrees sideways. Each command either *declines*
//! (structural no-op, the tree is untouched and the caller falls back to
//! plain text editing) or mutates the arena and reports where focus and the
//! cursor should land.
//!
//! The algorithms are pure functions over [`Tree`] plus the collapsed-id set;
//! they never talk to collaborators. Event emission and collapse-state
//! bookkeeping happen one layer up in
//! [`NodeService`](crate::services::NodeService).

mod commands;
mod transfer;

pub use transfer::transfer_children;

use crate::models::Node;
use crate::tree::{Tree, TreeError};
use std::collections::HashSet;

/// A structural keyboard command aimed at a focused node.
///
/// Offsets are character offsets (cursor positions), not byte indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditCommand {
    /// Enter: split the node's content at the cursor
    Split { offset: usize },
    /// Backspace at offset 0: merge into the previous visible node
    MergeBackward,
    /// Delete at end of content: merge the next visible node into this one
    MergeForward,
    /// Tab: become the last child of the preceding sibling
    Indent { offset: usize },
    /// Shift+Tab: step out to the former parent's level
    Outdent { offset: usize },
}

/// Where focus and the cursor should move after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    /// Node that should receive focus
    pub focus_id: String,
    /// Character offset within that node's content
    pub cursor_offset: usize,
}

/// Context for a node deleted by a merge, carried on the deletion
/// notification so the host can mirror the change in durable storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionContext {
    /// Ids of the children the deleted node had, in order
    pub children: Vec<String>,
    /// Node that absorbed those children (per the depth-preserving rule)
    pub absorbed_by: Option<String>,
    /// The deleted node's former index among its siblings
    pub sibling_index: usize,
}

/// What a structural edit changed, for the service layer to report
#[derive(Debug, Clone)]
pub struct EditResult {
    /// Focus/cursor target
    pub outcome: EditOutcome,
    /// Node created by a split, if any
    pub created: Option<Node>,
    /// Node deleted by a merge, with its deletion context
    pub deleted: Option<(Node, DeletionContext)>,
    /// Node relocated by indent/outdent, if any
    pub moved: Option<String>,
    /// Collapsed ids that were auto-expanded by a children transfer
    pub expanded: Vec<String>,
}

impl EditResult {
    fn focus(focus_id: impl Into<String>, cursor_offset: usize) -> Self {
        Self {
            outcome: EditOutcome {
                focus_id: focus_id.into(),
                cursor_offset,
            },
            created: None,
            deleted: None,
            moved: None,
            expanded: Vec::new(),
        }
    }
}

/// Route a command to the structural edit algorithm for the focused node.
///
/// Returns `Ok(None)` when the command declines (precondition failed or the
/// node's type opts out), leaving the tree untouched.
///
/// # Errors
///
/// `TreeError::NodeNotFound` when `node_id` is not in the arena.
pub fn execute(
    tree: &mut Tree,
    collapsed: &HashSet<String>,
    node_id: &str,
    command: EditCommand,
) -> Result<Option<EditResult>, TreeError> {
    if !tree.contains(node_id) {
        return Err(TreeError::NodeNotFound {
            id: node_id.to_string(),
        });
    }
    match command {
        EditCommand::Split { offset } => commands::split(tree, collapsed, node_id, offset),
        EditCommand::MergeBackward => commands::merge_backward(tree, collapsed, node_id),
        EditCommand::MergeForward => commands::merge_forward(tree, collapsed, node_id),
        EditCommand::Indent { offset } => commands::indent(tree, node_id, offset),
        EditCommand::Outdent { offset } => commands::outdent(tree, node_id, offset),
    }
}

#[cfg(test)]
#[path = "commands_test.rs"]
mod commands_test;
