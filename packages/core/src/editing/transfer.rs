//! Depth-Preserving Children Transfer
//!
//! When a node with children is merged away, its children need a new home.
//! The rule keeps them at the nesting depth the user saw:
//!
//! - source was a **root**: its children were conceptually top-level, so they
//!   land on the *root ancestor* of the merge target
//! - source was **not** a root: its children move directly onto the merge
//!   target, one level up, depth unchanged
//!
//! Insertion position depends on the receiver's collapse state: a collapsed
//! receiver gets the transferred children at the **front** (first thing seen
//! on expansion, in their original order) and is auto-expanded; an expanded
//! receiver gets them appended.

use crate::tree::{Tree, TreeError};
use std::collections::HashSet;

/// Outcome of a children transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Node that received the children
    pub receiver: String,
    /// Receiver id when it was collapsed and had to be auto-expanded
    pub expanded: Option<String>,
}

/// Re-home the (already detached) children of a merged-away node.
///
/// `child_ids` must be registered in the arena but detached; they are
/// attached to the receiver in their original order.
pub fn transfer_children(
    tree: &mut Tree,
    collapsed: &HashSet<String>,
    source_was_root: bool,
    child_ids: &[String],
    merge_target: &str,
) -> Result<TransferOutcome, TreeError> {
    let receiver = if source_was_root {
        tree.root_ancestor_of(merge_target)?
    } else {
        merge_target.to_string()
    };

    if child_ids.is_empty() {
        return Ok(TransferOutcome {
            receiver,
            expanded: None,
        });
    }

    let receiver_collapsed = collapsed.contains(&receiver);
    if receiver_collapsed {
        for (index, child_id) in child_ids.iter().enumerate() {
            tree.attach_child_at(&receiver, child_id, index)?;
        }
    } else {
        for child_id in child_ids {
            tree.attach_child(&receiver, child_id)?;
        }
    }

    Ok(TransferOutcome {
        expanded: receiver_collapsed.then(|| receiver.clone()),
        receiver,
    })
}
