//! Per-command structural edit implementations.
//!
//! Edge-case notes live on each function; the shared children re-homing rule
//! is in [`super::transfer`].

use crate::behaviors::behavior_for;
use crate::editing::{transfer_children, DeletionContext, EditResult};
use crate::models::NodeFactory;
use crate::tree::{Tree, TreeError};
use std::collections::HashSet;

/// Byte index of the `offset`-th character (content end when past the end)
fn char_to_byte(content: &str, offset: usize) -> usize {
    content
        .char_indices()
        .nth(offset)
        .map(|(i, _)| i)
        .unwrap_or(content.len())
}

fn clamped_offset(tree: &Tree, node_id: &str, offset: usize) -> usize {
    tree.get(node_id)
        .map(|n| offset.min(n.content_len()))
        .unwrap_or(0)
}

/// Enter: split `node_id`'s content at the cursor.
///
/// Offset 0 inserts a fresh empty same-type sibling *before* the node (the
/// "new line above" gesture) and leaves content and children alone.
/// Otherwise the node keeps the left half, a new same-type sibling holding
/// the right half goes in after it, and the children follow what the user
/// currently sees below the split point: a collapsed node keeps them, an
/// expanded node hands them to the new right sibling.
pub(super) fn split(
    tree: &mut Tree,
    collapsed: &HashSet<String>,
    node_id: &str,
    offset: usize,
) -> Result<Option<EditResult>, TreeError> {
    let (node_type, content) = {
        let node = tree.get(node_id).ok_or_else(|| TreeError::not_found(node_id))?;
        (node.node_type, node.content.clone())
    };
    let sibling_index = tree.sibling_index(node_id)?;
    let parent_id = tree.parent_of(node_id).map(str::to_string);

    if offset == 0 {
        let new_node = NodeFactory::create(node_type, "");
        let new_id = new_node.id.clone();
        match &parent_id {
            Some(pid) => tree.insert_child_at(pid, sibling_index, new_node)?,
            None => tree.insert_root_at(sibling_index, new_node)?,
        }
        tracing::debug!(node_id, new_id = %new_id, "split at offset 0: empty sibling above");

        let mut result = EditResult::focus(&new_id, 0);
        result.created = tree.get(&new_id).cloned();
        return Ok(Some(result));
    }

    let offset = offset.min(content.chars().count());
    let byte_index = char_to_byte(&content, offset);
    let left = content[..byte_index].to_string();
    let right = content[byte_index..].to_string();

    let new_node = NodeFactory::create(node_type, right);
    let new_id = new_node.id.clone();
    match &parent_id {
        Some(pid) => tree.insert_child_at(pid, sibling_index + 1, new_node)?,
        None => tree.insert_root_at(sibling_index + 1, new_node)?,
    }

    if let Some(node) = tree.get_mut(node_id) {
        node.content = left;
        node.touch();
    }

    // Expanded node: the children sit visually below the split point, so
    // they belong to the right half. Collapsed node: they stay hidden under
    // the original.
    if !collapsed.contains(node_id) {
        let child_ids = tree.children_of(node_id).to_vec();
        for child_id in &child_ids {
            tree.detach(child_id)?;
            tree.attach_child(&new_id, child_id)?;
        }
    }

    tracing::debug!(node_id, new_id = %new_id, offset, "split node");

    let mut result = EditResult::focus(&new_id, 0);
    result.created = tree.get(&new_id).cloned();
    Ok(Some(result))
}

/// Backspace at offset 0: merge this node into the previous *visible* node.
///
/// Declines when the node's type opts out of merging, or when no previous
/// visible node exists (first visible node, or the node is hidden inside a
/// collapsed subtree). Children are re-homed depth-preservingly.
pub(super) fn merge_backward(
    tree: &mut Tree,
    collapsed: &HashSet<String>,
    node_id: &str,
) -> Result<Option<EditResult>, TreeError> {
    let (node_type, content) = {
        let node = tree.get(node_id).ok_or_else(|| TreeError::not_found(node_id))?;
        (node.node_type, node.content.clone())
    };
    if !behavior_for(node_type).allows_merge() {
        return Ok(None);
    }

    let visible = tree.visible_ids(collapsed);
    let Some(index) = visible.iter().position(|v| v == node_id) else {
        return Ok(None);
    };
    if index == 0 {
        return Ok(None);
    }
    let prev_id = visible[index - 1].clone();

    let join_offset = tree
        .get(&prev_id)
        .map(|n| n.content_len())
        .ok_or_else(|| TreeError::not_found(prev_id.clone()))?;

    let sibling_index = tree.sibling_index(node_id)?;
    let was_root = tree.get(node_id).map(|n| n.is_root()).unwrap_or(false);

    if !content.is_empty() {
        if let Some(prev) = tree.get_mut(&prev_id) {
            prev.content.push_str(&content);
            prev.touch();
        }
    }

    let (removed, _) = tree.remove_single(node_id)?;
    let child_ids = removed.children.clone();
    let transfer = transfer_children(tree, collapsed, was_root, &child_ids, &prev_id)?;

    tracing::debug!(
        node_id,
        prev_id = %prev_id,
        children = child_ids.len(),
        "merged node backward"
    );

    let context = DeletionContext {
        absorbed_by: (!child_ids.is_empty()).then(|| transfer.receiver.clone()),
        children: child_ids,
        sibling_index,
    };
    let mut result = EditResult::focus(&prev_id, join_offset);
    result.deleted = Some((removed, context));
    result.expanded = transfer.expanded.into_iter().collect();
    Ok(Some(result))
}

/// Delete at end of content: merge the next *visible* node into this one.
///
/// Declines when the next node's type refuses to be merged away (regardless
/// of this node's own type), or when no next visible node exists.
pub(super) fn merge_forward(
    tree: &mut Tree,
    collapsed: &HashSet<String>,
    node_id: &str,
) -> Result<Option<EditResult>, TreeError> {
    let visible = tree.visible_ids(collapsed);
    let Some(index) = visible.iter().position(|v| v == node_id) else {
        return Ok(None);
    };
    let Some(next_id) = visible.get(index + 1).cloned() else {
        return Ok(None);
    };

    let (next_type, next_content) = {
        let next = tree
            .get(&next_id)
            .ok_or_else(|| TreeError::not_found(next_id.clone()))?;
        (next.node_type, next.content.clone())
    };
    if !behavior_for(next_type).allows_merge() {
        return Ok(None);
    }

    let join_offset = tree
        .get(node_id)
        .map(|n| n.content_len())
        .ok_or_else(|| TreeError::not_found(node_id))?;

    let sibling_index = tree.sibling_index(&next_id)?;
    let was_root = tree.get(&next_id).map(|n| n.is_root()).unwrap_or(false);

    if !next_content.is_empty() {
        if let Some(node) = tree.get_mut(node_id) {
            node.content.push_str(&next_content);
            node.touch();
        }
    }

    let (removed, _) = tree.remove_single(&next_id)?;
    let child_ids = removed.children.clone();
    let transfer = transfer_children(tree, collapsed, was_root, &child_ids, node_id)?;

    tracing::debug!(
        node_id,
        next_id = %next_id,
        children = child_ids.len(),
        "merged next node forward"
    );

    let context = DeletionContext {
        absorbed_by: (!child_ids.is_empty()).then(|| transfer.receiver.clone()),
        children: child_ids,
        sibling_index,
    };
    let mut result = EditResult::focus(node_id, join_offset);
    result.deleted = Some((removed, context));
    result.expanded = transfer.expanded.into_iter().collect();
    Ok(Some(result))
}

/// Tab: append the node (subtree and all) as the last child of its
/// immediately preceding sibling. Declines for a first child / first root.
pub(super) fn indent(
    tree: &mut Tree,
    node_id: &str,
    offset: usize,
) -> Result<Option<EditResult>, TreeError> {
    let Some(prev_sibling) = tree.previous_sibling(node_id)? else {
        return Ok(None);
    };

    tree.detach(node_id)?;
    tree.attach_child(&prev_sibling, node_id)?;

    tracing::debug!(node_id, new_parent = %prev_sibling, "indented node");

    let mut result = EditResult::focus(node_id, clamped_offset(tree, node_id, offset));
    result.moved = Some(node_id.to_string());
    Ok(Some(result))
}

/// Shift+Tab: reinsert the node immediately after its former parent, at the
/// parent's level. Declines for roots. Siblings that followed the node under
/// the former parent become its leading children, so their relative order
/// survives the hop.
pub(super) fn outdent(
    tree: &mut Tree,
    node_id: &str,
    offset: usize,
) -> Result<Option<EditResult>, TreeError> {
    let Some(parent_id) = tree.parent_of(node_id).map(str::to_string) else {
        return Ok(None);
    };
    let grandparent_id = tree.parent_of(&parent_id).map(str::to_string);

    let index = tree.sibling_index(node_id)?;
    let followers: Vec<String> = tree.children_of(&parent_id)[index + 1..].to_vec();

    tree.detach(node_id)?;
    for follower in &followers {
        tree.detach(follower)?;
    }
    for (position, follower) in followers.iter().enumerate() {
        tree.attach_child_at(node_id, follower, position)?;
    }

    let parent_index = tree.sibling_index(&parent_id)?;
    match &grandparent_id {
        Some(gp) => tree.attach_child_at(gp, node_id, parent_index + 1)?,
        None => tree.attach_root_at(node_id, parent_index + 1)?,
    }

    tracing::debug!(
        node_id,
        former_parent = %parent_id,
        adopted = followers.len(),
        "outdented node"
    );

    let mut result = EditResult::focus(node_id, clamped_offset(tree, node_id, offset));
    result.moved = Some(node_id.to_string());
    Ok(Some(result))
}
