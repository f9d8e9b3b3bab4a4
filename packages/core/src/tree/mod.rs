//! Arena-Based Document Forest
//!
//! The [`Tree`] owns every node in an id-indexed arena and keeps the
//! hierarchy as plain id relations: each node records its `parent_id` and an
//! ordered `children` id list, and the tree keeps an ordered top-level
//! `roots` list. Ownership is unambiguous (the arena owns all records), so
//! there are no reference cycles and no weak pointers to manage.
//!
//! # Invariants
//!
//! 1. Tree-shaped: no node is its own ancestor; every non-root node has
//!    exactly one parent, reflected bidirectionally.
//! 2. Ids are unique across the whole forest.
//! 3. A node is a root iff its `parent_id` is `None`; roots are held in an
//!    ordered list.
//! 4. Children order is a total order; mutations preserve the relative order
//!    of untouched siblings.
//!
//! Traversals are read-only; mutation happens only through the mutators
//! defined here, and the higher-level editing/CRUD layers build on them.

use crate::models::Node;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Errors raised by arena mutations
#[derive(Error, Debug)]
pub enum TreeError {
    /// No node with the given id exists in the arena
    #[error("Node not found in tree: {id}")]
    NodeNotFound { id: String },

    /// A node with the given id is already registered
    #[error("Duplicate node id: {id}")]
    DuplicateId { id: String },

    /// Attach called on a node that is still linked into the hierarchy
    #[error("Node is already attached: {id}")]
    AlreadyAttached { id: String },
}

impl TreeError {
    pub(crate) fn not_found(id: impl Into<String>) -> Self {
        Self::NodeNotFound { id: id.into() }
    }
}

/// Where a detached node used to live, so callers can splice replacements
/// into the exact same position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetachedPosition {
    /// Former parent id (`None` for a root)
    pub parent_id: Option<String>,
    /// Former index among siblings (or among roots)
    pub index: usize,
}

/// Id-indexed arena holding the whole document forest
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: HashMap<String, Node>,
    roots: Vec<String>,
}

impl Tree {
    /// Create an empty forest
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest holds no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Ordered top-level node ids
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Look up a node by id
    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Look up a node by id, mutably
    pub fn get_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    /// Whether the arena contains the id
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Ordered child ids of a node (empty when unknown)
    pub fn children_of(&self, id: &str) -> &[String] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Parent id of a node, if any
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.nodes.get(id).and_then(|n| n.parent_id.as_deref())
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    /// Register a detached node and append it to the root list
    pub fn insert_root(&mut self, node: Node) -> Result<(), TreeError> {
        let index = self.roots.len();
        self.insert_root_at(index, node)
    }

    /// Register a detached node as a root at `index` (clamped)
    pub fn insert_root_at(&mut self, index: usize, mut node: Node) -> Result<(), TreeError> {
        if self.nodes.contains_key(&node.id) {
            return Err(TreeError::DuplicateId { id: node.id });
        }
        node.parent_id = None;
        let index = index.min(self.roots.len());
        self.roots.insert(index, node.id.clone());
        self.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Register a detached node and append it to `parent_id`'s children
    pub fn insert_child(&mut self, parent_id: &str, node: Node) -> Result<(), TreeError> {
        let index = self.children_of(parent_id).len();
        self.insert_child_at(parent_id, index, node)
    }

    /// Register a detached node as a child of `parent_id` at `index` (clamped)
    pub fn insert_child_at(
        &mut self,
        parent_id: &str,
        index: usize,
        mut node: Node,
    ) -> Result<(), TreeError> {
        if self.nodes.contains_key(&node.id) {
            return Err(TreeError::DuplicateId { id: node.id });
        }
        if !self.nodes.contains_key(parent_id) {
            return Err(TreeError::not_found(parent_id));
        }
        node.parent_id = Some(parent_id.to_string());
        let id = node.id.clone();
        self.nodes.insert(id.clone(), node);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            let index = index.min(parent.children.len());
            parent.children.insert(index, id);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Detach / attach (move primitives)
    // ------------------------------------------------------------------

    /// Unlink a node from its parent's children (or the root list) without
    /// removing it from the arena. Returns where it used to live.
    ///
    /// The node is left in a transient detached state; callers re-attach it
    /// (or its replacement) before returning control.
    pub fn detach(&mut self, id: &str) -> Result<DetachedPosition, TreeError> {
        let parent_id = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::not_found(id))?
            .parent_id
            .clone();

        let index = match &parent_id {
            Some(pid) => {
                let parent = self
                    .nodes
                    .get_mut(pid)
                    .ok_or_else(|| TreeError::not_found(pid.clone()))?;
                let index = parent
                    .children
                    .iter()
                    .position(|c| c == id)
                    .ok_or_else(|| TreeError::not_found(id))?;
                parent.children.remove(index);
                index
            }
            None => {
                let index = self
                    .roots
                    .iter()
                    .position(|r| r == id)
                    .ok_or_else(|| TreeError::not_found(id))?;
                self.roots.remove(index);
                index
            }
        };

        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = None;
        }
        Ok(DetachedPosition { parent_id, index })
    }

    /// Re-link a detached node into the root list at `index` (clamped)
    pub fn attach_root_at(&mut self, id: &str, index: usize) -> Result<(), TreeError> {
        let node = self.nodes.get(id).ok_or_else(|| TreeError::not_found(id))?;
        // the node must be genuinely detached, not merely absent from this list
        if node.parent_id.is_some() || self.roots.iter().any(|r| r == id) {
            return Err(TreeError::AlreadyAttached { id: id.to_string() });
        }
        let index = index.min(self.roots.len());
        self.roots.insert(index, id.to_string());
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = None;
        }
        Ok(())
    }

    /// Re-link a detached node under `parent_id` at `index` (clamped)
    pub fn attach_child_at(
        &mut self,
        parent_id: &str,
        id: &str,
        index: usize,
    ) -> Result<(), TreeError> {
        let node = self.nodes.get(id).ok_or_else(|| TreeError::not_found(id))?;
        // a node still linked under a parent, or sitting in the root list,
        // is not detached and may not be attached a second time
        if node.parent_id.is_some() || self.roots.iter().any(|r| r == id) {
            return Err(TreeError::AlreadyAttached { id: id.to_string() });
        }
        let parent = self
            .nodes
            .get(parent_id)
            .ok_or_else(|| TreeError::not_found(parent_id))?;
        let len = parent.children.len();
        let index = index.min(len);
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.children.insert(index, id.to_string());
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent_id = Some(parent_id.to_string());
        }
        Ok(())
    }

    /// Re-link a detached node as the last child of `parent_id`
    pub fn attach_child(&mut self, parent_id: &str, id: &str) -> Result<(), TreeError> {
        let index = self.children_of(parent_id).len();
        self.attach_child_at(parent_id, id, index)
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove a node and its whole subtree from the arena.
    ///
    /// Returns the removed records in depth-first pre-order (the target node
    /// first), so callers can report what was destroyed.
    pub fn remove_subtree(&mut self, id: &str) -> Result<Vec<Node>, TreeError> {
        self.detach(id)?;
        let mut removed = Vec::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                // push in reverse so pre-order pops left to right
                stack.extend(node.children.iter().rev().cloned());
                removed.push(node);
            }
        }
        Ok(removed)
    }

    /// Remove exactly one node, leaving its children registered but detached.
    ///
    /// Used by merges: the caller immediately re-homes the children via the
    /// depth-preserving transfer rule.
    pub fn remove_single(&mut self, id: &str) -> Result<(Node, DetachedPosition), TreeError> {
        let position = self.detach(id)?;
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| TreeError::not_found(id))?;
        for child_id in &node.children {
            if let Some(child) = self.nodes.get_mut(child_id) {
                child.parent_id = None;
            }
        }
        Ok((node, position))
    }

    /// Remove a node, splicing its children into its former position among
    /// its former siblings ("promote in place").
    ///
    /// Returns the removed record together with where it lived.
    pub fn remove_promote(&mut self, id: &str) -> Result<(Node, DetachedPosition), TreeError> {
        let position = self.detach(id)?;
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| TreeError::not_found(id))?;

        for (offset, child_id) in node.children.iter().enumerate() {
            let index = position.index + offset;
            match &position.parent_id {
                Some(pid) => {
                    if let Some(parent) = self.nodes.get_mut(pid) {
                        parent.children.insert(index.min(parent.children.len()), child_id.clone());
                    }
                    if let Some(child) = self.nodes.get_mut(child_id) {
                        child.parent_id = Some(pid.clone());
                    }
                }
                None => {
                    let index = index.min(self.roots.len());
                    self.roots.insert(index, child_id.clone());
                    if let Some(child) = self.nodes.get_mut(child_id) {
                        child.parent_id = None;
                    }
                }
            }
        }

        Ok((node, position))
    }

    // ------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------

    /// Re-key a node in place (temporary → durable identifier swap).
    ///
    /// Every reference to the old id (arena key, parent's children list or
    /// root list, children's back-references) is rewritten.
    pub fn rename(&mut self, old_id: &str, new_id: &str) -> Result<(), TreeError> {
        if old_id == new_id {
            return Ok(());
        }
        if self.nodes.contains_key(new_id) {
            return Err(TreeError::DuplicateId {
                id: new_id.to_string(),
            });
        }
        let mut node = self
            .nodes
            .remove(old_id)
            .ok_or_else(|| TreeError::not_found(old_id))?;
        node.id = new_id.to_string();

        match &node.parent_id {
            Some(pid) => {
                if let Some(parent) = self.nodes.get_mut(pid) {
                    if let Some(slot) = parent.children.iter_mut().find(|c| *c == old_id) {
                        *slot = new_id.to_string();
                    }
                }
            }
            None => {
                if let Some(slot) = self.roots.iter_mut().find(|r| *r == old_id) {
                    *slot = new_id.to_string();
                }
            }
        }

        let child_ids = node.children.clone();
        self.nodes.insert(new_id.to_string(), node);
        for child_id in child_ids {
            if let Some(child) = self.nodes.get_mut(&child_id) {
                child.parent_id = Some(new_id.to_string());
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Traversal (read-only)
    // ------------------------------------------------------------------

    /// Depth-first pre-order ids over the whole forest
    pub fn flatten_ids(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<&str> = self.roots.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node.id.clone());
                stack.extend(node.children.iter().rev().map(String::as_str));
            }
        }
        out
    }

    /// Depth-first pre-order nodes over the whole forest
    pub fn flatten(&self) -> Vec<&Node> {
        self.flatten_ids()
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Depth-first pre-order ids, skipping descent into collapsed subtrees.
    ///
    /// Collapsed nodes themselves appear; their descendants do not. This is
    /// the sequence keyboard navigation and merge-neighbor lookup run on.
    pub fn visible_ids(&self, collapsed: &HashSet<String>) -> Vec<String> {
        let mut out = Vec::new();
        let mut stack: Vec<&str> = self.roots.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get(id) {
                out.push(node.id.clone());
                if !collapsed.contains(&node.id) {
                    stack.extend(node.children.iter().rev().map(String::as_str));
                }
            }
        }
        out
    }

    /// Index of a node among its siblings (or among roots)
    pub fn sibling_index(&self, id: &str) -> Result<usize, TreeError> {
        let siblings = self.sibling_list(id)?;
        siblings
            .iter()
            .position(|s| s == id)
            .ok_or_else(|| TreeError::not_found(id))
    }

    /// The sibling list a node lives in: its parent's children, or the roots
    pub fn sibling_list(&self, id: &str) -> Result<&[String], TreeError> {
        let node = self.nodes.get(id).ok_or_else(|| TreeError::not_found(id))?;
        Ok(match &node.parent_id {
            Some(pid) => self.children_of(pid),
            None => &self.roots,
        })
    }

    /// Immediately preceding sibling, if the node is not first in its list
    pub fn previous_sibling(&self, id: &str) -> Result<Option<String>, TreeError> {
        let index = self.sibling_index(id)?;
        if index == 0 {
            return Ok(None);
        }
        Ok(self.sibling_list(id)?.get(index - 1).cloned())
    }

    /// Topmost ancestor of a node (itself when it is a root)
    pub fn root_ancestor_of(&self, id: &str) -> Result<String, TreeError> {
        let mut current = self
            .nodes
            .get(id)
            .ok_or_else(|| TreeError::not_found(id))?;
        while let Some(pid) = &current.parent_id {
            current = self
                .nodes
                .get(pid)
                .ok_or_else(|| TreeError::not_found(pid.clone()))?;
        }
        Ok(current.id.clone())
    }

    /// Whether `ancestor_id` lies on the parent chain of `id` (strict:
    /// a node is not its own ancestor)
    pub fn is_ancestor(&self, ancestor_id: &str, id: &str) -> bool {
        let mut current = self.nodes.get(id).and_then(|n| n.parent_id.as_deref());
        while let Some(pid) = current {
            if pid == ancestor_id {
                return true;
            }
            current = self.nodes.get(pid).and_then(|n| n.parent_id.as_deref());
        }
        false
    }

    // ------------------------------------------------------------------
    // Auditing
    // ------------------------------------------------------------------

    /// Verify the structural invariants; returns a description of the first
    /// violation found. Used by tests after every mutation scenario.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = HashSet::new();

        for root_id in &self.roots {
            let root = self
                .nodes
                .get(root_id)
                .ok_or_else(|| format!("root list references unknown node {root_id}"))?;
            if root.parent_id.is_some() {
                return Err(format!("root {root_id} has a parent reference"));
            }
        }

        let mut stack: Vec<&str> = self.roots.iter().rev().map(String::as_str).collect();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_string()) {
                return Err(format!("node {id} reachable twice (cycle or shared child)"));
            }
            let node = self
                .nodes
                .get(id)
                .ok_or_else(|| format!("children list references unknown node {id}"))?;
            for child_id in &node.children {
                let child = self
                    .nodes
                    .get(child_id)
                    .ok_or_else(|| format!("child {child_id} of {id} is not in the arena"))?;
                if child.parent_id.as_deref() != Some(id) {
                    return Err(format!(
                        "child {child_id} of {id} points at parent {:?}",
                        child.parent_id
                    ));
                }
                stack.push(child_id);
            }
        }

        if seen.len() != self.nodes.len() {
            let orphans: Vec<&String> = self
                .nodes
                .keys()
                .filter(|k| !seen.contains(*k))
                .collect();
            return Err(format!("unreachable nodes in arena: {orphans:?}"));
        }

        Ok(())
    }
}
