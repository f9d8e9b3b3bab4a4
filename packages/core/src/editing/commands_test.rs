//! Tests for the structural edit algorithms

#[cfg(test)]
mod tests {
    use crate::editing::{execute, EditCommand, EditResult};
    use crate::models::{NodeFactory, NodeType};
    use crate::tree::{Tree, TreeError};
    use std::collections::HashSet;

    fn text(id: &str, content: &str) -> crate::models::Node {
        NodeFactory::create_with_id(id.to_string(), NodeType::Text, content)
    }

    fn no_collapse() -> HashSet<String> {
        HashSet::new()
    }

    fn collapsed(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn run(
        tree: &mut Tree,
        collapsed: &HashSet<String>,
        node_id: &str,
        command: EditCommand,
    ) -> Option<EditResult> {
        let result = execute(tree, collapsed, node_id, command).unwrap();
        tree.check_invariants().unwrap();
        result
    }

    // ------------------------------------------------------------------
    // Split
    // ------------------------------------------------------------------

    #[test]
    fn test_split_hello_world_at_5() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "Hello World")).unwrap();

        let result = run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 5 }).unwrap();

        assert_eq!(tree.roots().len(), 2);
        assert_eq!(tree.get("n1").unwrap().content, "Hello");
        let new_id = &tree.roots()[1];
        assert_eq!(tree.get(new_id).unwrap().content, " World");
        assert_eq!(result.outcome.focus_id, *new_id);
        assert_eq!(result.outcome.cursor_offset, 0);
        assert_eq!(result.created.as_ref().unwrap().id, *new_id);
    }

    #[test]
    fn test_split_at_offset_0_inserts_empty_sibling_above() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "Hello")).unwrap();

        let result = run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 0 }).unwrap();

        assert_eq!(tree.roots().len(), 2);
        let new_id = &tree.roots()[0];
        assert_ne!(new_id, "n1");
        assert_eq!(tree.get(new_id).unwrap().content, "");
        // original keeps everything
        assert_eq!(tree.get("n1").unwrap().content, "Hello");
        assert_eq!(result.outcome.focus_id, *new_id);
        assert_eq!(result.outcome.cursor_offset, 0);
    }

    #[test]
    fn test_split_copies_type_with_default_properties() {
        let mut tree = Tree::new();
        let mut task = NodeFactory::create_with_id("t1".to_string(), NodeType::Task, "ab");
        task.properties = serde_json::json!({ "task": { "status": "completed" } });
        tree.insert_root(task).unwrap();

        run(&mut tree, &no_collapse(), "t1", EditCommand::Split { offset: 1 }).unwrap();

        let new_id = &tree.roots()[1];
        let new_node = tree.get(new_id).unwrap();
        assert_eq!(new_node.node_type, NodeType::Task);
        // new sibling starts from type defaults, not a copy of the original
        assert_eq!(
            new_node.properties.pointer("/task/status").unwrap(),
            "pending"
        );
    }

    #[test]
    fn test_split_expanded_node_hands_children_to_right_half() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "ABCD")).unwrap();
        tree.insert_child("n1", text("c1", "child1")).unwrap();
        tree.insert_child("n1", text("c2", "child2")).unwrap();

        run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 2 }).unwrap();

        let new_id = tree.roots()[1].clone();
        assert!(tree.children_of("n1").is_empty());
        assert_eq!(tree.children_of(&new_id), &["c1", "c2"]);
    }

    #[test]
    fn test_split_collapsed_node_keeps_children() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "ABCD")).unwrap();
        tree.insert_child("n1", text("c1", "child1")).unwrap();

        run(
            &mut tree,
            &collapsed(&["n1"]),
            "n1",
            EditCommand::Split { offset: 2 },
        )
        .unwrap();

        let new_id = tree.roots()[1].clone();
        assert_eq!(tree.children_of("n1"), &["c1"]);
        assert!(tree.children_of(&new_id).is_empty());
    }

    #[test]
    fn test_split_at_multibyte_boundary() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "héllo")).unwrap();

        run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 2 }).unwrap();

        assert_eq!(tree.get("n1").unwrap().content, "hé");
        assert_eq!(tree.get(&tree.roots()[1].clone()).unwrap().content, "llo");
    }

    #[test]
    fn test_split_past_end_creates_empty_right_sibling() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "ab")).unwrap();

        run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 99 }).unwrap();

        assert_eq!(tree.get("n1").unwrap().content, "ab");
        assert_eq!(tree.get(&tree.roots()[1].clone()).unwrap().content, "");
    }

    #[test]
    fn test_split_unknown_node_errors() {
        let mut tree = Tree::new();
        let result = execute(
            &mut tree,
            &no_collapse(),
            "ghost",
            EditCommand::Split { offset: 0 },
        );
        assert!(matches!(result, Err(TreeError::NodeNotFound { .. })));
    }

    // ------------------------------------------------------------------
    // Merge backward
    // ------------------------------------------------------------------

    #[test]
    fn test_split_then_merge_backward_round_trips() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "ABCD")).unwrap();

        run(&mut tree, &no_collapse(), "n1", EditCommand::Split { offset: 2 }).unwrap();
        let right_id = tree.roots()[1].clone();

        let result = run(&mut tree, &no_collapse(), &right_id, EditCommand::MergeBackward).unwrap();

        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.get("n1").unwrap().content, "ABCD");
        assert_eq!(result.outcome.focus_id, "n1");
        assert_eq!(result.outcome.cursor_offset, 2); // the join offset
    }

    #[test]
    fn test_merge_backward_first_visible_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "only")).unwrap();
        assert!(run(&mut tree, &no_collapse(), "n1", EditCommand::MergeBackward).is_none());
    }

    #[test]
    fn test_merge_backward_empty_node_deleted_focus_at_prev_end() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "Hello")).unwrap();
        tree.insert_root(text("n2", "")).unwrap();

        let result = run(&mut tree, &no_collapse(), "n2", EditCommand::MergeBackward).unwrap();

        assert_eq!(tree.roots(), &["n1"]);
        assert_eq!(tree.get("n1").unwrap().content, "Hello");
        assert_eq!(result.outcome.focus_id, "n1");
        assert_eq!(result.outcome.cursor_offset, 5);
        let (deleted, context) = result.deleted.unwrap();
        assert_eq!(deleted.id, "n2");
        assert_eq!(context.sibling_index, 1);
        assert!(context.children.is_empty());
        assert!(context.absorbed_by.is_none());
    }

    #[test]
    fn test_merge_backward_depth_preserved_one_level_up() {
        // root A > child B > child C; merging B into A leaves C a child of A
        let mut tree = Tree::new();
        tree.insert_root(text("A", "A")).unwrap();
        tree.insert_child("A", text("B", "B")).unwrap();
        tree.insert_child("B", text("C", "C")).unwrap();

        let result = run(&mut tree, &no_collapse(), "B", EditCommand::MergeBackward).unwrap();

        assert_eq!(tree.get("A").unwrap().content, "AB");
        assert_eq!(tree.children_of("A"), &["C"]);
        assert_eq!(tree.parent_of("C"), Some("A"));
        let (_, context) = result.deleted.unwrap();
        assert_eq!(context.absorbed_by.as_deref(), Some("A"));
        assert_eq!(context.children, vec!["C"]);
    }

    #[test]
    fn test_merge_backward_root_children_go_to_root_ancestor() {
        // Roots [R1, R2]; R1 has deep child D; R2 has children.
        // Merging root R2 into D's subtree bottom: prev visible of R2 is the
        // last visible node of R1's subtree. R2's children must land on R1
        // (the root ancestor), keeping them conceptually top-level.
        let mut tree = Tree::new();
        tree.insert_root(text("R1", "one")).unwrap();
        tree.insert_child("R1", text("D", "deep")).unwrap();
        tree.insert_root(text("R2", "two")).unwrap();
        tree.insert_child("R2", text("K1", "kid1")).unwrap();
        tree.insert_child("R2", text("K2", "kid2")).unwrap();

        let result = run(&mut tree, &no_collapse(), "R2", EditCommand::MergeBackward).unwrap();

        // content merged into D (previous visible node)
        assert_eq!(tree.get("D").unwrap().content, "deeptwo");
        // children landed on R1, not on D
        assert_eq!(tree.children_of("R1"), &["D", "K1", "K2"]);
        assert_eq!(tree.parent_of("K1"), Some("R1"));
        let (_, context) = result.deleted.unwrap();
        assert_eq!(context.absorbed_by.as_deref(), Some("R1"));
    }

    #[test]
    fn test_merge_transfer_into_collapsed_parent_prepends_and_expands() {
        // Target parent P (collapsed, child Z); deleted node brings [X, Y].
        let mut tree = Tree::new();
        tree.insert_root(text("P", "p")).unwrap();
        tree.insert_child("P", text("Z", "z")).unwrap();
        tree.insert_root(text("M", "m")).unwrap();
        tree.insert_child("M", text("X", "x")).unwrap();
        tree.insert_child("M", text("Y", "y")).unwrap();

        // P collapsed: previous visible node of M is P itself
        let result = run(&mut tree, &collapsed(&["P"]), "M", EditCommand::MergeBackward).unwrap();

        assert_eq!(tree.children_of("P"), &["X", "Y", "Z"]);
        assert_eq!(result.expanded, vec!["P".to_string()]);
    }

    #[test]
    fn test_merge_transfer_into_expanded_parent_appends() {
        let mut tree = Tree::new();
        tree.insert_root(text("P", "p")).unwrap();
        tree.insert_child("P", text("Z", "z")).unwrap();
        tree.insert_root(text("M", "m")).unwrap();
        tree.insert_child("M", text("X", "x")).unwrap();
        tree.insert_child("M", text("Y", "y")).unwrap();

        // P expanded: previous visible node of M is Z; M is a root, so its
        // children land on Z's root ancestor P, appended after Z.
        let result = run(&mut tree, &no_collapse(), "M", EditCommand::MergeBackward).unwrap();

        assert_eq!(tree.children_of("P"), &["Z", "X", "Y"]);
        assert!(result.expanded.is_empty());
    }

    #[test]
    fn test_merge_backward_skips_collapsed_subtree_candidates() {
        let mut tree = Tree::new();
        tree.insert_root(text("R", "r")).unwrap();
        tree.insert_child("R", text("hidden", "h")).unwrap();
        tree.insert_root(text("N", "n")).unwrap();

        let result = run(&mut tree, &collapsed(&["R"]), "N", EditCommand::MergeBackward).unwrap();

        // merged into R, not into the hidden child
        assert_eq!(tree.get("R").unwrap().content, "rn");
        assert_eq!(result.outcome.focus_id, "R");
    }

    #[test]
    fn test_merge_backward_task_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "text")).unwrap();
        tree.insert_root(NodeFactory::create_with_id(
            "t1".to_string(),
            NodeType::Task,
            "task",
        ))
        .unwrap();

        assert!(run(&mut tree, &no_collapse(), "t1", EditCommand::MergeBackward).is_none());
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn test_merge_backward_chat_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "text")).unwrap();
        tree.insert_root(NodeFactory::create_with_id(
            "c1".to_string(),
            NodeType::Chat,
            "why?",
        ))
        .unwrap();

        assert!(run(&mut tree, &no_collapse(), "c1", EditCommand::MergeBackward).is_none());
    }

    // ------------------------------------------------------------------
    // Merge forward
    // ------------------------------------------------------------------

    #[test]
    fn test_merge_forward_absorbs_next_visible() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "Hello")).unwrap();
        tree.insert_root(text("n2", " World")).unwrap();

        let result = run(&mut tree, &no_collapse(), "n1", EditCommand::MergeForward).unwrap();

        assert_eq!(tree.roots(), &["n1"]);
        assert_eq!(tree.get("n1").unwrap().content, "Hello World");
        assert_eq!(result.outcome.focus_id, "n1");
        assert_eq!(result.outcome.cursor_offset, 5);
        assert_eq!(result.deleted.unwrap().0.id, "n2");
    }

    #[test]
    fn test_merge_forward_last_visible_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "alone")).unwrap();
        assert!(run(&mut tree, &no_collapse(), "n1", EditCommand::MergeForward).is_none());
    }

    #[test]
    fn test_merge_forward_declines_when_next_refuses_absorption() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "text")).unwrap();
        tree.insert_root(NodeFactory::create_with_id(
            "t1".to_string(),
            NodeType::Task,
            "task",
        ))
        .unwrap();

        // current node is plain text; it is the task's refusal that counts
        assert!(run(&mut tree, &no_collapse(), "n1", EditCommand::MergeForward).is_none());
        assert_eq!(tree.roots().len(), 2);
    }

    #[test]
    fn test_merge_forward_child_into_parent() {
        let mut tree = Tree::new();
        tree.insert_root(text("P", "par")).unwrap();
        tree.insert_child("P", text("C", "ent")).unwrap();
        tree.insert_child("C", text("G", "grand")).unwrap();

        run(&mut tree, &no_collapse(), "P", EditCommand::MergeForward).unwrap();

        assert_eq!(tree.get("P").unwrap().content, "parent");
        // C was not a root: its child lands directly on P
        assert_eq!(tree.children_of("P"), &["G"]);
    }

    #[test]
    fn test_merge_forward_skips_collapsed_descendants() {
        let mut tree = Tree::new();
        tree.insert_root(text("A", "a")).unwrap();
        tree.insert_child("A", text("hidden", "h")).unwrap();
        tree.insert_root(text("B", "b")).unwrap();

        run(&mut tree, &collapsed(&["A"]), "A", EditCommand::MergeForward).unwrap();

        // next visible after collapsed A is B, not A's hidden child
        assert_eq!(tree.get("A").unwrap().content, "ab");
        assert!(tree.get("B").is_none());
        assert_eq!(tree.children_of("A"), &["hidden"]);
    }

    // ------------------------------------------------------------------
    // Indent / outdent
    // ------------------------------------------------------------------

    #[test]
    fn test_indent_first_root_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "first")).unwrap();
        assert!(run(&mut tree, &no_collapse(), "n1", EditCommand::Indent { offset: 0 }).is_none());
    }

    #[test]
    fn test_indent_first_child_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("P", "p")).unwrap();
        tree.insert_child("P", text("c1", "one")).unwrap();
        assert!(run(&mut tree, &no_collapse(), "c1", EditCommand::Indent { offset: 0 }).is_none());
    }

    #[test]
    fn test_indent_appends_under_previous_sibling() {
        let mut tree = Tree::new();
        tree.insert_root(text("A", "a")).unwrap();
        tree.insert_root(text("B", "b")).unwrap();
        tree.insert_child("A", text("A1", "a1")).unwrap();

        let result = run(&mut tree, &no_collapse(), "B", EditCommand::Indent { offset: 1 }).unwrap();

        assert_eq!(tree.roots(), &["A"]);
        assert_eq!(tree.children_of("A"), &["A1", "B"]);
        assert_eq!(result.outcome.focus_id, "B");
        assert_eq!(result.outcome.cursor_offset, 1);
        assert_eq!(result.moved.as_deref(), Some("B"));
    }

    #[test]
    fn test_indent_carries_subtree() {
        let mut tree = Tree::new();
        tree.insert_root(text("A", "a")).unwrap();
        tree.insert_root(text("B", "b")).unwrap();
        tree.insert_child("B", text("B1", "b1")).unwrap();

        run(&mut tree, &no_collapse(), "B", EditCommand::Indent { offset: 0 }).unwrap();

        assert_eq!(tree.children_of("A"), &["B"]);
        assert_eq!(tree.children_of("B"), &["B1"]);
    }

    #[test]
    fn test_outdent_root_declines() {
        let mut tree = Tree::new();
        tree.insert_root(text("n1", "root")).unwrap();
        assert!(run(&mut tree, &no_collapse(), "n1", EditCommand::Outdent { offset: 0 }).is_none());
    }

    #[test]
    fn test_outdent_reinserts_after_former_parent() {
        let mut tree = Tree::new();
        tree.insert_root(text("P", "p")).unwrap();
        tree.insert_root(text("Q", "q")).unwrap();
        tree.insert_child("P", text("C", "c")).unwrap();

        run(&mut tree, &no_collapse(), "C", EditCommand::Outdent { offset: 0 }).unwrap();

        assert_eq!(tree.roots(), &["P", "C", "Q"]);
        assert!(tree.get("C").unwrap().is_root());
    }

    #[test]
    fn test_outdent_to_grandparent_level() {
        let mut tree = Tree::new();
        tree.insert_root(text("G", "g")).unwrap();
        tree.insert_child("G", text("P", "p")).unwrap();
        tree.insert_child("G", text("S", "s")).unwrap();
        tree.insert_child("P", text("C", "c")).unwrap();

        run(&mut tree, &no_collapse(), "C", EditCommand::Outdent { offset: 0 }).unwrap();

        assert_eq!(tree.children_of("G"), &["P", "C", "S"]);
        assert_eq!(tree.parent_of("C"), Some("G"));
    }

    #[test]
    fn test_outdent_middle_node_adopts_following_siblings() {
        let mut tree = Tree::new();
        tree.insert_root(text("P", "p")).unwrap();
        tree.insert_child("P", text("A", "a")).unwrap();
        tree.insert_child("P", text("B", "b")).unwrap();
        tree.insert_child("P", text("C", "c")).unwrap();
        tree.insert_child("P", text("D", "d")).unwrap();
        tree.insert_child("B", text("B1", "b1")).unwrap();

        run(&mut tree, &no_collapse(), "B", EditCommand::Outdent { offset: 0 }).unwrap();

        // B steps out next to P; C and D follow it as leading children,
        // ahead of B's own child B1
        assert_eq!(tree.roots(), &["P", "B"]);
        assert_eq!(tree.children_of("P"), &["A"]);
        assert_eq!(tree.children_of("B"), &["C", "D", "B1"]);
    }
}
