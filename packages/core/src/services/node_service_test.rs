//! Tests for the CRUD and command orchestration layer

#[cfg(test)]
mod tests {
    use crate::editing::EditCommand;
    use crate::models::NodeType;
    use crate::services::error::NodeServiceError;
    use crate::services::events::DomainEvent;
    use crate::services::node_service::{CreateNodeParams, NodeService, UpdateNodeParams};
    use crate::services::view_state::{ViewStateConfig, ViewStateService};
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::broadcast;

    fn service() -> NodeService {
        let config = ViewStateConfig {
            load_on_start: false,
            ..ViewStateConfig::default()
        };
        NodeService::new(Arc::new(ViewStateService::new(None, config)))
    }

    fn drain(rx: &mut broadcast::Receiver<DomainEvent>) -> Vec<DomainEvent> {
        let mut out = Vec::new();
        while let Ok(event) = rx.try_recv() {
            out.push(event);
        }
        out
    }

    fn params(content: &str, parent: Option<&str>, after: Option<&str>) -> CreateNodeParams {
        CreateNodeParams {
            node_type: NodeType::Text,
            content: content.to_string(),
            parent_id: parent.map(str::to_string),
            insert_after_id: after.map(str::to_string),
            properties: None,
        }
    }

    #[tokio::test]
    async fn test_create_positions_roots_and_children() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let b = service.create(params("b", None, None)).unwrap();
        let between = service
            .create(params("between", None, Some(&a.id)))
            .unwrap();
        assert_eq!(
            service.roots(),
            vec![a.id.clone(), between.id, b.id.clone()]
        );

        let c1 = service.create(params("c1", Some(&a.id), None)).unwrap();
        let c0 = service
            .create(params("c0", Some(&a.id), None))
            .unwrap();
        let children: Vec<String> =
            service.get_children(&a.id).into_iter().map(|n| n.id).collect();
        assert_eq!(children, vec![c1.id.clone(), c0.id]);

        // insert after a specific child
        let mid = service
            .create(params("mid", Some(&a.id), Some(&c1.id)))
            .unwrap();
        let children: Vec<String> =
            service.get_children(&a.id).into_iter().map(|n| n.id).collect();
        assert_eq!(children[1], mid.id);
    }

    #[tokio::test]
    async fn test_create_event_gating_on_content() {
        let service = service();
        let mut rx = service.subscribe_to_events();

        service.create(params("real content", None, None)).unwrap();
        let events = drain(&mut rx);
        assert_eq!(events[0].event_type(), "node:created");
        assert_eq!(events[1].event_type(), "nodes:changed");

        // whitespace-only content stays local: no created event, shape
        // change still announced
        service.create(params("   ", None, None)).unwrap();
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "nodes:changed");
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_properties() {
        let service = service();
        let mut bad = params("x", None, None);
        bad.properties = Some(json!("not an object"));
        assert!(matches!(
            service.create(bad),
            Err(NodeServiceError::InvalidUpdate(_))
        ));
        assert!(service.roots().is_empty());
    }

    #[tokio::test]
    async fn test_create_unknown_parent_rejected() {
        let service = service();
        assert!(matches!(
            service.create(params("x", Some("ghost"), None)),
            Err(NodeServiceError::NodeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_with_stale_sibling_anchor_appends() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        // anchor from a node deleted by a concurrent edit: degrade to append
        let b = service
            .create(params("b", None, Some("deleted-long-ago")))
            .unwrap();
        assert_eq!(service.visible_ids(), vec![a.id.clone(), b.id.clone()]);

        // an anchor living in a different sibling list is just as stale
        let child = service.create(params("c", Some(&a.id), None)).unwrap();
        let d = service.create(params("d", None, Some(&child.id))).unwrap();
        assert_eq!(service.visible_ids(), vec![a.id, child.id, b.id, d.id]);
    }

    #[tokio::test]
    async fn test_update_content_and_rejection_leaves_node_untouched() {
        let service = service();
        let mut rx = service.subscribe_to_events();
        let task = service
            .create(CreateNodeParams {
                node_type: NodeType::Task,
                content: "Buy milk".to_string(),
                parent_id: None,
                insert_after_id: None,
                properties: None,
            })
            .unwrap();
        drain(&mut rx);

        let updated = service
            .update(&task.id, UpdateNodeParams::content("Buy oat milk"))
            .unwrap();
        assert_eq!(updated.content, "Buy oat milk");
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "node:updated");

        // invalid task status fails validation and changes nothing
        let result = service.update(
            &task.id,
            UpdateNodeParams {
                content: Some("should not land".to_string()),
                properties: Some(json!({"task": {"status": "bogus"}})),
                ..UpdateNodeParams::default()
            },
        );
        assert!(matches!(result, Err(NodeServiceError::ValidationFailed(_))));
        assert_eq!(
            service.get_node(&task.id).unwrap().content,
            "Buy oat milk"
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_update_requires_some_field() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        assert!(matches!(
            service.update(&a.id, UpdateNodeParams::default()),
            Err(NodeServiceError::InvalidUpdate(_))
        ));
    }

    #[tokio::test]
    async fn test_update_tags_and_metadata() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let updated = service
            .update(
                &a.id,
                UpdateNodeParams {
                    tags: Some(vec!["urgent".to_string()]),
                    metadata: Some(json!({"pinned": true})),
                    ..UpdateNodeParams::default()
                },
            )
            .unwrap();
        assert_eq!(updated.tags, vec!["urgent".to_string()]);
        assert_eq!(updated.metadata["pinned"], true);
        assert_eq!(updated.content, "a");
    }

    #[tokio::test]
    async fn test_delete_subtree_and_promote() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let c1 = service.create(params("c1", Some(&a.id), None)).unwrap();
        service.create(params("g1", Some(&c1.id), None)).unwrap();
        let mut rx = service.subscribe_to_events();

        service.delete(&c1.id, true).unwrap();
        let children: Vec<String> =
            service.get_children(&a.id).into_iter().map(|n| n.id).collect();
        assert_eq!(children.len(), 1); // g1 promoted under a
        let events = drain(&mut rx);
        match &events[0] {
            DomainEvent::NodeDeleted { id, context } => {
                assert_eq!(id, &c1.id);
                assert!(context.is_none());
            }
            other => panic!("expected NodeDeleted, got {other:?}"),
        }

        service.delete(&a.id, false).unwrap();
        assert!(service.roots().is_empty());
        assert!(service.get_node(&a.id).is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_node() {
        let service = service();
        assert!(matches!(
            service.delete("ghost", false),
            Err(NodeServiceError::NodeNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_move_node_guards_and_positions() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let b = service.create(params("b", None, None)).unwrap();
        let c = service.create(params("c", Some(&a.id), None)).unwrap();

        // under itself or under a descendant is refused
        assert!(matches!(
            service.move_node(&a.id, Some(&a.id), None),
            Err(NodeServiceError::HierarchyViolation(_))
        ));
        assert!(matches!(
            service.move_node(&a.id, Some(&c.id), None),
            Err(NodeServiceError::HierarchyViolation(_))
        ));

        // move b under a, after c
        service.move_node(&b.id, Some(&a.id), Some(&c.id)).unwrap();
        let children: Vec<String> =
            service.get_children(&a.id).into_iter().map(|n| n.id).collect();
        assert_eq!(children, vec![c.id.clone(), b.id.clone()]);
        assert_eq!(service.roots(), vec![a.id.clone()]);

        // back to root level, front of the list
        service.move_node(&b.id, None, None).unwrap();
        assert_eq!(service.roots(), vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_reorder_front_and_after() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let b = service.create(params("b", None, None)).unwrap();
        let c = service.create(params("c", None, None)).unwrap();

        service.reorder(&c.id, None).unwrap();
        assert_eq!(
            service.roots(),
            vec![c.id.clone(), a.id.clone(), b.id.clone()]
        );

        service.reorder(&c.id, Some(&b.id)).unwrap();
        assert_eq!(service.roots(), vec![a.id, b.id, c.id.clone()]);

        assert!(matches!(
            service.reorder(&c.id, Some(&c.id)),
            Err(NodeServiceError::InvalidUpdate(_))
        ));
    }

    #[tokio::test]
    async fn test_split_command_emits_created_and_changed() {
        let service = service();
        let a = service.create(params("Hello World", None, None)).unwrap();
        let mut rx = service.subscribe_to_events();

        let outcome = service
            .execute_command(&a.id, EditCommand::Split { offset: 5 })
            .unwrap()
            .unwrap();
        assert_eq!(outcome.cursor_offset, 0);
        assert_ne!(outcome.focus_id, a.id);
        assert_eq!(service.get_node(&a.id).unwrap().content, "Hello");

        let events = drain(&mut rx);
        match &events[0] {
            DomainEvent::NodeCreated {
                node,
                after_sibling_id,
                ..
            } => {
                assert_eq!(node.content, " World");
                assert_eq!(after_sibling_id.as_deref(), Some(a.id.as_str()));
            }
            other => panic!("expected NodeCreated, got {other:?}"),
        }
        assert_eq!(events[1].event_type(), "nodes:changed");
    }

    #[tokio::test]
    async fn test_split_at_zero_skips_created_event() {
        let service = service();
        let a = service.create(params("Hello", None, None)).unwrap();
        let mut rx = service.subscribe_to_events();

        let outcome = service
            .execute_command(&a.id, EditCommand::Split { offset: 0 })
            .unwrap()
            .unwrap();
        // focus moves to the new empty node above
        assert_ne!(outcome.focus_id, a.id);
        assert_eq!(service.roots().len(), 2);

        // the empty node never reaches durable storage
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "nodes:changed");
    }

    #[tokio::test]
    async fn test_merge_command_emits_deletion_with_context() {
        let service = service();
        let a = service.create(params("alpha", None, None)).unwrap();
        let b = service.create(params("beta", None, None)).unwrap();
        let b1 = service.create(params("b1", Some(&b.id), None)).unwrap();
        let mut rx = service.subscribe_to_events();

        let outcome = service
            .execute_command(&b.id, EditCommand::MergeBackward)
            .unwrap()
            .unwrap();
        assert_eq!(outcome.focus_id, a.id);
        assert_eq!(outcome.cursor_offset, 5);
        assert_eq!(service.get_node(&a.id).unwrap().content, "alphabeta");
        assert!(service.get_node(&b.id).is_none());

        let events = drain(&mut rx);
        match &events[0] {
            DomainEvent::NodeDeleted { id, context } => {
                assert_eq!(id, &b.id);
                let context = context.as_ref().unwrap();
                assert_eq!(context.children, vec![b1.id.clone()]);
                assert_eq!(context.absorbed_by.as_deref(), Some(a.id.as_str()));
            }
            other => panic!("expected NodeDeleted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_declined_command_is_silent() {
        let service = service();
        let a = service.create(params("only", None, None)).unwrap();
        let mut rx = service.subscribe_to_events();

        // first sibling cannot indent
        let outcome = service
            .execute_command(&a.id, EditCommand::Indent { offset: 2 })
            .unwrap();
        assert!(outcome.is_none());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_indent_emits_moved_event() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let b = service.create(params("b", None, None)).unwrap();
        let mut rx = service.subscribe_to_events();

        service
            .execute_command(&b.id, EditCommand::Indent { offset: 1 })
            .unwrap()
            .unwrap();
        let events = drain(&mut rx);
        match &events[0] {
            DomainEvent::NodeMoved {
                id, new_parent_id, ..
            } => {
                assert_eq!(id, &b.id);
                assert_eq!(new_parent_id.as_deref(), Some(a.id.as_str()));
            }
            other => panic!("expected NodeMoved, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_merge_into_collapsed_receiver_auto_expands() {
        let service = service();
        let a = service.create(params("a", None, None)).unwrap();
        let _a1 = service.create(params("a1", Some(&a.id), None)).unwrap();
        let b = service.create(params("b", None, None)).unwrap();
        let b1 = service.create(params("b1", Some(&b.id), None)).unwrap();
        service.view_state().toggle(&a.id);
        assert!(service.view_state().is_collapsed(&a.id));
        // collapsed a hides a1 from the rendered sequence
        assert_eq!(
            service.visible_ids(),
            vec![a.id.clone(), b.id.clone(), b1.id]
        );

        // a is the previous visible node of b (a1 is hidden); b's children
        // land under the collapsed receiver, which auto-expands
        service
            .execute_command(&b.id, EditCommand::MergeBackward)
            .unwrap()
            .unwrap();
        assert!(!service.view_state().is_collapsed(&a.id));
    }

    #[tokio::test]
    async fn test_unknown_node_command_errors() {
        let service = service();
        assert!(matches!(
            service.execute_command("ghost", EditCommand::MergeBackward),
            Err(NodeServiceError::NodeNotFound { .. })
        ));
    }
}
