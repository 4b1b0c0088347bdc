//! Tests for SubtreeRenderer: view model, HTML fragments, nested arrays, text trees.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde_json::json;

use marktree::application::services::{
    HtmlListTemplate, MarkingOptions, PartialTreeBuilder, RenderContext, TreeArrayNode,
};
use marktree::domain::{FieldValue, Node, NodeId, TreeState};
use marktree::infrastructure::traits::{ChildrenMethod, HierarchyStore};
use marktree::infrastructure::InMemoryHierarchy;
use marktree::util::testing::{init_test_setup, numbered_children, store_from};

fn marked_builder(store: &Arc<InMemoryHierarchy>, threshold: usize) -> PartialTreeBuilder {
    let options = MarkingOptions {
        node_count_threshold: threshold,
        ..MarkingOptions::default()
    };
    let mut builder =
        PartialTreeBuilder::new(store.clone(), Node::virtual_root(), options).expect("builder");
    builder.mark_partial_tree();
    builder
}

/// R has [A, B, C]; A has [D, E]; B has 300 children.
fn scenario_store() -> Arc<InMemoryHierarchy> {
    let mut nodes = vec![
        Node::new(1, 0, "A").with_sort(1),
        Node::new(2, 0, "B").with_sort(2),
        Node::new(3, 0, "C").with_sort(3),
        Node::new(4, 1, "D").with_sort(1),
        Node::new(5, 1, "E").with_sort(2),
    ];
    nodes.extend(numbered_children(2, 100, 300, "B child"));
    Arc::new(InMemoryHierarchy::from_nodes(nodes).expect("store"))
}

/// Three levels, three children each.
fn wide_store() -> Arc<InMemoryHierarchy> {
    let mut triples = Vec::new();
    let mut id: NodeId = 1;
    let mut parents: Vec<NodeId> = vec![0];
    for _ in 0..3 {
        let mut next_parents = Vec::new();
        for parent in &parents {
            for _ in 0..3 {
                triples.push((id, *parent, "page"));
                next_parents.push(id);
                id += 1;
            }
        }
        parents = next_parents;
    }
    store_from(&triples)
}

fn node_id(item: &TreeArrayNode) -> NodeId {
    match item.node.get("id") {
        Some(FieldValue::Int(id)) => *id as NodeId,
        other => panic!("id missing from serialized node: {other:?}"),
    }
}

fn collect_ids(item: &TreeArrayNode, ids: &mut Vec<NodeId>) {
    ids.push(node_id(item));
    for child in &item.children {
        collect_ids(child, ids);
    }
}

// ============================================================
// get_subtree
// ============================================================

#[test]
fn given_scenario_when_get_subtree_then_limited_node_reports_zero_count() {
    init_test_setup();
    // Arrange
    let store = scenario_store();
    let builder = marked_builder(&store, 50);

    // Act
    let tree = builder.renderer().subtree();

    // Assert
    assert_eq!(tree.size(), 6);
    let b = &tree.children[1];
    assert_eq!(b.node.id, 2);
    assert!(b.limited);
    assert_eq!(b.count, 0);
    assert!(b.children.is_empty());
    assert_eq!(b.state(), TreeState::Unexpanded);

    let a = &tree.children[0];
    assert_eq!(a.count, 2);
    assert_eq!(a.state(), TreeState::ExpandedClosed);
    assert_eq!(a.children[1].depth, 2);
    assert_eq!(a.children[1].state(), TreeState::Leaf);
}

#[test]
fn given_unexpanded_node_when_get_subtree_then_recursion_stops_there() {
    // Arrange
    let store = wide_store();
    let builder = marked_builder(&store, 5);
    let first = store.get(1).expect("node 1");

    // Act
    let view = builder.renderer().get_subtree(&first, 1);

    // Assert
    assert!(view.expanded);
    assert_eq!(view.children.len(), 3);
    assert!(view.children.iter().all(|c| !c.expanded && c.children.is_empty()));
    assert!(view.children.iter().all(|c| c.state() == TreeState::Unexpanded));
}

// ============================================================
// Structure correspondence and idempotence
// ============================================================

#[test]
fn given_partially_marked_tree_when_children_as_array_then_exactly_marked_nodes_appear() {
    // Arrange
    let store = wide_store();
    let mut builder = marked_builder(&store, 8);
    builder.mark_by_id(5, true);
    let deep = store.get(39).expect("node 39");
    builder.mark_to_expose(&deep);

    // Act
    let tree = builder.renderer().children_as_array(None);

    // Assert: every marked node appears once, nothing else does
    let mut ids = Vec::new();
    collect_ids(&tree, &mut ids);
    let rendered: BTreeSet<NodeId> = ids.iter().copied().collect();
    let marked: BTreeSet<NodeId> = builder.marked_node_ids().into_iter().collect();
    assert_eq!(ids.len(), rendered.len(), "no node rendered twice");
    assert_eq!(rendered, marked);
}

#[test]
fn given_rendered_tree_when_checking_each_level_then_children_are_the_marked_store_children() {
    // Arrange
    let store = wide_store();
    let mut builder = marked_builder(&store, 8);
    builder.mark_by_id(5, false);
    let tree = builder.renderer().children_as_array(None);

    // Act / Assert
    let mut stack = vec![&tree];
    while let Some(item) = stack.pop() {
        let id = node_id(item);
        let node = if id == 0 {
            Node::virtual_root()
        } else {
            store.get(id).expect("rendered node exists")
        };
        if !item.expanded || item.limited {
            assert!(item.children.is_empty());
            continue;
        }
        let expected: Vec<NodeId> = store
            .children(&node, ChildrenMethod::default())
            .into_iter()
            .filter(|c| builder.is_marked(c))
            .map(|c| c.id)
            .collect();
        let actual: Vec<NodeId> = item.children.iter().map(node_id).collect();
        assert_eq!(actual, expected, "children of {id}");
        stack.extend(item.children.iter());
    }
}

#[test]
fn given_unchanged_marks_when_rendering_twice_then_output_is_identical() {
    // Arrange
    let store = scenario_store();
    let builder = marked_builder(&store, 50);
    let renderer = builder.renderer();

    // Act
    let first_html = renderer.render_children(&HtmlListTemplate, &RenderContext::None);
    let second_html = renderer.render_children(&HtmlListTemplate, &RenderContext::None);
    let first_array = renderer.children_as_array(None);
    let second_array = renderer.children_as_array(None);

    // Assert
    assert_eq!(first_html, second_html);
    assert_eq!(first_array, second_array);
}

// ============================================================
// Deep hierarchies
// ============================================================

const CHAIN_DEPTH: NodeId = 10_000;

/// A single chain 1 > 2 > ... > CHAIN_DEPTH.
fn chain_store() -> Arc<InMemoryHierarchy> {
    let nodes: Vec<Node> = (1..=CHAIN_DEPTH)
        .map(|id| Node::new(id, id - 1, format!("level {id}")))
        .collect();
    Arc::new(InMemoryHierarchy::from_nodes(nodes).expect("store"))
}

#[test]
fn given_exposed_node_deep_in_chain_when_rendering_then_every_format_completes() {
    // Arrange
    let store = chain_store();
    let mut builder = marked_builder(&store, 50);
    let deepest = store.get(CHAIN_DEPTH).expect("deepest node");
    builder.mark_to_expose(&deepest);
    assert_eq!(builder.marked_node_ids().len(), CHAIN_DEPTH as usize + 1);
    let renderer = builder.renderer();

    // Act
    let view = renderer.subtree();
    let array = renderer.children_as_array(None);
    let html = renderer.render_children(&HtmlListTemplate, &RenderContext::None);
    let text = renderer.children_as_text();

    // Assert
    assert_eq!(view.size(), CHAIN_DEPTH as usize + 1);

    let mut item = &array;
    let mut depth = 0;
    while let Some(child) = item.children.first() {
        item = child;
        depth += 1;
    }
    assert_eq!(depth, CHAIN_DEPTH as usize);
    assert_eq!(node_id(item), CHAIN_DEPTH);

    assert_eq!(html.matches("<li ").count(), CHAIN_DEPTH as usize);
    assert!(html.contains(r#"data-id="10000" class="class-Page jstree-leaf closed""#));

    let mut leaf = text.tree();
    let mut levels = 0;
    while let Some(next) = leaf.leaves.first() {
        leaf = next;
        levels += 1;
    }
    assert_eq!(levels, CHAIN_DEPTH as usize);
    assert_eq!(leaf.root, "level 10000 (#10000)");
}

// ============================================================
// HTML
// ============================================================

#[test]
fn given_small_tree_when_render_children_then_emits_nested_lists() {
    // Arrange
    let store = store_from(&[(1, 0, "Home"), (2, 1, "About & Us")]);
    let builder = marked_builder(&store, 50);

    // Act
    let html = builder
        .renderer()
        .render_children(&HtmlListTemplate, &RenderContext::None);

    // Assert
    assert_eq!(
        html,
        concat!(
            r#"<ul><li id="selector-tree-1" data-id="1" class="class-Page jstree-closed closed">"#,
            r#"<a rel="1">Home</a>"#,
            r#"<ul><li id="selector-tree-2" data-id="2" class="class-Page jstree-leaf closed">"#,
            r#"<a rel="2">About &amp; Us</a></li></ul>"#,
            r#"</li></ul>"#,
        )
    );
}

#[test]
fn given_scenario_when_render_children_then_marking_classes_cover_all_states() {
    // Arrange
    let store = scenario_store();
    let mut builder = marked_builder(&store, 50);
    builder.mark_by_id(1, true);

    // Act
    let html = builder
        .renderer()
        .render_children(&HtmlListTemplate, &RenderContext::None);

    // Assert
    assert!(html.contains(r#"data-id="1" class="class-Page jstree-open""#));
    assert!(html.contains(r#"data-id="2" class="class-Page unexpanded jstree-closed closed""#));
    assert!(html.contains(r#"data-id="3" class="class-Page jstree-leaf closed""#));
    assert!(!html.contains(r#"data-id="100""#));
}

#[test]
fn given_render_context_when_render_children_then_fields_reach_the_template() {
    // Arrange
    let store = store_from(&[(1, 0, "Home"), (2, 0, "Contact")]);
    let builder = marked_builder(&store, 50);
    let context = RenderContext::PerNode(Box::new(|node: &Node| {
        BTreeMap::from([
            ("name".to_string(), "site".to_string()),
            ("extraClass".to_string(), format!("page-{}", node.id)),
        ])
    }));

    // Act
    let html = builder.renderer().render_children(&HtmlListTemplate, &context);

    // Assert
    assert!(html.contains(r#"id="selector-site-2""#));
    assert!(html.contains("jstree-leaf closed page-2"));
}

#[test]
fn given_renderer_when_marking_classes_then_matches_view_model() {
    // Arrange
    let store = scenario_store();
    let builder = marked_builder(&store, 50);
    let renderer = builder.renderer();
    let tree = renderer.subtree();

    // Act / Assert
    for view in &tree.children {
        assert_eq!(renderer.marking_classes(&view.node), view.marking_classes());
    }
}

// ============================================================
// Nested arrays and text
// ============================================================

#[test]
fn given_default_serializer_when_serialized_to_json_then_plain_structure() {
    // Arrange
    let store = store_from(&[(1, 0, "Home")]);
    let builder = marked_builder(&store, 50);

    // Act
    let value = serde_json::to_value(builder.renderer().children_as_array(None)).expect("json");

    // Assert
    assert_eq!(
        value,
        json!({
            "node": {"id": 0, "title": ""},
            "marked": true,
            "expanded": true,
            "opened": false,
            "depth": 0,
            "count": 1,
            "limited": false,
            "children": [{
                "node": {"id": 1, "title": "Home"},
                "marked": true,
                "expanded": true,
                "opened": false,
                "depth": 1,
                "count": 0,
                "limited": false,
                "children": []
            }]
        })
    );
}

#[test]
fn given_custom_serializer_when_children_as_array_then_field_values_are_plain_scalars() {
    // Arrange
    let store = Arc::new(
        InMemoryHierarchy::from_nodes(vec![Node::new(1, 0, "Home")
            .with_field("Status", "Published")
            .with_field("Tags", FieldValue::List(vec!["a".into(), "b".into()]))])
        .expect("store"),
    );
    let builder = marked_builder(&store, 50);
    let serializer = |node: &Node| {
        BTreeMap::from([
            ("status".to_string(), node.field("Status")),
            ("tags".to_string(), node.field("Tags")),
        ])
    };

    // Act
    let tree = builder.renderer().children_as_array(Some(&serializer));
    let value = serde_json::to_value(&tree.children[0].node).expect("json");

    // Assert
    assert_eq!(value, json!({"status": "Published", "tags": ["a", "b"]}));
}

#[test]
fn given_scenario_when_children_as_text_then_states_are_labelled() {
    // Arrange
    let store = scenario_store();
    let builder = marked_builder(&store, 50);

    // Act
    let text = builder.renderer().children_as_text().to_string();

    // Assert
    assert!(text.starts_with("Root [closed]"));
    assert!(text.contains("A (#1) [closed]"));
    assert!(text.contains("B (#2) [unexpanded] (limited)"));
    assert!(text.contains("C (#3)"));
    assert!(!text.contains("C (#3) ["));
    assert!(text.contains("D (#4)"));
}
