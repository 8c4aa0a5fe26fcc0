//! Level 3: Edge Creation
//!
//! Drag-to-connect gestures through the editor: snapping, direction,
//! validation rules, cancellation and rendered edge paths.

mod common;

use common::{canvas, editor};
use node_editor_core::{
    DefaultEdgeValidator, Edge, EdgeDirection, EdgeValidator, EditorConfig, GraphEditor, GraphStore,
    NearestTarget, NewEdgeStart, Platform, Point, PositionPatch, Rect, SnapPolicy, ValidationContext,
    ValidationError, ValidationResult,
};
use std::cell::RefCell;
use std::rc::Rc;

fn outbound(node_id: &str, index: usize, x: f32, y: f32) -> NewEdgeStart {
    NewEdgeStart::new(node_id, index, EdgeDirection::Outbound, Point::new(x, y))
}

fn edge_count(editor: &GraphEditor) -> usize {
    editor.store().borrow().edges().len()
}

fn history_len(editor: &GraphEditor) -> usize {
    editor.store().borrow().histories().len()
}

// ============================================================================
// Snapping
// ============================================================================

#[test]
fn test_outbound_drag_snaps_to_nearest_input() {
    let editor = editor();
    assert!(editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas()));

    editor.edge_update(Point::new(305.0, 42.0));
    assert_eq!(
        editor.nearest_target(),
        Some(NearestTarget {
            node_id: "b".into(),
            index: 1,
            direction: EdgeDirection::Outbound,
        })
    );

    assert!(editor.edge_end());
    assert_eq!(
        editor.store().borrow().edges().last(),
        Some(&Edge::between("a", 0, "b", 1))
    );
}

#[test]
fn test_inbound_drag_snaps_to_nearest_output() {
    let editor = editor();
    editor.edge_start(
        NewEdgeStart::new("b", 1, EdgeDirection::Inbound, Point::new(300.0, 40.0)),
        canvas(),
    );
    editor.edge_update(Point::new(125.0, 222.0));

    assert!(editor.is_connectable());
    assert!(editor.edge_end());
    assert_eq!(
        editor.store().borrow().edges().last(),
        Some(&Edge::between("c", 0, "b", 1))
    );
}

#[test]
fn test_pointer_relative_to_canvas() {
    let editor = editor();
    let offset = Rect::new(50.0, 30.0, 1200.0, 800.0);
    editor.edge_start(outbound("a", 0, 170.0, 50.0), offset);

    // Client (355, 72) is canvas (305, 42): input 1 of b
    editor.edge_update(Point::new(355.0, 72.0));
    assert_eq!(editor.nearest_target().unwrap().index, 1);
}

#[test]
fn test_snap_threshold() {
    let editor = GraphEditor::new(EditorConfig {
        snap: SnapPolicy::within(10.0),
        platform: Some(Platform::Other),
        ..Default::default()
    });
    editor.store().borrow_mut().load_data(common::sample_graph());
    let history = history_len(&editor);

    editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas());
    editor.edge_update(Point::new(250.0, 40.0));
    assert_eq!(editor.nearest_target(), None);
    assert!(!editor.edge_end());

    assert_eq!(edge_count(&editor), 1);
    assert_eq!(history_len(&editor), history);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_duplicate_edge_rejected() {
    let editor = editor();
    editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas());
    editor.edge_update(Point::new(305.0, 18.0));

    assert!(!editor.is_connectable());
    assert!(!editor.edge_end());
    assert_eq!(edge_count(&editor), 1);
}

#[test]
fn test_occupied_input_rejected() {
    let editor = editor();
    editor.edge_start(outbound("c", 0, 120.0, 220.0), canvas());
    editor.edge_update(Point::new(305.0, 18.0));

    assert!(!editor.edge_end());
    assert_eq!(edge_count(&editor), 1);
}

#[test]
fn test_self_loop_rejected() {
    let editor = editor();
    editor.edge_start(outbound("b", 0, 420.0, 20.0), canvas());
    editor.edge_update(Point::new(305.0, 25.0));

    assert_eq!(editor.nearest_target().unwrap().node_id, "b");
    assert!(!editor.edge_end());
    assert_eq!(edge_count(&editor), 1);
}

#[test]
fn test_multi_input_policy_allows_occupied_input() {
    let editor = editor();
    editor.set_edge_validator(DefaultEdgeValidator::with_multi_input(|_, existing| existing.len() < 2));

    for _ in 0..2 {
        editor.edge_start(outbound("c", 0, 120.0, 220.0), canvas());
        editor.edge_update(Point::new(305.0, 18.0));
        editor.edge_end();
    }

    // The second attempt from c is a duplicate of the first
    assert_eq!(edge_count(&editor), 2);
}

struct Locked {
    seen: Rc<RefCell<Vec<Edge>>>,
}

impl EdgeValidator for Locked {
    fn validate(&self, edge: &Edge, _ctx: &ValidationContext<'_>) -> ValidationResult {
        self.seen.borrow_mut().push(edge.clone());
        ValidationResult::Invalid(ValidationError::Custom("locked".into()))
    }
}

#[test]
fn test_custom_validator_sees_candidate() {
    let editor = editor();
    let seen: Rc<RefCell<Vec<Edge>>> = Rc::default();
    editor.set_edge_validator(Locked { seen: seen.clone() });

    editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas());
    editor.edge_update(Point::new(305.0, 42.0));
    assert!(!editor.edge_end());

    assert_eq!(seen.borrow().last(), Some(&Edge::between("a", 0, "b", 1)));
}

// ============================================================================
// Cancellation and stale anchors
// ============================================================================

#[test]
fn test_cancel_leaves_store_untouched() {
    let editor = editor();
    let version = editor.store().borrow().version();

    editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas());
    editor.edge_update(Point::new(305.0, 42.0));
    editor.edge_cancel();

    assert!(!editor.edge_end());
    assert_eq!(editor.store().borrow().version(), version);
    assert!(editor.draft_path().is_none());
}

#[test]
fn test_anchor_deleted_mid_gesture() {
    let editor = editor();
    editor.edge_start(outbound("c", 0, 120.0, 220.0), canvas());
    editor.store().borrow_mut().delete_node(2).unwrap();
    let history = history_len(&editor);

    editor.edge_update(Point::new(305.0, 42.0));
    assert!(editor.draft_path().is_none());
    assert!(!editor.edge_end());

    assert_eq!(history_len(&editor), history);
    assert!(!editor.interaction_flags().edge_creating);
}

#[test]
fn test_start_on_unknown_node() {
    let editor = editor();
    assert!(!editor.edge_start(outbound("ghost", 0, 0.0, 0.0), canvas()));
    assert!(!editor.edge_update(Point::new(1.0, 1.0)));
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_paths_follow_edges() {
    let editor = editor();
    assert_eq!(editor.paths().len(), 1);
    let before = editor.paths().paths()[0].commands.clone();

    editor
        .store()
        .borrow_mut()
        .update_node_position(1, PositionPatch::moved_to(400.0, 100.0))
        .unwrap();
    assert_ne!(editor.paths().paths()[0].commands, before);

    editor.edge_start(outbound("a", 0, 120.0, 20.0), canvas());
    editor.edge_update(Point::new(405.0, 142.0));
    editor.edge_end();
    assert_eq!(editor.paths().len(), 2);
}

#[test]
fn test_editor_over_shared_store() {
    let store = Rc::new(RefCell::new(GraphStore::new()));
    store.borrow_mut().load_data(common::sample_graph());

    let editor = GraphEditor::with_store(store.clone(), EditorConfig::default());
    assert_eq!(editor.paths().len(), 1);

    store.borrow_mut().delete_edge(0).unwrap();
    assert!(editor.paths().is_empty());
}
