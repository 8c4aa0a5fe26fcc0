//! High-level editor facade.
//!
//! [`GraphEditor`] wires the [`GraphStore`] to the interaction state
//! machines: edge creation, canvas panning, node dragging and keyboard
//! shortcuts. The gestures are mutually exclusive; starting one while
//! another runs is a silent no-op.
//!
//! # Example
//!
//! ```ignore
//! use node_editor_core::{EditorConfig, GraphEditor};
//!
//! let editor = GraphEditor::new(EditorConfig::from_toml_str(&config_text)?);
//! editor.install_default_shortcuts()?;
//! editor.store().borrow_mut().load_json(saved_graph)?;
//!
//! window.on_key_pressed(editor.key_pressed_callback());
//! window.on_node_measured(editor.port_tracker().node_measured_callback());
//!
//! window.on_port_pressed({
//!     let editor = editor.clone();
//!     move |node_id, index, direction, x, y| {
//!         editor.edge_start(NewEdgeStart::new(node_id, index, direction, Point::new(x, y)), canvas_rect())
//!     }
//! });
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use slint::SharedString;

use crate::config::EditorConfig;
use crate::error::{EditorError, EditorResult};
use crate::geometry::find_edge_at;
use crate::links::EdgePathManager;
use crate::model::{Node, Point, PositionPatch};
use crate::new_edge::{NearestTarget, NewEdgeController, NewEdgeStart};
use crate::shortcuts::{KeyEvent, ShortcutId, ShortcutRegistry};
use crate::store::GraphStore;
use crate::tracking::{PortTracker, Rect};
use crate::validation::EdgeValidator;
use crate::viewport::{
    InteractionFlags, PanController, PanStart, PointerTarget, ScrollExtent, ScrollOffset, WheelOutcome,
};

#[derive(Debug, Clone)]
struct NodeDrag {
    node_id: String,
    pointer_origin: Point,
    node_origin: Point,
}

/// Per-node view for node renderers.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeContext {
    pub index: usize,
    pub node: Node,
    /// The current edge drag would snap to this port of the node.
    pub nearest_target: Option<NearestTarget>,
    /// Releasing the current edge drag would connect to this node.
    pub connectable: bool,
    /// Any edge drag is in progress.
    pub edge_creating: bool,
}

/// Editor state shared across UI callbacks.
///
/// Clone this to capture it in callbacks; every clone drives the same
/// store and gestures.
#[derive(Clone)]
pub struct GraphEditor {
    store: Rc<RefCell<GraphStore>>,
    new_edge: Rc<RefCell<NewEdgeController>>,
    pan: Rc<RefCell<PanController>>,
    drag: Rc<RefCell<Option<NodeDrag>>>,
    shortcuts: Rc<RefCell<ShortcutRegistry>>,
    paths: EdgePathManager,
    config: Rc<EditorConfig>,
}

impl Default for GraphEditor {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}

impl GraphEditor {
    pub fn new(config: EditorConfig) -> Self {
        Self::with_store(Rc::new(RefCell::new(GraphStore::new())), config)
    }

    /// Build an editor around an existing store. Edge paths are recomputed
    /// on every store change from here on.
    pub fn with_store(store: Rc<RefCell<GraphStore>>, config: EditorConfig) -> Self {
        let paths = EdgePathManager::new(config.curve);
        {
            let mut store = store.borrow_mut();
            paths.update_paths(&store.current());
            store.on_change(paths.listener());
        }

        Self {
            store,
            new_edge: Rc::new(RefCell::new(NewEdgeController::new(config.snap))),
            pan: Rc::new(RefCell::new(PanController::new())),
            drag: Rc::new(RefCell::new(None)),
            shortcuts: Rc::new(RefCell::new(ShortcutRegistry::new(config.platform()))),
            paths,
            config: Rc::new(config),
        }
    }

    pub fn store(&self) -> Rc<RefCell<GraphStore>> {
        self.store.clone()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn paths(&self) -> &EdgePathManager {
        &self.paths
    }

    /// Measurement tracker writing into this editor's store.
    pub fn port_tracker(&self) -> PortTracker {
        PortTracker::new(self.store.clone())
    }

    /// Gestures currently running that block others from starting.
    pub fn interaction_flags(&self) -> InteractionFlags {
        InteractionFlags {
            node_dragging: self.drag.borrow().is_some(),
            edge_creating: self.new_edge.borrow().is_active(),
        }
    }

    pub fn is_panning(&self) -> bool {
        self.pan.borrow().is_panning()
    }

    // ========================================================================
    // Edge creation
    // ========================================================================

    /// Replace the rule deciding which dragged edges may connect.
    pub fn set_edge_validator<V: EdgeValidator + 'static>(&self, validator: V) {
        self.new_edge.borrow_mut().set_validator(validator);
    }

    /// Begin dragging a new edge from a port. Ignored while a node drag or
    /// pan is running.
    pub fn edge_start(&self, start: NewEdgeStart, canvas: Rect) -> bool {
        if self.drag.borrow().is_some() || self.is_panning() {
            tracing::trace!("edge drag blocked by active gesture");
            return false;
        }
        let snapshot = self.store.borrow().current();
        self.new_edge.borrow_mut().start(&snapshot, start, canvas)
    }

    pub fn edge_update(&self, client: Point) -> bool {
        self.new_edge.borrow_mut().update(client)
    }

    /// Release the edge drag, connecting it when the snap target is valid.
    pub fn edge_end(&self) -> bool {
        let mut store = self.store.borrow_mut();
        self.new_edge.borrow_mut().end(&mut store)
    }

    pub fn edge_cancel(&self) {
        self.new_edge.borrow_mut().cancel();
    }

    pub fn nearest_target(&self) -> Option<NearestTarget> {
        let snapshot = self.store.borrow().current();
        self.new_edge.borrow().nearest_target(&snapshot)
    }

    pub fn is_connectable(&self) -> bool {
        let store = self.store.borrow();
        self.new_edge
            .borrow()
            .is_connectable(&store.current(), store.plugins())
    }

    /// SVG path of the edge being dragged.
    pub fn draft_path(&self) -> Option<SharedString> {
        let snapshot = self.store.borrow().current();
        self.new_edge
            .borrow()
            .draft_path(&snapshot, &self.config.curve)
            .map(|bezier| SharedString::from(bezier.to_svg()))
    }

    /// Index of the edge under `point` (canvas coordinates).
    pub fn edge_at(&self, point: Point) -> Option<usize> {
        let snapshot = self.store.borrow().current();
        find_edge_at(&snapshot, point, &self.config.hit_test, &self.config.curve)
    }

    // ========================================================================
    // Panning
    // ========================================================================

    pub fn pan_begin(
        &self,
        pointer: Point,
        target: PointerTarget,
        text_focused: bool,
        scroll: ScrollOffset,
    ) -> PanStart {
        let flags = self.interaction_flags();
        self.pan
            .borrow_mut()
            .begin(pointer, target, text_focused, scroll, flags)
    }

    pub fn pan_update(&self, pointer: Point) -> Option<ScrollOffset> {
        self.pan.borrow().update(pointer)
    }

    pub fn pan_end(&self) -> bool {
        self.pan.borrow_mut().end()
    }

    pub fn wheel(&self, delta: Point, over_text_area: bool, extent: &ScrollExtent) -> WheelOutcome {
        self.pan.borrow().wheel(delta, over_text_area, extent)
    }

    // ========================================================================
    // Node dragging
    // ========================================================================

    /// Begin dragging the node at `index`.
    ///
    /// Returns `Ok(false)` while an edge drag or pan is running.
    pub fn node_drag_start(&self, index: usize, pointer: Point) -> EditorResult<bool> {
        let flags = self.interaction_flags();
        if flags.edge_creating || self.is_panning() {
            tracing::trace!("node drag blocked by active gesture");
            return Ok(false);
        }

        let store = self.store.borrow();
        let node = store.nodes().get(index).ok_or(EditorError::NodeIndexOutOfRange {
            index,
            len: store.nodes().len(),
        })?;

        tracing::trace!(node_id = %node.node_id, "node drag start");
        *self.drag.borrow_mut() = Some(NodeDrag {
            node_id: node.node_id.clone(),
            pointer_origin: pointer,
            node_origin: Point::new(node.position.x, node.position.y),
        });
        Ok(true)
    }

    /// Move the dragged node by the pointer's offset from the drag start.
    /// Not recorded in history.
    pub fn node_drag_move(&self, pointer: Point) -> bool {
        let Some(drag) = self.drag.borrow().clone() else {
            return false;
        };

        let mut store = self.store.borrow_mut();
        let Some(index) = store.node_index(&drag.node_id) else {
            tracing::debug!(node_id = %drag.node_id, "dragged node vanished");
            *self.drag.borrow_mut() = None;
            return false;
        };

        let x = drag.node_origin.x + pointer.x - drag.pointer_origin.x;
        let y = drag.node_origin.y + pointer.y - drag.pointer_origin.y;
        match store.update_node_position(index, PositionPatch::moved_to(x, y)) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(node_id = %drag.node_id, %err, "node drag update failed");
                false
            }
        }
    }

    /// Finish the drag and checkpoint the final position in history.
    pub fn node_drag_end(&self) -> bool {
        let Some(drag) = self.drag.borrow_mut().take() else {
            return false;
        };

        let mut store = self.store.borrow_mut();
        if store.node_index(&drag.node_id).is_none() {
            return false;
        }
        store.save_node_position_data();
        true
    }

    // ========================================================================
    // Node contexts
    // ========================================================================

    /// View of the node at `index` for its renderer.
    ///
    /// Safe to call from store listeners and plugin hooks: while the store
    /// or the edge gesture is being mutated this returns
    /// [`EditorError::Reentrant`] instead of panicking.
    pub fn node_context(&self, index: usize) -> EditorResult<NodeContext> {
        let store = self
            .store
            .try_borrow()
            .map_err(|_| EditorError::Reentrant("store"))?;
        let snapshot = store.current();
        let node = snapshot
            .nodes
            .get(index)
            .cloned()
            .ok_or(EditorError::NodeContextUnavailable(index))?;

        let new_edge = self
            .new_edge
            .try_borrow()
            .map_err(|_| EditorError::Reentrant("edge gesture"))?;
        let nearest_target = new_edge
            .nearest_target(&snapshot)
            .filter(|target| target.node_id == node.node_id);
        let connectable = nearest_target.is_some() && new_edge.is_connectable(&snapshot, store.plugins());

        Ok(NodeContext {
            index,
            node,
            nearest_target,
            connectable,
            edge_creating: new_edge.is_active(),
        })
    }

    // ========================================================================
    // Shortcuts
    // ========================================================================

    pub fn add_shortcut<F>(&self, combo: &str, handler: F) -> EditorResult<ShortcutId>
    where
        F: Fn(&KeyEvent) -> anyhow::Result<()> + 'static,
    {
        self.shortcuts
            .try_borrow_mut()
            .map_err(|_| EditorError::Reentrant("shortcut registry"))?
            .add(combo, handler)
    }

    /// Unregister a shortcut. Handlers may remove themselves.
    pub fn remove_shortcut(&self, id: ShortcutId) -> EditorResult<()> {
        self.shortcuts
            .try_borrow_mut()
            .map_err(|_| EditorError::Reentrant("shortcut registry"))?
            .remove(id)
    }

    /// Bind `mod+z` to undo and `mod+shift+z` to redo.
    pub fn install_default_shortcuts(&self) -> EditorResult<()> {
        let store = self.store.clone();
        self.add_shortcut("mod+z", move |_| {
            store.try_borrow_mut()?.undo();
            Ok(())
        })?;

        let store = self.store.clone();
        self.add_shortcut("mod+shift+z", move |_| {
            store.try_borrow_mut()?.redo();
            Ok(())
        })?;
        Ok(())
    }

    /// Returns `true` when a shortcut consumed the event.
    pub fn dispatch_key(&self, event: &KeyEvent) -> bool {
        let matched = match self.shortcuts.try_borrow() {
            Ok(shortcuts) => shortcuts.handler_for(event),
            Err(_) => {
                tracing::warn!("key dispatched from inside a shortcut registry update, ignored");
                return false;
            }
        };
        match matched {
            Some(shortcut) => {
                shortcut.run(event);
                true
            }
            None => false,
        }
    }

    pub fn key_pressed_callback(&self) -> impl Fn(&KeyEvent) -> bool + Clone {
        let editor = self.clone();
        move |event: &KeyEvent| editor.dispatch_key(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::EdgeDirection;
    use crate::model::{Edge, Snapshot};
    use crate::shortcuts::{Modifiers, Platform};
    use crate::validation::{ValidationContext, ValidationError, ValidationResult};
    use serde_json::Map;

    fn editor() -> GraphEditor {
        let editor = GraphEditor::new(EditorConfig {
            platform: Some(Platform::Other),
            ..Default::default()
        });
        editor.store().borrow_mut().load_data(Snapshot::new(
            vec![
                Node::new("static", "a", 0.0, 0.0)
                    .with_size(100.0, 50.0)
                    .with_ports(vec![], vec![25.0]),
                Node::new("computed", "b", 300.0, 0.0)
                    .with_size(100.0, 50.0)
                    .with_ports(vec![25.0], vec![]),
            ],
            vec![],
            Map::new(),
        ));
        editor
    }

    fn canvas() -> Rect {
        Rect::new(0.0, 0.0, 800.0, 600.0)
    }

    fn drag_edge(editor: &GraphEditor) -> bool {
        editor.edge_start(
            NewEdgeStart::new("a", 0, EdgeDirection::Outbound, Point::new(100.0, 25.0)),
            canvas(),
        )
    }

    // ========================================================================
    // Edge creation
    // ========================================================================

    #[test]
    fn test_edge_gesture_connects() {
        let editor = editor();
        assert!(drag_edge(&editor));
        assert!(editor.interaction_flags().edge_creating);
        assert!(editor.draft_path().is_some());

        editor.edge_update(Point::new(305.0, 25.0));
        assert!(editor.is_connectable());

        assert!(editor.edge_end());
        assert!(!editor.interaction_flags().edge_creating);

        let store = editor.store();
        let store = store.borrow();
        assert_eq!(store.edges(), &[Edge::between("a", 0, "b", 0)]);
        assert_eq!(store.histories().last().unwrap().name, "addEdge");
        assert_eq!(editor.paths().len(), 1);
    }

    #[test]
    fn test_edge_rejected_by_custom_validator() {
        fn never(_: &Edge, _: &ValidationContext<'_>) -> ValidationResult {
            ValidationResult::Invalid(ValidationError::Custom("read only".into()))
        }

        let editor = editor();
        editor.set_edge_validator(never);
        drag_edge(&editor);
        editor.edge_update(Point::new(305.0, 25.0));

        assert!(!editor.is_connectable());
        assert!(!editor.edge_end());
        assert!(editor.store().borrow().edges().is_empty());
    }

    #[test]
    fn test_edge_at_finds_rendered_edge() {
        let editor = editor();
        editor.store().borrow_mut().push_edge(Edge::between("a", 0, "b", 0));

        assert_eq!(editor.edge_at(Point::new(100.0, 25.0)), Some(0));
        assert_eq!(editor.edge_at(Point::new(200.0, 400.0)), None);
    }

    // ========================================================================
    // Gesture exclusivity
    // ========================================================================

    #[test]
    fn test_pan_blocked_while_edge_creating() {
        let editor = editor();
        drag_edge(&editor);

        let start = editor.pan_begin(Point::default(), PointerTarget::Canvas, false, ScrollOffset::default());
        assert!(!start.started);
        assert!(!editor.is_panning());
    }

    #[test]
    fn test_edge_blocked_while_node_dragging() {
        let editor = editor();
        assert!(editor.node_drag_start(0, Point::new(10.0, 10.0)).unwrap());
        assert!(!drag_edge(&editor));
    }

    #[test]
    fn test_node_drag_blocked_while_panning() {
        let editor = editor();
        let start = editor.pan_begin(Point::default(), PointerTarget::Canvas, false, ScrollOffset::default());
        assert!(start.started);
        assert!(!editor.node_drag_start(0, Point::default()).unwrap());
        assert!(editor.pan_end());
        assert!(editor.node_drag_start(0, Point::default()).unwrap());
    }

    // ========================================================================
    // Node dragging
    // ========================================================================

    #[test]
    fn test_node_drag_checkpoints_once() {
        let editor = editor();
        let store = editor.store();

        assert!(editor.node_drag_start(1, Point::new(310.0, 10.0)).unwrap());
        assert!(editor.node_drag_move(Point::new(320.0, 30.0)));
        assert!(editor.node_drag_move(Point::new(330.0, 50.0)));
        assert_eq!(store.borrow().histories().len(), 1);

        let position = store.borrow().node("b").unwrap().position.clone();
        assert_eq!((position.x, position.y), (320.0, 40.0));
        assert_eq!(position.width, Some(100.0));

        assert!(editor.node_drag_end());
        assert!(!editor.node_drag_end());
        assert_eq!(store.borrow().histories().len(), 2);
        assert_eq!(store.borrow().histories()[1].name, "position");

        assert!(store.borrow_mut().undo());
        assert_eq!(store.borrow().node("b").unwrap().position.x, 300.0);
    }

    #[test]
    fn test_node_drag_invalid_index() {
        let editor = editor();
        assert!(matches!(
            editor.node_drag_start(9, Point::default()),
            Err(EditorError::NodeIndexOutOfRange { index: 9, len: 2 })
        ));
        assert!(!editor.node_drag_move(Point::default()));
    }

    #[test]
    fn test_node_drag_aborts_when_node_deleted() {
        let editor = editor();
        editor.node_drag_start(0, Point::default()).unwrap();
        editor.store().borrow_mut().delete_node(0).unwrap();

        assert!(!editor.node_drag_move(Point::new(5.0, 5.0)));
        assert!(!editor.interaction_flags().node_dragging);
        assert!(!editor.node_drag_end());
    }

    // ========================================================================
    // Node contexts
    // ========================================================================

    #[test]
    fn test_node_context_reports_target() {
        let editor = editor();
        drag_edge(&editor);
        editor.edge_update(Point::new(305.0, 25.0));

        let target = editor.node_context(1).unwrap();
        assert!(target.edge_creating);
        assert!(target.connectable);
        assert_eq!(target.nearest_target.unwrap().index, 0);

        let source = editor.node_context(0).unwrap();
        assert!(source.nearest_target.is_none());
        assert!(!source.connectable);
    }

    #[test]
    fn test_node_context_from_store_listener() {
        let editor = editor();
        let seen: Rc<RefCell<Vec<bool>>> = Rc::default();
        {
            let editor = editor.clone();
            let seen = seen.clone();
            editor.store().borrow_mut().on_change(move |_: &Snapshot| {
                let reentrant = matches!(editor.node_context(0), Err(EditorError::Reentrant(_)));
                seen.borrow_mut().push(reentrant);
            });
        }

        drag_edge(&editor);
        editor.edge_update(Point::new(305.0, 25.0));
        assert!(editor.edge_end());

        assert_eq!(*seen.borrow(), [true]);
        assert!(editor.node_context(0).is_ok());
    }

    #[test]
    fn test_node_context_unavailable() {
        let editor = editor();
        assert!(matches!(
            editor.node_context(5),
            Err(EditorError::NodeContextUnavailable(5))
        ));
    }

    // ========================================================================
    // Shortcuts
    // ========================================================================

    #[test]
    fn test_default_shortcuts_undo_redo() {
        let editor = editor();
        editor.install_default_shortcuts().unwrap();
        editor.store().borrow_mut().push_edge(Edge::between("a", 0, "b", 0));

        let undo = KeyEvent::new("z", Modifiers::primary(Platform::Other));
        let redo = KeyEvent::new("Z", Modifiers::primary(Platform::Other).with_shift());
        let callback = editor.key_pressed_callback();

        assert!(callback(&undo));
        assert!(editor.store().borrow().edges().is_empty());

        assert!(callback(&redo));
        assert_eq!(editor.store().borrow().edges().len(), 1);

        assert!(!callback(&KeyEvent::new("z", Modifiers::NONE)));
        assert!(!callback(&undo.clone().in_editable()));
        assert_eq!(editor.store().borrow().edges().len(), 1);
    }

    #[test]
    fn test_shortcut_removes_itself() {
        let editor = editor();
        let fired = Rc::new(RefCell::new(0));
        let slot: Rc<RefCell<Option<ShortcutId>>> = Rc::default();

        let id = {
            let editor = editor.clone();
            let fired = fired.clone();
            let slot = slot.clone();
            editor.clone().add_shortcut("mod+k", move |_: &KeyEvent| {
                *fired.borrow_mut() += 1;
                if let Some(id) = slot.borrow_mut().take() {
                    editor.remove_shortcut(id)?;
                }
                Ok(())
            })
        }
        .unwrap();
        *slot.borrow_mut() = Some(id);

        let event = KeyEvent::new("k", Modifiers::primary(Platform::Other));
        assert!(editor.dispatch_key(&event));
        assert!(!editor.dispatch_key(&event));
        assert_eq!(*fired.borrow(), 1);
        assert!(matches!(editor.remove_shortcut(id), Err(EditorError::UnknownShortcut(_))));
    }

    #[test]
    fn test_shortcut_may_register_another() {
        let editor = editor();
        let hits = Rc::new(RefCell::new(Vec::new()));
        {
            let editor = editor.clone();
            let hits = hits.clone();
            editor.clone().add_shortcut("mod+n", move |_: &KeyEvent| {
                let hits = hits.clone();
                editor.add_shortcut("mod+m", move |_: &KeyEvent| {
                    hits.borrow_mut().push("m");
                    Ok(())
                })?;
                Ok(())
            })
        }
        .unwrap();

        let ctrl = Modifiers::primary(Platform::Other);
        assert!(!editor.dispatch_key(&KeyEvent::new("m", ctrl)));
        assert!(editor.dispatch_key(&KeyEvent::new("n", ctrl)));
        assert!(editor.dispatch_key(&KeyEvent::new("m", ctrl)));
        assert_eq!(*hits.borrow(), ["m"]);
    }

    #[test]
    fn test_shortcut_with_store_borrowed_is_contained() {
        let editor = editor();
        editor.install_default_shortcuts().unwrap();

        let store = editor.store();
        let _held = store.borrow();
        assert!(editor.dispatch_key(&KeyEvent::new("z", Modifiers::primary(Platform::Other))));
    }
}
