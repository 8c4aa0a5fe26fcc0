//! # Node Editor Core
//!
//! The editing core of a node-graph visual editor: a versioned graph store
//! with snapshot undo/redo and plugin hooks, a drag-to-connect edge creation
//! state machine with nearest-port snapping, edge curve geometry, canvas
//! panning and chorded keyboard shortcuts.
//!
//! Rendering stays outside the crate. The UI layer reports pointer events and
//! layout measurements, and reads back snapshots, edge paths and scroll
//! offsets, typically through slint `VecModel`s bound to the store.
//!
//! ## Quick Start
//!
//! ```ignore
//! use node_editor_core::{Edge, GraphEditor, Node};
//!
//! let editor = GraphEditor::default();
//! editor.install_default_shortcuts()?;
//!
//! {
//!     let store = editor.store();
//!     let mut store = store.borrow_mut();
//!     store.push_node(Node::new("static", "a", 0.0, 0.0));
//!     store.push_node(Node::new("computed", "b", 240.0, 0.0));
//!     store.push_edge(Edge::between("a", 0, "b", 0));
//! }
//!
//! let model = Rc::new(VecModel::default());
//! editor.paths().bind_model(model.clone(), |index, commands| EdgeRow { index: index as i32, commands });
//! ```
//!
//! ## Modules
//!
//! - [`GraphStore`] - Canonical graph, history and plugin dispatch
//! - [`NewEdgeController`] - Edge creation gesture
//! - [`PanController`] - Canvas panning and wheel scrolling
//! - [`ShortcutRegistry`] - Keyboard shortcuts
//! - [`GraphEditor`] - All of the above wired together
//! - [`edge_path`], [`nearest_node`], [`nearest_port`] - Pure geometry
//! - [`EdgeValidator`] - Pluggable connection rules

pub mod config;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod history;
pub mod links;
pub mod migrate;
pub mod model;
pub mod new_edge;
pub mod plugin;
pub mod shortcuts;
pub mod store;
pub mod tracking;
pub mod validation;
pub mod viewport;

pub use config::EditorConfig;
pub use editor::{GraphEditor, NodeContext};
pub use error::{EditorError, EditorResult};
pub use geometry::{
    distance_to_bezier, edge_path, edge_path_with, find_edge_at, nearest_node, nearest_port, CubicBezier,
    CurveConfig, EdgeDirection, EdgeHitConfig, NearestNode, NearestPort, SnapPolicy,
};
pub use history::{History, HistoryEntry};
pub use links::{EdgePath, EdgePathManager};
pub use migrate::normalize_snapshot;
pub use model::{
    Edge, EdgeEndpoint, EdgeKind, Node, NodePosition, Point, PositionPatch, ResolvedEdge, Snapshot,
};
pub use new_edge::{EdgeDraft, NearestTarget, NewEdgeController, NewEdgeStart};
pub use plugin::{GraphPlugin, HookResult, NodeUpdate, PluginRegistry};
pub use shortcuts::{
    KeyCombo, KeyEvent, MatchedShortcut, Modifiers, Platform, ShortcutId, ShortcutRegistry,
};
pub use store::GraphStore;
pub use tracking::{measure_node, PortTracker, Rect};
pub use validation::{
    is_edge_connectable, validate_edge, CompositeValidator, DefaultEdgeValidator, EdgeValidator,
    MultiInputPolicy, PluginVetoValidator, ValidationContext, ValidationError, ValidationResult,
};
pub use viewport::{
    client_to_canvas, ControlKind, InteractionFlags, PanController, PanStart, PointerTarget, ScrollExtent,
    ScrollOffset, WheelOutcome,
};
