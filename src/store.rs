//! The canonical graph and its undo/redo history.
//!
//! [`GraphStore`] owns the current [`Snapshot`], the [`History`] arena and the
//! [`PluginRegistry`]. Every mutation builds a new snapshot; the previous one
//! stays untouched in history, so undo and redo just swap the shared pointer.
//!
//! # Example
//!
//! ```ignore
//! use node_editor_core::{Edge, GraphStore, Node, Snapshot};
//!
//! let mut store = GraphStore::new();
//! store.load_data(Snapshot::empty());
//! store.push_node(Node::new("static", "a", 0.0, 0.0));
//! store.push_node(Node::new("computed", "b", 200.0, 0.0));
//! store.push_edge(Edge::between("a", 0, "b", 0));
//!
//! store.undo(); // removes the edge
//! store.redo(); // restores it
//! ```
//!
//! # Reactive consumers
//!
//! UI models stay in sync through [`bind_nodes_model`](GraphStore::bind_nodes_model),
//! [`bind_edges_model`](GraphStore::bind_edges_model) or a raw
//! [`on_change`](GraphStore::on_change) listener. Listeners run after every
//! replacement of the current snapshot, including undo and redo.

use std::collections::HashMap;
use std::rc::Rc;

use serde_json::{Map, Value};
use slint::{Model, VecModel};

use crate::error::{EditorError, EditorResult};
use crate::history::{History, HistoryEntry};
use crate::model::{Edge, Node, PositionPatch, Snapshot};
use crate::plugin::{GraphPlugin, NodeUpdate, PluginRegistry};

/// Receives every new current snapshot.
trait SnapshotListener {
    fn snapshot_changed(&self, snapshot: &Snapshot);
}

impl<F: Fn(&Snapshot)> SnapshotListener for F {
    fn snapshot_changed(&self, snapshot: &Snapshot) {
        self(snapshot)
    }
}

/// Keeps a slint `VecModel` row-for-row in sync with a projection of the
/// snapshot.
pub(crate) struct ModelSyncer<P, F> {
    pub(crate) model: Rc<VecModel<P>>,
    pub(crate) constructor: F,
}

impl<P: Clone + 'static, F> ModelSyncer<P, F> {
    pub(crate) fn sync_rows(&self, items: impl Iterator<Item = P>) {
        let mut len = 0;
        for (i, item) in items.enumerate() {
            if i < self.model.row_count() {
                self.model.set_row_data(i, item);
            } else {
                self.model.push(item);
            }
            len = i + 1;
        }
        while self.model.row_count() > len {
            self.model.remove(self.model.row_count() - 1);
        }
    }
}

struct NodeRows<P, F>(ModelSyncer<P, F>);
struct EdgeRows<P, F>(ModelSyncer<P, F>);

impl<P, F> SnapshotListener for NodeRows<P, F>
where
    P: Clone + 'static,
    F: Fn(&Node) -> P,
{
    fn snapshot_changed(&self, snapshot: &Snapshot) {
        self.0
            .sync_rows(snapshot.nodes.iter().map(|n| (self.0.constructor)(n)));
    }
}

impl<P, F> SnapshotListener for EdgeRows<P, F>
where
    P: Clone + 'static,
    F: Fn(&Edge) -> P,
{
    fn snapshot_changed(&self, snapshot: &Snapshot) {
        self.0
            .sync_rows(snapshot.edges.iter().map(|e| (self.0.constructor)(e)));
    }
}

/// Graph state, history and plugins.
pub struct GraphStore {
    current: Rc<Snapshot>,
    history: History,
    plugins: PluginRegistry,
    version: u64,
    listeners: Vec<Box<dyn SnapshotListener>>,
}

impl Default for GraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            current: Rc::new(Snapshot::empty()),
            history: History::new(),
            plugins: PluginRegistry::new(),
            version: 0,
            listeners: Vec::new(),
        }
    }

    // ========================================================================
    // Current snapshot
    // ========================================================================

    /// The current snapshot, shared with history.
    pub fn current(&self) -> Rc<Snapshot> {
        self.current.clone()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.current.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.current.edges
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.current.metadata
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.current.node(node_id)
    }

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.current.node_index(node_id)
    }

    /// Nodes keyed by id.
    pub fn node_records(&self) -> HashMap<&str, &Node> {
        self.current.node_records()
    }

    /// Incremented every time the current snapshot is replaced.
    pub fn version(&self) -> u64 {
        self.version
    }

    fn replace_current(&mut self, snapshot: Rc<Snapshot>) {
        self.current = snapshot;
        self.version += 1;
        for listener in &self.listeners {
            listener.snapshot_changed(&self.current);
        }
    }

    /// Make `snapshot` current and, when `name` is given, record it in history.
    fn update_data(&mut self, snapshot: Snapshot, name: Option<&str>) {
        if let Some(id) = crate::migrate::first_duplicate_id(&snapshot.nodes) {
            tracing::warn!(node_id = %id, "snapshot holds a duplicate node id");
        }
        let snapshot = Rc::new(snapshot);
        if let Some(name) = name {
            self.history.push(name, snapshot.clone());
        }
        self.replace_current(snapshot);
    }

    /// Copy of the current snapshot with the node list replaced.
    fn with_nodes(&self, nodes: Vec<Node>) -> Snapshot {
        Snapshot::new(nodes, self.current.edges.clone(), self.current.metadata.clone())
    }

    fn check_node_index(&self, index: usize) -> EditorResult<&Node> {
        self.current
            .nodes
            .get(index)
            .ok_or(EditorError::NodeIndexOutOfRange {
                index,
                len: self.current.nodes.len(),
            })
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Replace the current snapshot without touching history.
    pub fn init_data(&mut self, nodes: Vec<Node>, edges: Vec<Edge>, metadata: Map<String, Value>) {
        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "init data");
        self.update_data(Snapshot::new(nodes, edges, metadata), None);
    }

    /// Replace the current snapshot and record it as `"load"`.
    pub fn load_data(&mut self, snapshot: Snapshot) {
        tracing::info!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            "loading graph"
        );
        self.update_data(snapshot, Some("load"));
    }

    /// Normalize a stored snapshot and load it.
    pub fn load_json(&mut self, raw: Value) -> EditorResult<()> {
        let snapshot = Snapshot::from_json(raw)?;
        self.load_data(snapshot);
        Ok(())
    }

    /// Clear the graph, recorded as `"reset"`.
    pub fn reset(&mut self) {
        self.update_data(Snapshot::empty(), Some("reset"));
    }

    /// Shallow-merge `patch` into the snapshot metadata, recorded as `"metadata"`.
    pub fn update_metadata(&mut self, patch: Map<String, Value>) {
        let mut metadata = self.current.metadata.clone();
        metadata.extend(patch);
        let snapshot = Snapshot::new(
            self.current.nodes.clone(),
            self.current.edges.clone(),
            metadata,
        );
        self.update_data(snapshot, Some("metadata"));
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Append a node. Returns `false` when a plugin vetoes it or the id is
    /// already taken.
    pub fn push_node(&mut self, node: Node) -> bool {
        if self.current.node(&node.node_id).is_some() {
            tracing::warn!(node_id = %node.node_id, "node id already in graph, not added");
            return false;
        }
        if self.plugins.validate_node(&node) == Some(false) {
            return false;
        }

        self.plugins.notify("on_node_add", |p| p.on_node_add(&node));

        tracing::debug!(node_id = %node.node_id, node_type = %node.node_type, "add node");
        let mut nodes = self.current.nodes.clone();
        nodes.push(node);
        let snapshot = self.with_nodes(nodes);
        self.update_data(snapshot, Some("addNode"));
        true
    }

    /// Merge `patch` into a node's position without recording history.
    ///
    /// Used for drags and layout measurements; call
    /// [`save_node_position_data`](Self::save_node_position_data) once the
    /// gesture completes.
    pub fn update_node_position(&mut self, index: usize, patch: PositionPatch) -> EditorResult<()> {
        let mut node = self.check_node_index(index)?.clone();
        node.position = patch.apply(&node.position);

        self.plugins.notify("on_node_update", |p| {
            p.on_node_update(&node.node_id, NodeUpdate::Position(&node.position))
        });

        tracing::trace!(node_id = %node.node_id, x = node.position.x, y = node.position.y, "update position");
        let mut nodes = self.current.nodes.clone();
        nodes[index] = node;
        let snapshot = self.with_nodes(nodes);
        self.update_data(snapshot, None);
        Ok(())
    }

    /// Record the current snapshot as `"position"`.
    pub fn save_node_position_data(&mut self) {
        self.history.push("position", self.current.clone());
    }

    /// Shallow-merge `patch` into a node's `data`, recorded as `"updateNode"`.
    pub fn update_node_data(&mut self, index: usize, patch: Map<String, Value>) -> EditorResult<()> {
        let mut node = self.check_node_index(index)?.clone();
        node.data = node.merged_data(&patch);

        self.plugins.notify("on_node_update", |p| {
            p.on_node_update(&node.node_id, NodeUpdate::Data(&patch))
        });

        tracing::debug!(node_id = %node.node_id, keys = patch.len(), "update node data");
        let mut nodes = self.current.nodes.clone();
        nodes[index] = node;
        let snapshot = self.with_nodes(nodes);
        self.update_data(snapshot, Some("updateNode"));
        Ok(())
    }

    /// Remove a node and every edge touching it, recorded as `"deleteNode"`.
    pub fn delete_node(&mut self, index: usize) -> EditorResult<Node> {
        let removed = self.check_node_index(index)?.clone();

        self.plugins
            .notify("on_node_delete", |p| p.on_node_delete(&removed.node_id));

        let mut nodes = self.current.nodes.clone();
        nodes.remove(index);
        let edges: Vec<Edge> = self
            .current
            .edges
            .iter()
            .filter(|e| !e.touches(&removed.node_id))
            .cloned()
            .collect();
        tracing::debug!(
            node_id = %removed.node_id,
            cascaded = self.current.edges.len() - edges.len(),
            "delete node"
        );

        let snapshot = Snapshot::new(nodes, edges, self.current.metadata.clone());
        self.update_data(snapshot, Some("deleteNode"));
        Ok(removed)
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Append an edge unless a plugin vetoes it. Recorded as `"addEdge"`.
    ///
    /// Only plugin votes are consulted here; the interactive connectability
    /// rule lives in [`crate::validation`].
    pub fn push_edge(&mut self, edge: Edge) -> bool {
        if self
            .plugins
            .validate_edge(&edge, &self.current.nodes, &self.current.edges)
            == Some(false)
        {
            tracing::debug!(
                source = %edge.source.node_id,
                target = %edge.target.node_id,
                "edge rejected by plugin"
            );
            return false;
        }

        self.plugins.notify("on_edge_add", |p| p.on_edge_add(&edge));

        tracing::debug!(
            source = %edge.source.node_id,
            source_index = edge.source.index,
            target = %edge.target.node_id,
            target_index = edge.target.index,
            "add edge"
        );
        let mut edges = self.current.edges.clone();
        edges.push(edge);
        let snapshot = Snapshot::new(self.current.nodes.clone(), edges, self.current.metadata.clone());
        self.update_data(snapshot, Some("addEdge"));
        true
    }

    /// Remove the edge at `index`, recorded as `"deleteEdge"`.
    pub fn delete_edge(&mut self, index: usize) -> EditorResult<Edge> {
        let Some(removed) = self.current.edges.get(index).cloned() else {
            return Err(EditorError::EdgeIndexOutOfRange {
                index,
                len: self.current.edges.len(),
            });
        };

        self.plugins
            .notify("on_edge_delete", |p| p.on_edge_delete(index, &removed));

        let mut edges = self.current.edges.clone();
        edges.remove(index);
        let snapshot = Snapshot::new(self.current.nodes.clone(), edges, self.current.metadata.clone());
        self.update_data(snapshot, Some("deleteEdge"));
        Ok(removed)
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn undoable(&self) -> bool {
        self.history.can_undo()
    }

    pub fn redoable(&self) -> bool {
        self.history.can_redo()
    }

    /// Step back one history entry. Plugins are not notified.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(snapshot) => {
                tracing::debug!(index = self.history.index(), "undo");
                self.replace_current(snapshot);
                true
            }
            None => {
                tracing::trace!("nothing to undo");
                false
            }
        }
    }

    /// Step forward one history entry. Plugins are not notified.
    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(snapshot) => {
                tracing::debug!(index = self.history.index(), "redo");
                self.replace_current(snapshot);
                true
            }
            None => {
                tracing::trace!("nothing to redo");
                false
            }
        }
    }

    pub fn histories(&self) -> &[HistoryEntry] {
        self.history.entries()
    }

    /// Number of applied history entries.
    pub fn history_index(&self) -> usize {
        self.history.index()
    }

    // ========================================================================
    // Plugins
    // ========================================================================

    /// Append a plugin and run its `on_init` hook.
    pub fn register_plugin(&mut self, plugin: Rc<dyn GraphPlugin>) {
        self.plugins.register(plugin);
    }

    pub fn get_plugin(&self, name: &str) -> Option<Rc<dyn GraphPlugin>> {
        self.plugins.get(name)
    }

    pub fn plugins(&self) -> &PluginRegistry {
        &self.plugins
    }

    /// Convert the current snapshot with the first plugin exporter, or
    /// serialize it unchanged when no plugin provides one.
    pub fn export_data(&self) -> EditorResult<Value> {
        match self.plugins.export_data(&self.current) {
            Some((plugin, result)) => result.map_err(|err| EditorError::Plugin {
                plugin: plugin.to_string(),
                message: format!("{:#}", err),
            }),
            None => self.current.to_json(),
        }
    }

    /// Convert `raw` with the first plugin importer and load the result.
    /// Returns `Ok(false)` when no plugin provides an importer.
    pub fn import_data(&mut self, raw: &Value) -> EditorResult<bool> {
        let snapshot = match self.plugins.import_data(raw) {
            Some((plugin, result)) => result.map_err(|err| EditorError::Plugin {
                plugin: plugin.to_string(),
                message: format!("{:#}", err),
            })?,
            None => {
                tracing::debug!("no plugin importer registered, import ignored");
                return Ok(false);
            }
        };
        self.load_data(snapshot);
        Ok(true)
    }

    // ========================================================================
    // Reactive binding
    // ========================================================================

    /// Run `listener` after every change of the current snapshot.
    pub fn on_change<F>(&mut self, listener: F)
    where
        F: Fn(&Snapshot) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    /// Mirror the node list into `model`, one row per node.
    ///
    /// The model is filled immediately and updated after every change.
    pub fn bind_nodes_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&Node) -> P + 'static,
    {
        let rows = NodeRows(ModelSyncer { model, constructor });
        rows.snapshot_changed(&self.current);
        self.listeners.push(Box::new(rows));
    }

    /// Mirror the edge list into `model`, one row per edge.
    pub fn bind_edges_model<P, F>(&mut self, model: Rc<VecModel<P>>, constructor: F)
    where
        P: Clone + 'static,
        F: Fn(&Edge) -> P + 'static,
    {
        let rows = EdgeRows(ModelSyncer { model, constructor });
        rows.snapshot_changed(&self.current);
        self.listeners.push(Box::new(rows));
    }

}
