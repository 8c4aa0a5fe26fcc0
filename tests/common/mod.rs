//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

use anyhow::anyhow;
use node_editor_core::{
    Edge, EdgeEndpoint, EditorConfig, GraphEditor, GraphPlugin, HookResult, Node, NodeUpdate, Platform,
    Rect, Snapshot,
};
use serde_json::{json, Map, Value};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness. Set `RUST_LOG` to see it.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Measured node with `inputs` input ports and `outputs` output ports spaced
/// 20 units apart starting at 20.
pub fn node(id: &str, x: f32, y: f32, inputs: usize, outputs: usize) -> Node {
    let centers = |n: usize| (0..n).map(|i| 20.0 + 20.0 * i as f32).collect();
    Node::new("static", id, x, y)
        .with_size(120.0, 80.0)
        .with_ports(centers(inputs), centers(outputs))
}

/// `a -> b`, with `c` unconnected below.
///
/// ```text
///  a (0,0)  ──▶  b (300,0)
///  c (0,200)
/// ```
pub fn sample_graph() -> Snapshot {
    Snapshot::new(
        vec![
            node("a", 0.0, 0.0, 0, 1),
            node("b", 300.0, 0.0, 2, 1),
            node("c", 0.0, 200.0, 1, 1),
        ],
        vec![Edge::between("a", 0, "b", 0)],
        Map::new(),
    )
}

pub fn canvas() -> Rect {
    Rect::new(0.0, 0.0, 1200.0, 800.0)
}

/// Editor with the sample graph loaded and `mod` resolved to ctrl.
pub fn editor() -> GraphEditor {
    init_tracing();
    let editor = GraphEditor::new(EditorConfig {
        platform: Some(Platform::Other),
        ..Default::default()
    });
    editor.store().borrow_mut().load_data(sample_graph());
    editor
}

/// Plugin recording every hook call, with configurable votes and converters.
#[derive(Default)]
pub struct RecordingPlugin {
    pub name: String,
    pub calls: RefCell<Vec<String>>,
    pub edge_vote: Cell<Option<bool>>,
    pub node_vote: Cell<Option<bool>>,
    pub fail_hooks: Cell<bool>,
    pub converts: Cell<bool>,
}

impl RecordingPlugin {
    pub fn new(name: &str) -> Rc<Self> {
        Rc::new(Self {
            name: name.to_string(),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) -> HookResult {
        self.calls.borrow_mut().push(call);
        if self.fail_hooks.get() {
            Err(anyhow!("{} hook failed", self.name))
        } else {
            Ok(())
        }
    }
}

impl GraphPlugin for RecordingPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_init(&self) -> HookResult {
        self.record("init".into())
    }

    fn on_node_add(&self, node: &Node) -> HookResult {
        self.record(format!("node_add:{}", node.node_id))
    }

    fn on_node_update(&self, node_id: &str, update: NodeUpdate<'_>) -> HookResult {
        let kind = match update {
            NodeUpdate::Position(_) => "position",
            NodeUpdate::Data(_) => "data",
        };
        self.record(format!("node_update:{node_id}:{kind}"))
    }

    fn on_node_delete(&self, node_id: &str) -> HookResult {
        self.record(format!("node_delete:{node_id}"))
    }

    fn on_edge_add(&self, edge: &Edge) -> HookResult {
        self.record(format!("edge_add:{}->{}", edge.source.node_id, edge.target.node_id))
    }

    fn on_edge_delete(&self, index: usize, _edge: &Edge) -> HookResult {
        self.record(format!("edge_delete:{index}"))
    }

    fn validate_edge(
        &self,
        _source: &EdgeEndpoint,
        _target: &EdgeEndpoint,
        _nodes: &[Node],
        _edges: &[Edge],
    ) -> Option<bool> {
        self.edge_vote.get()
    }

    fn validate_node(&self, _node: &Node) -> Option<bool> {
        self.node_vote.get()
    }

    /// Exports `{"format": name, "nodeIds": [...]}`.
    fn export_data(&self, snapshot: &Snapshot) -> Option<anyhow::Result<Value>> {
        if !self.converts.get() {
            return None;
        }
        let ids: Vec<&str> = snapshot.nodes.iter().map(|n| n.node_id.as_str()).collect();
        Some(Ok(json!({ "format": self.name, "nodeIds": ids })))
    }

    /// Imports the export format back into unmeasured, unconnected nodes.
    fn import_data(&self, raw: &Value) -> Option<anyhow::Result<Snapshot>> {
        if !self.converts.get() {
            return None;
        }
        let result = raw
            .get("nodeIds")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("missing nodeIds"))
            .map(|ids| {
                let nodes = ids
                    .iter()
                    .filter_map(Value::as_str)
                    .map(|id| Node::new("static", id, 0.0, 0.0))
                    .collect();
                Snapshot::new(nodes, vec![], Map::new())
            });
        Some(result)
    }
}
