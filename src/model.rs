//! Graph data model: nodes, edges and immutable snapshots.
//!
//! The serialized form uses camelCase field names (`nodeId`, `inputCenters`)
//! so snapshots round-trip with the save format used by UI shells.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EditorResult;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Placement of a node on the canvas.
///
/// `width`, `height` and the port centers are filled in by the first layout
/// measurement; until then they are `None`. Port centers are vertical offsets
/// relative to the node's top edge.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePosition {
    pub x: f32,
    pub y: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_centers: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_centers: Option<Vec<f32>>,
}

impl NodePosition {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    /// Rectangle as `(x, y, width, height)`, unmeasured sizes count as zero.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        (
            self.x,
            self.y,
            self.width.unwrap_or(0.0),
            self.height.unwrap_or(0.0),
        )
    }

    pub fn input_center(&self, index: usize) -> Option<f32> {
        self.input_centers.as_ref()?.get(index).copied()
    }

    pub fn output_center(&self, index: usize) -> Option<f32> {
        self.output_centers.as_ref()?.get(index).copied()
    }
}

/// Partial update merged into a [`NodePosition`]; `None` fields are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PositionPatch {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub input_centers: Option<Vec<f32>>,
    pub output_centers: Option<Vec<f32>>,
}

impl PositionPatch {
    pub fn moved_to(x: f32, y: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Default::default()
        }
    }

    pub fn apply(&self, position: &NodePosition) -> NodePosition {
        NodePosition {
            x: self.x.unwrap_or(position.x),
            y: self.y.unwrap_or(position.y),
            width: self.width.or(position.width),
            height: self.height.or(position.height),
            input_centers: self
                .input_centers
                .clone()
                .or_else(|| position.input_centers.clone()),
            output_centers: self
                .output_centers
                .clone()
                .or_else(|| position.output_centers.clone()),
        }
    }
}

/// A node of the graph. `data` is an opaque payload owned by the integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    pub node_id: String,
    pub position: NodePosition,
    #[serde(default)]
    pub data: Value,
}

impl Node {
    pub fn new(node_type: impl Into<String>, node_id: impl Into<String>, x: f32, y: f32) -> Self {
        Self {
            node_type: node_type.into(),
            node_id: node_id.into(),
            position: NodePosition::at(x, y),
            data: Value::Object(Map::new()),
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.position.width = Some(width);
        self.position.height = Some(height);
        self
    }

    pub fn with_ports(mut self, input_centers: Vec<f32>, output_centers: Vec<f32>) -> Self {
        self.position.input_centers = Some(input_centers);
        self.position.output_centers = Some(output_centers);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    /// Shallow-merge `patch` into `data`. A non-object payload is replaced.
    pub(crate) fn merged_data(&self, patch: &Map<String, Value>) -> Value {
        let mut merged = match &self.data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        for (key, value) in patch {
            merged.insert(key.clone(), value.clone());
        }
        Value::Object(merged)
    }
}

/// One end of an edge: a node and a port index on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeEndpoint {
    pub node_id: String,
    pub index: usize,
}

impl EdgeEndpoint {
    pub fn new(node_id: impl Into<String>, index: usize) -> Self {
        Self {
            node_id: node_id.into(),
            index,
        }
    }
}

/// Edge discriminator, serialized as `"edge"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeKind {
    #[default]
    Edge,
}

/// A directed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "type", default)]
    pub kind: EdgeKind,
    pub source: EdgeEndpoint,
    pub target: EdgeEndpoint,
}

impl Edge {
    pub fn new(source: EdgeEndpoint, target: EdgeEndpoint) -> Self {
        Self {
            kind: EdgeKind::Edge,
            source,
            target,
        }
    }

    /// Shorthand for `Edge::new(EdgeEndpoint::new(..), EdgeEndpoint::new(..))`.
    pub fn between(
        source: impl Into<String>,
        source_index: usize,
        target: impl Into<String>,
        target_index: usize,
    ) -> Self {
        Self::new(
            EdgeEndpoint::new(source, source_index),
            EdgeEndpoint::new(target, target_index),
        )
    }

    pub fn is_self_loop(&self) -> bool {
        self.source.node_id == self.target.node_id
    }

    pub fn same_target(&self, other: &Edge) -> bool {
        self.target == other.target
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }
}

/// An edge paired with the nodes it connects.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedEdge<'a> {
    pub edge: &'a Edge,
    pub source: &'a Node,
    pub target: &'a Node,
}

/// The whole graph at one point in time.
///
/// Snapshots are never mutated once they become current; every store
/// operation builds a new one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Snapshot {
    pub fn new(nodes: Vec<Node>, edges: Vec<Edge>, metadata: Map<String, Value>) -> Self {
        Self {
            nodes,
            edges,
            metadata,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a stored snapshot, migrating legacy root-level fields.
    pub fn from_json(raw: Value) -> EditorResult<Self> {
        crate::migrate::normalize_snapshot(raw)
    }

    pub fn to_json(&self) -> EditorResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.node_id == node_id)
    }

    pub fn node_index(&self, node_id: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.node_id == node_id)
    }

    pub fn node_records(&self) -> HashMap<&str, &Node> {
        self.nodes
            .iter()
            .map(|n| (n.node_id.as_str(), n))
            .collect()
    }

    /// Edges whose endpoints both exist, paired with their nodes.
    pub fn resolve_edges(&self) -> Vec<ResolvedEdge<'_>> {
        let records = self.node_records();
        self.edges
            .iter()
            .filter_map(|edge| {
                Some(ResolvedEdge {
                    edge,
                    source: records.get(edge.source.node_id.as_str())?,
                    target: records.get(edge.target.node_id.as_str())?,
                })
            })
            .collect()
    }
}
