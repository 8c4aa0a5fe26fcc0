//! Layout measurement tracking.
//!
//! The rendering layer measures each node and its port elements after layout
//! and reports the bounding boxes here. [`measure_node`] turns those boxes into
//! a [`PositionPatch`] carrying the node size and the vertical port centers the
//! geometry module snaps to. [`PortTracker`] wires that into a shared
//! [`GraphStore`] for use from UI callbacks.
//!
//! # Example
//!
//! ```ignore
//! use node_editor_core::{GraphStore, PortTracker};
//!
//! let store = Rc::new(RefCell::new(GraphStore::new()));
//! let tracker = PortTracker::new(store.clone());
//!
//! window.on_node_measured(tracker.node_measured_callback());
//! ```

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::model::PositionPatch;
use crate::store::GraphStore;

/// A client-space bounding box as reported by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Size and port centers of a measured node.
///
/// A port's center is its top offset relative to the node's top plus half
/// its height, rounded to two decimals.
pub fn measure_node(node: Rect, inputs: &[Rect], outputs: &[Rect]) -> PositionPatch {
    let center = |port: &Rect| round2(port.top - node.top + port.height / 2.0);

    PositionPatch {
        width: Some(round2(node.width)),
        height: Some(round2(node.height)),
        input_centers: Some(inputs.iter().map(center).collect()),
        output_centers: Some(outputs.iter().map(center).collect()),
        ..Default::default()
    }
}

/// Feeds layout measurements into a shared [`GraphStore`].
///
/// Measurements replace the node's size and port centers without creating a
/// history entry; they describe the rendering, not an edit.
#[derive(Clone)]
pub struct PortTracker {
    store: Rc<RefCell<GraphStore>>,
}

impl PortTracker {
    pub fn new(store: Rc<RefCell<GraphStore>>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Rc<RefCell<GraphStore>> {
        self.store.clone()
    }

    /// Apply one node's measurement. Unknown node ids are ignored, since a
    /// late layout pass may report a node that was deleted meanwhile.
    pub fn handle_measurement(&self, node_id: &str, node: Rect, inputs: &[Rect], outputs: &[Rect]) {
        let mut store = self.store.borrow_mut();
        let Some(index) = store.node_index(node_id) else {
            tracing::debug!(node_id, "measurement for unknown node ignored");
            return;
        };
        let patch = measure_node(node, inputs, outputs);
        if let Err(err) = store.update_node_position(index, patch) {
            tracing::warn!(node_id, %err, "failed to apply measurement");
        }
    }

    /// Callback for the rendering layer's "node measured" event.
    pub fn node_measured_callback(&self) -> impl Fn(&str, Rect, &[Rect], &[Rect]) + Clone {
        let tracker = self.clone();
        move |node_id: &str, node: Rect, inputs: &[Rect], outputs: &[Rect]| {
            tracker.handle_measurement(node_id, node, inputs, outputs);
        }
    }
}
