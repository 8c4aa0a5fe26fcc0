//! Drag-to-connect edge creation.
//!
//! A gesture is `idle -> dragging -> idle`. While dragging, one end of the
//! [`EdgeDraft`] is anchored to a real port and the other follows the pointer.
//! Each pointer move produces a fresh draft value; release commits the
//! candidate edge if it validates and always returns to idle.
//!
//! # Example
//!
//! ```ignore
//! let mut edges = NewEdgeController::new(SnapPolicy::unlimited());
//!
//! // pointer-down on output port 0 of node "a"
//! edges.start(&store.current(), NewEdgeStart::new("a", 0, EdgeDirection::Outbound, client), canvas_rect);
//! // pointer-move
//! edges.update(client);
//! let highlight = edges.nearest_target(&store.current());
//! // pointer-up
//! edges.end(&mut store);
//! ```

use crate::geometry::{edge_path_with, nearest_node, nearest_port, CubicBezier, CurveConfig, EdgeDirection, SnapPolicy};
use crate::model::{Edge, EdgeEndpoint, NodePosition, Point, Snapshot};
use crate::plugin::PluginRegistry;
use crate::store::GraphStore;
use crate::tracking::Rect;
use crate::validation::{CompositeValidator, EdgeValidator, ValidationContext, ValidationResult};
use crate::viewport::client_to_canvas;

/// An edge being dragged out of a port.
#[derive(Debug, Clone, PartialEq)]
pub enum EdgeDraft {
    /// Dragged from an output port; the target follows the pointer.
    Outbound { source: EdgeEndpoint, target: Point },
    /// Dragged from an input port; the source follows the pointer.
    Inbound { source: Point, target: EdgeEndpoint },
}

impl EdgeDraft {
    pub fn direction(&self) -> EdgeDirection {
        match self {
            EdgeDraft::Outbound { .. } => EdgeDirection::Outbound,
            EdgeDraft::Inbound { .. } => EdgeDirection::Inbound,
        }
    }

    /// The end fixed to a real port.
    pub fn anchor(&self) -> &EdgeEndpoint {
        match self {
            EdgeDraft::Outbound { source, .. } => source,
            EdgeDraft::Inbound { target, .. } => target,
        }
    }

    /// The end following the pointer, in canvas coordinates.
    pub fn floating(&self) -> Point {
        match self {
            EdgeDraft::Outbound { target, .. } => *target,
            EdgeDraft::Inbound { source, .. } => *source,
        }
    }

    fn with_floating(&self, point: Point) -> Self {
        match self {
            EdgeDraft::Outbound { source, .. } => EdgeDraft::Outbound {
                source: source.clone(),
                target: point,
            },
            EdgeDraft::Inbound { target, .. } => EdgeDraft::Inbound {
                source: point,
                target: target.clone(),
            },
        }
    }
}

/// Pointer-down on a port.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEdgeStart {
    pub node_id: String,
    pub index: usize,
    pub direction: EdgeDirection,
    /// Pointer position in client coordinates.
    pub client: Point,
}

impl NewEdgeStart {
    pub fn new(node_id: impl Into<String>, index: usize, direction: EdgeDirection, client: Point) -> Self {
        Self {
            node_id: node_id.into(),
            index,
            direction,
            client,
        }
    }
}

/// The port an in-progress edge would currently connect to.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestTarget {
    pub node_id: String,
    pub index: usize,
    pub direction: EdgeDirection,
}

/// Edge-creation state machine.
pub struct NewEdgeController {
    draft: Option<EdgeDraft>,
    canvas: Rect,
    snap: SnapPolicy,
    validator: Box<dyn EdgeValidator>,
}

impl NewEdgeController {
    /// Controller using [`CompositeValidator::standard`].
    pub fn new(snap: SnapPolicy) -> Self {
        Self::with_validator(snap, CompositeValidator::standard())
    }

    pub fn with_validator<V: EdgeValidator + 'static>(snap: SnapPolicy, validator: V) -> Self {
        Self {
            draft: None,
            canvas: Rect::default(),
            snap,
            validator: Box::new(validator),
        }
    }

    pub fn set_validator<V: EdgeValidator + 'static>(&mut self, validator: V) {
        self.validator = Box::new(validator);
    }

    pub fn set_snap_policy(&mut self, snap: SnapPolicy) {
        self.snap = snap;
    }

    pub fn is_active(&self) -> bool {
        self.draft.is_some()
    }

    pub fn draft(&self) -> Option<&EdgeDraft> {
        self.draft.as_ref()
    }

    /// Begin a drag from a port. Returns `false` and stays idle when the
    /// node is not in `snapshot`.
    pub fn start(&mut self, snapshot: &Snapshot, start: NewEdgeStart, canvas: Rect) -> bool {
        if snapshot.node(&start.node_id).is_none() {
            tracing::debug!(node_id = %start.node_id, "edge drag from unknown node ignored");
            return false;
        }

        self.canvas = canvas;
        let pointer = client_to_canvas(start.client, &canvas);
        let anchor = EdgeEndpoint::new(start.node_id, start.index);
        tracing::trace!(node_id = %anchor.node_id, index = anchor.index, direction = ?start.direction, "edge drag start");

        self.draft = Some(match start.direction {
            EdgeDirection::Outbound => EdgeDraft::Outbound {
                source: anchor,
                target: pointer,
            },
            EdgeDirection::Inbound => EdgeDraft::Inbound {
                source: pointer,
                target: anchor,
            },
        });
        true
    }

    /// Move the floating end. Returns `false` when no drag is active.
    pub fn update(&mut self, client: Point) -> bool {
        let Some(draft) = &self.draft else {
            return false;
        };
        let next = draft.with_floating(client_to_canvas(client, &self.canvas));
        self.draft = Some(next);
        true
    }

    /// Nearest port the floating end would snap to.
    pub fn nearest_target(&self, snapshot: &Snapshot) -> Option<NearestTarget> {
        self.target_for(self.draft.as_ref()?, snapshot)
    }

    /// The edge that releasing now would create.
    pub fn candidate_edge(&self, snapshot: &Snapshot) -> Option<Edge> {
        self.candidate_for(self.draft.as_ref()?, snapshot)
    }

    /// Validate the current candidate. `None` when there is no candidate.
    pub fn validate(&self, snapshot: &Snapshot, plugins: &PluginRegistry) -> Option<ValidationResult> {
        let candidate = self.candidate_edge(snapshot)?;
        Some(self.check(&candidate, snapshot, plugins))
    }

    fn target_for(&self, draft: &EdgeDraft, snapshot: &Snapshot) -> Option<NearestTarget> {
        let pointer = draft.floating();
        let nearest = nearest_node(&snapshot.nodes, pointer)?;
        let port = nearest_port(nearest.node, draft.direction(), pointer, &self.snap)?;

        Some(NearestTarget {
            node_id: nearest.node.node_id.clone(),
            index: port.index,
            direction: draft.direction(),
        })
    }

    fn candidate_for(&self, draft: &EdgeDraft, snapshot: &Snapshot) -> Option<Edge> {
        let target = self.target_for(draft, snapshot)?;
        let terminal = EdgeEndpoint::new(target.node_id, target.index);

        Some(match draft {
            EdgeDraft::Outbound { source, .. } => Edge::new(source.clone(), terminal),
            EdgeDraft::Inbound { target, .. } => Edge::new(terminal, target.clone()),
        })
    }

    fn check(&self, candidate: &Edge, snapshot: &Snapshot, plugins: &PluginRegistry) -> ValidationResult {
        let ctx = ValidationContext::new(&snapshot.nodes, &snapshot.edges, plugins);
        self.validator.validate(candidate, &ctx)
    }

    /// Whether releasing now would create an edge.
    pub fn is_connectable(&self, snapshot: &Snapshot, plugins: &PluginRegistry) -> bool {
        self.validate(snapshot, plugins)
            .map_or(false, |result| result.is_valid())
    }

    /// Curve from the anchored port to the pointer, for rendering the draft.
    pub fn draft_path(&self, snapshot: &Snapshot, curve: &CurveConfig) -> Option<CubicBezier> {
        let draft = self.draft.as_ref()?;
        let anchor = snapshot.node(&draft.anchor().node_id)?;
        let pointer = draft.floating();
        let floating = NodePosition::at(pointer.x, pointer.y);

        Some(match draft {
            EdgeDraft::Outbound { source, .. } => {
                edge_path_with(Some(source.index), &anchor.position, None, &floating, curve)
            }
            EdgeDraft::Inbound { target, .. } => {
                edge_path_with(None, &floating, Some(target.index), &anchor.position, curve)
            }
        })
    }

    /// Finish the drag, committing the candidate edge if it validates.
    ///
    /// The draft is discarded in every case. Returns whether an edge was
    /// added to `store`.
    pub fn end(&mut self, store: &mut GraphStore) -> bool {
        let Some(draft) = self.draft.take() else {
            return false;
        };

        let snapshot = store.current();
        if snapshot.node(&draft.anchor().node_id).is_none() {
            tracing::debug!(node_id = %draft.anchor().node_id, "anchor node vanished during edge drag");
            return false;
        }

        let Some(edge) = self.candidate_for(&draft, &snapshot) else {
            tracing::trace!("edge drag released without a target");
            return false;
        };
        match self.check(&edge, &snapshot, store.plugins()) {
            ValidationResult::Valid => store.push_edge(edge),
            ValidationResult::Invalid(reason) => {
                tracing::debug!(%reason, "edge not connected");
                false
            }
        }
    }

    /// Abandon the drag without committing.
    pub fn cancel(&mut self) {
        self.draft = None;
    }
}
