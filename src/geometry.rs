//! Pure geometry: nearest node/port search, edge curves and edge hit-testing.
//!
//! Nothing in here holds state. All coordinates are canvas-local.

use serde::{Deserialize, Serialize};

use crate::model::{Node, NodePosition, Point, Snapshot};

/// Which way an in-progress edge was dragged out of its anchor port.
///
/// An outbound drag starts at an output port and must land on an input;
/// an inbound drag starts at an input and must land on an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeDirection {
    Outbound,
    Inbound,
}

/// Snap behaviour for port search.
///
/// Without `max_distance` the nearest port always wins.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapPolicy {
    pub max_distance: Option<f32>,
}

impl SnapPolicy {
    pub fn unlimited() -> Self {
        Self { max_distance: None }
    }

    pub fn within(max_distance: f32) -> Self {
        Self {
            max_distance: Some(max_distance),
        }
    }

    fn accepts(&self, distance: f32) -> bool {
        self.max_distance.map_or(true, |max| distance <= max)
    }
}

/// Shape parameters for edge curves.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Horizontal control offset once the gap exceeds the transition band.
    pub min_offset: f32,
    /// Horizontal control offset when the target sits left of the source.
    pub max_offset: f32,
    /// Cap on the vertical control offset.
    pub max_vertical_offset: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            min_offset: 40.0,
            max_offset: 120.0,
            max_vertical_offset: 40.0,
        }
    }
}

/// Result of [`nearest_node`].
#[derive(Debug, Clone, Copy)]
pub struct NearestNode<'a> {
    pub node: &'a Node,
    pub distance: f32,
}

/// Result of [`nearest_port`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearestPort {
    pub index: usize,
    pub distance: f32,
}

/// Find the node whose rectangle is closest to `point`.
///
/// The point is clamped into each rectangle, so any point inside a node has
/// distance zero. Ties go to the node listed first.
pub fn nearest_node(nodes: &[Node], point: Point) -> Option<NearestNode<'_>> {
    let mut closest: Option<NearestNode<'_>> = None;

    for node in nodes {
        let (x, y, w, h) = node.position.rect();
        let clamped = Point::new(point.x.max(x).min(x + w), point.y.max(y).min(y + h));
        let distance = clamped.distance_to(point);

        if closest.map_or(true, |c| distance < c.distance) {
            closest = Some(NearestNode { node, distance });
        }
    }

    closest
}

/// Find the port on `node` an in-progress edge would snap to.
///
/// Outbound drags consider the node's input ports (left edge), inbound drags
/// its output ports (right edge). Returns `None` if the node has no measured
/// ports of that kind or the nearest one is beyond the snap threshold.
pub fn nearest_port(
    node: &Node,
    direction: EdgeDirection,
    point: Point,
    policy: &SnapPolicy,
) -> Option<NearestPort> {
    let position = &node.position;
    let (centers, port_x) = match direction {
        EdgeDirection::Outbound => (position.input_centers.as_deref(), position.x),
        EdgeDirection::Inbound => (
            position.output_centers.as_deref(),
            position.x + position.width.unwrap_or(0.0),
        ),
    };

    let mut closest: Option<NearestPort> = None;
    for (index, center) in centers.unwrap_or_default().iter().enumerate() {
        let distance = Point::new(port_x, position.y + center).distance_to(point);
        if closest.map_or(true, |c| distance < c.distance) {
            closest = Some(NearestPort { index, distance });
        }
    }

    closest.filter(|port| policy.accepts(port.distance))
}

/// Cubic bezier curve used for edge rendering and hit-testing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicBezier {
    pub p0: (f32, f32), // Start point
    pub p1: (f32, f32), // Control point 1
    pub p2: (f32, f32), // Control point 2
    pub p3: (f32, f32), // End point
}

impl CubicBezier {
    /// Evaluate the bezier curve at parameter t (0.0 to 1.0)
    pub fn eval(&self, t: f32) -> (f32, f32) {
        let t2 = t * t;
        let t3 = t2 * t;
        let mt = 1.0 - t;
        let mt2 = mt * mt;
        let mt3 = mt2 * mt;

        let x = mt3 * self.p0.0
            + 3.0 * mt2 * t * self.p1.0
            + 3.0 * mt * t2 * self.p2.0
            + t3 * self.p3.0;
        let y = mt3 * self.p0.1
            + 3.0 * mt2 * t * self.p1.1
            + 3.0 * mt * t2 * self.p2.1
            + t3 * self.p3.1;

        (x, y)
    }

    /// SVG path command, e.g. `"M 100 25 C 140 -15, 160 165, 200 125"`.
    pub fn to_svg(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.p0.0,
            self.p0.1,
            self.p1.0,
            self.p1.1,
            self.p2.0,
            self.p2.1,
            self.p3.0,
            self.p3.1
        )
    }
}

/// Curve from the output side of `source` to the input side of `target`,
/// using the default [`CurveConfig`].
pub fn edge_path(
    source_index: Option<usize>,
    source: &NodePosition,
    target_index: Option<usize>,
    target: &NodePosition,
) -> CubicBezier {
    edge_path_with(source_index, source, target_index, target, &CurveConfig::default())
}

/// Curve from the right edge of `source` (at output port `source_index`) to
/// the left edge of `target` (at input port `target_index`).
///
/// A missing index or unmeasured port anchors at the node's top edge. The
/// horizontal control offset is `max_offset` when the target is left of the
/// source and falls linearly to `min_offset` across a band of
/// `max_offset - min_offset` units of gap. The vertical control offset is the
/// vertical gap capped at `max_vertical_offset`, signed so the curve bows
/// away from the straight line.
pub fn edge_path_with(
    source_index: Option<usize>,
    source: &NodePosition,
    target_index: Option<usize>,
    target: &NodePosition,
    curve: &CurveConfig,
) -> CubicBezier {
    let x1 = source.x + source.width.unwrap_or(0.0);
    let y1 = source.y + source_index.and_then(|i| source.output_center(i)).unwrap_or(0.0);
    let x2 = target.x;
    let y2 = target.y + target_index.and_then(|i| target.input_center(i)).unwrap_or(0.0);

    let y_gap = (y1 - y2).abs().min(curve.max_vertical_offset);
    let control_y = if y1 > y2 { y_gap } else { -y_gap };

    let band = curve.max_offset - curve.min_offset;
    let x_gap = x2 - x1;
    let control_x = if x_gap > 0.0 {
        curve.min_offset + (band - x_gap).max(0.0)
    } else {
        curve.max_offset
    };

    CubicBezier {
        p0: (x1, y1),
        p1: (x1 + control_x, y1 - control_y),
        p2: (x2 - control_x, y2 + control_y),
        p3: (x2, y2),
    }
}

/// Calculate squared distance from a point to a line segment
fn distance_to_line_segment_sq(point: (f32, f32), a: (f32, f32), b: (f32, f32)) -> f32 {
    let ab = (b.0 - a.0, b.1 - a.1);
    let ap = (point.0 - a.0, point.1 - a.1);

    let ab_len_sq = ab.0 * ab.0 + ab.1 * ab.1;

    if ab_len_sq < f32::EPSILON {
        return ap.0 * ap.0 + ap.1 * ap.1;
    }

    let t = ((ap.0 * ab.0 + ap.1 * ab.1) / ab_len_sq).clamp(0.0, 1.0);
    let closest = (a.0 + t * ab.0, a.1 + t * ab.1);

    let dx = point.0 - closest.0;
    let dy = point.1 - closest.1;
    dx * dx + dy * dy
}

/// Minimum distance from a point to a cubic bezier curve, approximated by
/// `num_samples` line segments (0 means 20).
pub fn distance_to_bezier(point: (f32, f32), bezier: &CubicBezier, num_samples: usize) -> f32 {
    let num_samples = if num_samples == 0 { 20 } else { num_samples };

    let mut min_dist_sq = f32::MAX;
    let mut prev_point = bezier.eval(0.0);

    for i in 1..=num_samples {
        let t = i as f32 / num_samples as f32;
        let curr_point = bezier.eval(t);

        let dist_sq = distance_to_line_segment_sq(point, prev_point, curr_point);
        if dist_sq < min_dist_sq {
            min_dist_sq = dist_sq;
        }

        prev_point = curr_point;
    }

    min_dist_sq.sqrt()
}

/// Parameters for [`find_edge_at`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeHitConfig {
    pub hover_distance: f32,
    pub samples: usize,
}

impl Default for EdgeHitConfig {
    fn default() -> Self {
        Self {
            hover_distance: 8.0,
            samples: 20,
        }
    }
}

/// Index of the edge whose curve passes closest to `point`, if any is
/// within `hit.hover_distance`. Dangling edges are skipped.
pub fn find_edge_at(
    snapshot: &Snapshot,
    point: Point,
    hit: &EdgeHitConfig,
    curve: &CurveConfig,
) -> Option<usize> {
    let records = snapshot.node_records();
    let mut closest: Option<(usize, f32)> = None;

    for (index, edge) in snapshot.edges.iter().enumerate() {
        let (Some(source), Some(target)) = (
            records.get(edge.source.node_id.as_str()),
            records.get(edge.target.node_id.as_str()),
        ) else {
            continue;
        };

        let bezier = edge_path_with(
            Some(edge.source.index),
            &source.position,
            Some(edge.target.index),
            &target.position,
            curve,
        );
        let distance = distance_to_bezier((point.x, point.y), &bezier, hit.samples);

        if distance <= hit.hover_distance && closest.map_or(true, |(_, d)| distance < d) {
            closest = Some((index, distance));
        }
    }

    closest.map(|(index, _)| index)
}
