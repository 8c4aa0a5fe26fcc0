//! Canvas panning and wheel scrolling.
//!
//! [`PanController`] is a two-state machine (`idle`/`panning`). It never
//! touches a scroll container itself: it takes pointer positions and the
//! scroll state from the rendering layer and hands back the scroll offsets
//! to apply.

use serde::{Deserialize, Serialize};

use crate::model::Point;
use crate::tracking::Rect;

/// Convert a client-space pointer position into canvas-local coordinates.
pub fn client_to_canvas(client: Point, canvas: &Rect) -> Point {
    Point::new(client.x - canvas.left, client.y - canvas.top)
}

/// Form controls that keep pointer input for themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Button,
    Input,
    Select,
    TextArea,
}

/// What a pointer-down landed on, as hit-tested by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas background.
    Canvas,
    /// A node or anything inside one.
    Node,
    /// An edge.
    Edge,
    Control(ControlKind),
}

impl PointerTarget {
    /// Whether the target handles the pointer itself, so panning must not start.
    pub fn is_interactive(&self) -> bool {
        !matches!(self, PointerTarget::Canvas)
    }
}

/// Gestures owned by other state machines that block panning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InteractionFlags {
    pub node_dragging: bool,
    pub edge_creating: bool,
}

/// Scroll offset of the canvas container.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScrollOffset {
    pub left: f32,
    pub top: f32,
}

impl ScrollOffset {
    pub fn new(left: f32, top: f32) -> Self {
        Self { left, top }
    }
}

/// Scroll offset plus content and viewport sizes, for wheel handling.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScrollExtent {
    pub offset: ScrollOffset,
    pub content_width: f32,
    pub content_height: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
}

impl ScrollExtent {
    fn max_left(&self) -> f32 {
        (self.content_width - self.viewport_width).max(0.0)
    }

    fn max_top(&self) -> f32 {
        (self.content_height - self.viewport_height).max(0.0)
    }
}

/// Outcome of a pointer-down for panning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PanStart {
    /// Panning began; the caller should consume the event.
    pub started: bool,
    /// A focused text area should lose focus.
    pub blur_focused_text: bool,
}

/// Outcome of a wheel event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelOutcome {
    /// Consume the event and move to this offset.
    Scroll(ScrollOffset),
    /// Leave the event to the default handler (page scroll, text area scroll).
    PassThrough,
}

#[derive(Debug, Clone, Copy)]
struct PanGesture {
    pointer: Point,
    scroll: ScrollOffset,
}

/// Pan state machine.
#[derive(Debug, Default)]
pub struct PanController {
    gesture: Option<PanGesture>,
}

impl PanController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_panning(&self) -> bool {
        self.gesture.is_some()
    }

    /// Handle a pointer-down.
    ///
    /// Panning starts only on the canvas background and only while no node
    /// drag or edge creation is running. `text_focused` reports whether a
    /// text area currently has focus.
    pub fn begin(
        &mut self,
        pointer: Point,
        target: PointerTarget,
        text_focused: bool,
        scroll: ScrollOffset,
        flags: InteractionFlags,
    ) -> PanStart {
        if flags.node_dragging || flags.edge_creating {
            tracing::trace!(?flags, "pan blocked by active gesture");
            return PanStart::default();
        }
        if target.is_interactive() {
            return PanStart::default();
        }

        tracing::trace!(x = pointer.x, y = pointer.y, "pan start");
        self.gesture = Some(PanGesture { pointer, scroll });
        PanStart {
            started: true,
            blur_focused_text: text_focused,
        }
    }

    /// Scroll offset for the current pointer position, measured from the
    /// gesture's start offset. `None` when not panning.
    pub fn update(&self, pointer: Point) -> Option<ScrollOffset> {
        let gesture = self.gesture?;
        Some(ScrollOffset {
            left: gesture.scroll.left - (pointer.x - gesture.pointer.x),
            top: gesture.scroll.top - (pointer.y - gesture.pointer.y),
        })
    }

    /// Finish the gesture. Returns whether a pan was active.
    pub fn end(&mut self) -> bool {
        self.gesture.take().is_some()
    }

    /// Handle a wheel event.
    ///
    /// Only the axis with the larger delta scrolls. When that axis is already
    /// at its limit in the wheel direction, or the wheel is over a text area,
    /// the event passes through.
    pub fn wheel(&self, delta: Point, over_text_area: bool, extent: &ScrollExtent) -> WheelOutcome {
        if over_text_area {
            return WheelOutcome::PassThrough;
        }

        let offset = extent.offset;
        if delta.x.abs() > delta.y.abs() {
            let max = extent.max_left();
            if (offset.left <= 0.0 && delta.x < 0.0) || (offset.left >= max && delta.x > 0.0) {
                return WheelOutcome::PassThrough;
            }
            WheelOutcome::Scroll(ScrollOffset::new((offset.left + delta.x).clamp(0.0, max), offset.top))
        } else {
            let max = extent.max_top();
            if (offset.top <= 0.0 && delta.y < 0.0) || (offset.top >= max && delta.y > 0.0) {
                return WheelOutcome::PassThrough;
            }
            WheelOutcome::Scroll(ScrollOffset::new(offset.left, (offset.top + delta.y).clamp(0.0, max)))
        }
    }
}
