//! Drag activation adapter.
//!
//! Presents one widget to the external drag library.  The draggable area is
//! an invisible handle inset from every edge of the widget, so the resize
//! affordances the library renders at the corners stay reachable.
//!
//! ```text
//! ┌──────────────────────────┐
//! │ ▚  inset                ▞│  ← corner resize hot zones
//! │   ┌──────────────────┐   │
//! │   │   drag handle    │   │
//! │   └──────────────────┘   │
//! │ ▞                      ▚ │
//! └──────────────────────────┘
//! ```
//!
//! The adapter holds no state of its own.  [`DragHandle::present`] projects
//! the library's dragging flag and the recognizer's [`ActivationState`] onto
//! what the rendering code should show.

use crate::gesture::ActivationState;
use serde::{Deserialize, Serialize};

/// Default inset of the drag handle from each widget edge, in pixels.
pub const DEFAULT_HANDLE_INSET: f64 = 12.0;

/// Opacity of a widget the drag library reports as being dragged.
pub const DRAGGING_OPACITY: f32 = 0.5;

/// A point in rendered pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// A rectangle in rendered pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PixelRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Inclusive point-in-rect test.
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// How the touch surface should treat native panning over the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchAction {
    /// Native scrolling allowed.
    Auto,
    /// Native scrolling disabled; the drag library owns the contact.
    None,
}

/// What rendering code should show for one widget.
#[derive(Debug, Clone, PartialEq)]
pub struct DragPresentation {
    /// Where to place the invisible drag-handle layer, relative to the
    /// widget's own origin.  `None` when the widget is too small to leave
    /// any area after the inset.
    pub handle: Option<PixelRect>,
    pub opacity: f32,
    pub drag_ready: bool,
    pub holding: bool,
    /// Hold feedback in `[0, 1]`; zero unless this widget is being held.
    pub hold_progress: f64,
    pub touch_action: TouchAction,
}

/// The inset drag handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragHandle {
    inset: f64,
}

impl Default for DragHandle {
    fn default() -> Self {
        Self::new(DEFAULT_HANDLE_INSET)
    }
}

impl DragHandle {
    /// Negative insets are treated as zero.
    pub fn new(inset: f64) -> Self {
        Self {
            inset: inset.max(0.0),
        }
    }

    pub fn inset(&self) -> f64 {
        self.inset
    }

    /// The handle area inside `bounds`, in the same coordinate space.
    pub fn handle_rect(&self, bounds: &PixelRect) -> Option<PixelRect> {
        let width = bounds.width - 2.0 * self.inset;
        let height = bounds.height - 2.0 * self.inset;
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        Some(PixelRect::new(
            bounds.x + self.inset,
            bounds.y + self.inset,
            width,
            height,
        ))
    }

    /// Whether `p` lands on the drag handle of a widget occupying `bounds`.
    pub fn hits_handle(&self, bounds: &PixelRect, p: Point) -> bool {
        self.handle_rect(bounds).is_some_and(|h| h.contains(p))
    }

    /// Whether `p` is in one of the four corner squares (side = inset) where
    /// the drag library renders resize affordances.
    pub fn in_resize_zone(&self, bounds: &PixelRect, p: Point) -> bool {
        if self.inset <= 0.0 || !bounds.contains(p) {
            return false;
        }
        let near_vertical_edge =
            p.x - bounds.x < self.inset || (bounds.x + bounds.width) - p.x < self.inset;
        let near_horizontal_edge =
            p.y - bounds.y < self.inset || (bounds.y + bounds.height) - p.y < self.inset;
        near_vertical_edge && near_horizontal_edge
    }

    /// Project the drag state of `widget_id` onto its visuals.
    ///
    /// `size` is the widget's rendered width and height; the returned handle
    /// rectangle is relative to the widget origin.
    pub fn present(
        &self,
        widget_id: &str,
        size: (f64, f64),
        dragging: bool,
        activation: &ActivationState,
    ) -> DragPresentation {
        let drag_ready = activation.drag_ready_widget_id.as_deref() == Some(widget_id);
        let holding = activation.holding_widget_id.as_deref() == Some(widget_id);
        let hold_progress = if drag_ready {
            1.0
        } else if holding {
            activation.hold_progress
        } else {
            0.0
        };
        DragPresentation {
            handle: self.handle_rect(&PixelRect::new(0.0, 0.0, size.0, size.1)),
            opacity: if dragging { DRAGGING_OPACITY } else { 1.0 },
            drag_ready,
            holding,
            hold_progress,
            touch_action: if drag_ready || dragging {
                TouchAction::None
            } else {
                TouchAction::Auto
            },
        }
    }
}

//  Tests
