//! Widget and layout data model.
//!
//! A [`Widget`] is the canonical, persisted unit of the dashboard.  It owns
//! two placements in grid-cell units: the primary ("desktop") [`Rect`] and an
//! optional secondary ("mobile") one.  Rendering and drag libraries never see
//! widgets directly; they work on a [`LayoutModel`], the Rect-only projection
//! of one [`Surface`].
//!
//! Everything here is a plain value.  Operations that derive new values live
//! in [`layout`](crate::layout).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// A rectangle in grid-cell units.
///
/// Coordinates are signed so that malformed input (negative positions,
/// zero or negative sizes) can be represented and then clamped by
/// [`apply_constraints_to_layout`](crate::layout::apply_constraints_to_layout)
/// instead of being rejected at deserialization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Row just below the rectangle.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    /// Column just right of the rectangle.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// Whether the size and position invariants hold
    /// (`w ≥ 1`, `h ≥ 1`, `x ≥ 0`, `y ≥ 0`).
    pub fn is_well_formed(&self) -> bool {
        self.w >= 1 && self.h >= 1 && self.x >= 0 && self.y >= 0
    }

    /// Whether two rectangles share at least one cell.
    ///
    /// Edge-adjacent rectangles do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}@({},{})", self.w, self.h, self.x, self.y)
    }
}

/// One of the two independent layout contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// The primary layout.
    Desktop,
    /// The secondary layout.
    Mobile,
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Desktop => write!(f, "desktop"),
            Surface::Mobile => write!(f, "mobile"),
        }
    }
}

/// How the secondary layout relates to the primary one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MobileLayoutMode {
    /// Secondary layout is re-derived from the primary on every change.
    #[default]
    Linked,
    /// Secondary layout is edited and persisted on its own.
    Independent,
}

/// A dashboard widget.
///
/// `widget_type` selects the external renderer and the [`GridPolicy`] that
/// constrains the widget's size; `config` is opaque to the grid engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Widget {
    pub id: String,
    #[serde(rename = "type")]
    pub widget_type: String,
    pub layout: Rect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_layout: Option<Rect>,
    #[serde(default)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl Widget {
    /// Create a widget with an empty config and no stored mobile layout.
    pub fn new(id: impl Into<String>, widget_type: impl Into<String>, layout: Rect) -> Self {
        Self {
            id: id.into(),
            widget_type: widget_type.into(),
            layout,
            mobile_layout: None,
            config: serde_json::Map::new(),
        }
    }

    /// The rectangle this widget occupies on `surface`.
    ///
    /// A widget without a stored mobile layout falls back to its primary
    /// layout on the mobile surface.
    pub fn rect_for(&self, surface: Surface) -> Rect {
        match surface {
            Surface::Desktop => self.layout,
            Surface::Mobile => self.mobile_layout.unwrap_or(self.layout),
        }
    }

    /// Replace the rectangle for `surface`, returning the updated widget.
    pub fn with_rect(mut self, surface: Surface, rect: Rect) -> Self {
        match surface {
            Surface::Desktop => self.layout = rect,
            Surface::Mobile => self.mobile_layout = Some(rect),
        }
        self
    }
}

/// Largest row, column, width, or height a clamped rectangle may have.
///
/// Keeps every sum of coordinates far from `i32` overflow, however many
/// widgets are stacked.
pub const MAX_CELLS: i32 = 10_000;

/// Per-widget-type size constraints supplied by the widget registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GridPolicy {
    pub min_w: i32,
    pub min_h: i32,
    pub max_w: i32,
    pub max_h: i32,
    pub default_w: i32,
    pub default_h: i32,
}

impl Default for GridPolicy {
    fn default() -> Self {
        Self {
            min_w: 1,
            min_h: 1,
            max_w: i32::MAX,
            max_h: i32::MAX,
            default_w: 2,
            default_h: 2,
        }
    }
}

impl GridPolicy {
    /// A copy with every bound forced into a usable shape: minimums at
    /// least 1, maximums at least the minimums and at most [`MAX_CELLS`],
    /// defaults inside the bounds.
    ///
    /// Registries are external; a nonsensical policy must still produce a
    /// valid rectangle.
    pub fn sanitized(&self) -> Self {
        let min_w = self.min_w.clamp(1, MAX_CELLS);
        let min_h = self.min_h.clamp(1, MAX_CELLS);
        let max_w = self.max_w.clamp(min_w, MAX_CELLS);
        let max_h = self.max_h.clamp(min_h, MAX_CELLS);
        Self {
            min_w,
            min_h,
            max_w,
            max_h,
            default_w: self.default_w.clamp(min_w, max_w),
            default_h: self.default_h.clamp(min_h, max_h),
        }
    }
}

/// One Rect keyed by widget id, as a drag/render library sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutItem {
    #[serde(rename = "i")]
    pub id: String,
    #[serde(flatten)]
    pub rect: Rect,
}

impl LayoutItem {
    pub fn new(id: impl Into<String>, rect: Rect) -> Self {
        Self {
            id: id.into(),
            rect,
        }
    }
}

/// The ordered Rect-only projection of one surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutModel {
    pub surface: Surface,
    pub items: Vec<LayoutItem>,
}

impl LayoutModel {
    pub fn new(surface: Surface, items: Vec<LayoutItem>) -> Self {
        Self { surface, items }
    }

    /// Look up the rectangle for `id`.
    pub fn get(&self, id: &str) -> Option<&Rect> {
        self.items.iter().find(|i| i.id == id).map(|i| &i.rect)
    }

    /// Number of items in the model.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the model has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// First row below every item (0 for an empty model).
    pub fn bottom(&self) -> i32 {
        self.items.iter().map(|i| i.rect.bottom()).max().unwrap_or(0)
    }
}

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a fresh widget id.
///
/// Combines a process-wide counter with a random v4 UUID, so ids are unique
/// within a process even if the random source were to repeat and unique
/// across processes with overwhelming probability.
pub fn generate_widget_id() -> String {
    let n = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("widget-{}-{}", n, Uuid::new_v4().simple())
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn adjacent_rects_do_not_overlap() {
        let a = Rect::new(0, 0, 2, 2);
        assert!(!a.overlaps(&Rect::new(2, 0, 2, 2)));
        assert!(!a.overlaps(&Rect::new(0, 2, 2, 2)));
        assert!(a.overlaps(&Rect::new(1, 1, 2, 2)));
    }

    #[test]
    fn contained_rect_overlaps() {
        let outer = Rect::new(0, 0, 6, 6);
        assert!(outer.overlaps(&Rect::new(2, 2, 1, 1)));
        assert!(Rect::new(2, 2, 1, 1).overlaps(&outer));
    }

    #[test]
    fn well_formed_rejects_negative_and_empty() {
        assert!(Rect::new(0, 0, 1, 1).is_well_formed());
        assert!(!Rect::new(-1, 0, 1, 1).is_well_formed());
        assert!(!Rect::new(0, 0, 0, 1).is_well_formed());
        assert!(!Rect::new(0, 0, 1, -3).is_well_formed());
    }

    #[test]
    fn mobile_rect_falls_back_to_primary() {
        let w = Widget::new("a", "clock", Rect::new(3, 4, 2, 2));
        assert_eq!(w.rect_for(Surface::Mobile), Rect::new(3, 4, 2, 2));
        let w = w.with_rect(Surface::Mobile, Rect::new(0, 0, 1, 2));
        assert_eq!(w.rect_for(Surface::Mobile), Rect::new(0, 0, 1, 2));
        assert_eq!(w.rect_for(Surface::Desktop), Rect::new(3, 4, 2, 2));
    }

    #[test]
    fn widget_json_uses_wire_names() {
        let json = r#"{
            "id": "w1",
            "type": "plex-now-playing",
            "layout": {"x": 0, "y": 1, "w": 4, "h": 3},
            "mobileLayout": {"x": 0, "y": 0, "w": 1, "h": 3},
            "config": {"server": "living-room"}
        }"#;
        let w: Widget = serde_json::from_str(json).unwrap();
        assert_eq!(w.widget_type, "plex-now-playing");
        assert_eq!(w.mobile_layout, Some(Rect::new(0, 0, 1, 3)));
        assert_eq!(w.config["server"], "living-room");
    }

    #[test]
    fn widget_json_defaults_optional_fields() {
        let json = r#"{"id": "w2", "type": "clock", "layout": {"x": 0, "y": 0, "w": 1, "h": 1}}"#;
        let w: Widget = serde_json::from_str(json).unwrap();
        assert_eq!(w.mobile_layout, None);
        assert!(w.config.is_empty());
    }

    #[test]
    fn layout_item_is_flat_on_the_wire() {
        let item = LayoutItem::new("a", Rect::new(1, 2, 3, 4));
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"i": "a", "x": 1, "y": 2, "w": 3, "h": 4})
        );
    }

    #[test]
    fn sanitized_policy_is_usable() {
        let broken = GridPolicy {
            min_w: 0,
            min_h: -2,
            max_w: -5,
            max_h: 0,
            default_w: 100,
            default_h: -1,
        };
        let p = broken.sanitized();
        assert_eq!((p.min_w, p.min_h), (1, 1));
        assert_eq!((p.max_w, p.max_h), (1, 1));
        assert_eq!((p.default_w, p.default_h), (1, 1));
    }

    #[test]
    fn sanitized_policy_is_bounded() {
        let p = GridPolicy::default().sanitized();
        assert_eq!((p.max_w, p.max_h), (MAX_CELLS, MAX_CELLS));

        let huge = GridPolicy {
            min_w: i32::MAX,
            min_h: i32::MAX,
            ..GridPolicy::default()
        }
        .sanitized();
        assert_eq!((huge.min_w, huge.max_w), (MAX_CELLS, MAX_CELLS));
        assert_eq!(huge.default_h, MAX_CELLS);
    }

    #[test]
    fn generated_ids_are_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_widget_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn model_bottom_of_empty_is_zero() {
        let m = LayoutModel::new(Surface::Desktop, vec![]);
        assert_eq!(m.bottom(), 0);
        assert!(m.is_empty());
    }
}
