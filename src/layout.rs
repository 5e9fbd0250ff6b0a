//! Pure operations over the widget/layout data model.
//!
//! Nothing in this module mutates its input: every function takes borrowed
//! values and returns fresh ones.  All functions are total.  An absent id is
//! a no-op, an out-of-policy rectangle is clamped, and a malformed entry
//! never prevents the rest of the grid from being laid out.
//!
//! # Committing a change
//!
//! A single-widget edit is not committable until it has been passed through
//! the constraint and normalization pipeline:
//!
//! ```text
//! move_widget / resize_widget
//!         │
//!         ▼
//! widgets_to_layout_model ──► apply_constraints_to_layout ──► fit_to_columns
//!                                                                    │
//!              apply_layout_to_widgets ◄──── normalize_layout ◄──────┘
//! ```
//!
//! [`commit_surface`] runs that pipeline in one call.

use crate::traits::PolicyRegistry;
use crate::widget::{LayoutItem, LayoutModel, Rect, Surface, Widget, MAX_CELLS};
use log::debug;
use std::collections::{HashMap, HashSet};

//  Widget array edits

/// Append `widget`.
///
/// Returns the input unchanged if a widget with the same id already exists.
pub fn add_widget(widgets: &[Widget], widget: Widget) -> Vec<Widget> {
    if get_widget_by_id(widgets, &widget.id).is_some() {
        debug!("add_widget: id {} already present, ignoring", widget.id);
        return widgets.to_vec();
    }
    let mut out = widgets.to_vec();
    out.push(widget);
    out
}

/// Remove the widget with `id`; no-op if absent.
pub fn delete_widget(widgets: &[Widget], id: &str) -> Vec<Widget> {
    widgets.iter().filter(|w| w.id != id).cloned().collect()
}

/// Replace the rectangle of widget `id` on `surface`; no-op if absent.
///
/// The result is not committed until it has gone through
/// [`apply_constraints_to_layout`] (see [`commit_surface`]).
pub fn move_widget(widgets: &[Widget], surface: Surface, id: &str, rect: Rect) -> Vec<Widget> {
    widgets
        .iter()
        .map(|w| {
            if w.id == id {
                w.clone().with_rect(surface, rect)
            } else {
                w.clone()
            }
        })
        .collect()
}

/// Resizing is a rectangle replacement just like a move; the distinction
/// only matters to callers that log or label history entries.
pub fn resize_widget(widgets: &[Widget], surface: Surface, id: &str, rect: Rect) -> Vec<Widget> {
    move_widget(widgets, surface, id, rect)
}

/// Find a widget by id.
pub fn get_widget_by_id<'a>(widgets: &'a [Widget], id: &str) -> Option<&'a Widget> {
    widgets.iter().find(|w| w.id == id)
}

//  Projections

/// Project widgets onto the Rect-only items of one surface.
pub fn widgets_to_layout_items(widgets: &[Widget], surface: Surface) -> Vec<LayoutItem> {
    widgets
        .iter()
        .map(|w| LayoutItem::new(w.id.clone(), w.rect_for(surface)))
        .collect()
}

/// Project widgets onto a [`LayoutModel`] for one surface.
pub fn widgets_to_layout_model(widgets: &[Widget], surface: Surface) -> LayoutModel {
    LayoutModel::new(surface, widgets_to_layout_items(widgets, surface))
}

/// Merge the rectangles of `model` back into `widgets` by id.
///
/// Widgets absent from the model are left untouched; items whose id has no
/// widget are ignored.
pub fn apply_layout_to_widgets(widgets: &[Widget], model: &LayoutModel) -> Vec<Widget> {
    let rects: HashMap<&str, Rect> = model
        .items
        .iter()
        .map(|i| (i.id.as_str(), i.rect))
        .collect();
    widgets
        .iter()
        .map(|w| match rects.get(w.id.as_str()) {
            Some(rect) => w.clone().with_rect(model.surface, *rect),
            None => w.clone(),
        })
        .collect()
}

//  Constraints

/// Clamp one rectangle into `policy` and the non-negative quadrant.
///
/// Positions are capped at [`MAX_CELLS`], as are sizes through the
/// sanitized policy.
pub fn clamp_rect(rect: Rect, policy: &crate::widget::GridPolicy) -> Rect {
    let p = policy.sanitized();
    Rect {
        x: rect.x.clamp(0, MAX_CELLS),
        y: rect.y.clamp(0, MAX_CELLS),
        w: rect.w.clamp(p.min_w, p.max_w),
        h: rect.h.clamp(p.min_h, p.max_h),
    }
}

/// Clamp every item of `model` to the policy of its widget's type.
///
/// Items whose id is not in `widgets` have no known type and are clamped to
/// the registry's fallback policy.
pub fn apply_constraints_to_layout<P: PolicyRegistry + ?Sized>(
    model: &LayoutModel,
    widgets: &[Widget],
    registry: &P,
) -> LayoutModel {
    let types: HashMap<&str, &str> = widgets
        .iter()
        .map(|w| (w.id.as_str(), w.widget_type.as_str()))
        .collect();
    let items = model
        .items
        .iter()
        .map(|item| {
            let policy = match types.get(item.id.as_str()) {
                Some(t) => registry.policy(t),
                None => registry.fallback_policy(),
            };
            let rect = clamp_rect(item.rect, &policy);
            if rect != item.rect {
                debug!("clamped {} from {} to {}", item.id, item.rect, rect);
            }
            LayoutItem::new(item.id.clone(), rect)
        })
        .collect();
    LayoutModel::new(model.surface, items)
}

//  Collision handling

/// Whether `rect` overlaps any of `placed`; returns the earliest row at which
/// one of the colliders ends.
fn first_collision_bottom(rect: &Rect, placed: &[LayoutItem]) -> Option<i32> {
    placed
        .iter()
        .filter(|p| p.rect.overlaps(rect))
        .map(|p| p.rect.bottom())
        .min()
}

/// Items sorted by `(y, x)`, stable for ties.
fn sorted_by_position(items: &[LayoutItem]) -> Vec<LayoutItem> {
    let mut sorted = items.to_vec();
    sorted.sort_by_key(|i| (i.rect.y, i.rect.x));
    sorted
}

/// Resolve overlaps by pushing items down.
///
/// Items are visited in `(y, x)` order; an item that overlaps an already
/// placed one moves down to the first row where it no longer overlaps
/// anything placed.  The result is returned in `(y, x)` order, which makes
/// the operation idempotent.
pub fn normalize_layout(model: &LayoutModel) -> LayoutModel {
    let mut placed: Vec<LayoutItem> = Vec::with_capacity(model.items.len());
    for item in sorted_by_position(&model.items) {
        let mut rect = item.rect;
        while let Some(bottom) = first_collision_bottom(&rect, &placed) {
            rect.y = bottom;
        }
        if rect != item.rect {
            debug!("normalize: pushed {} from row {} to {}", item.id, item.rect.y, rect.y);
        }
        placed.push(LayoutItem::new(item.id, rect));
    }
    LayoutModel::new(model.surface, sorted_by_position(&placed))
}

/// Whether `a` and `b` share at least one column.
fn shares_columns(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() && b.x < a.right()
}

/// Float every item up to the highest row where it fits.
///
/// Items are visited in `(y, x)` order and an item lands just below the
/// lowest already placed item in its columns, or on row 0.
/// Overlapping input is normalized first.
pub fn compact_layout(model: &LayoutModel) -> LayoutModel {
    let normalized = normalize_layout(model);
    let mut placed: Vec<LayoutItem> = Vec::with_capacity(normalized.items.len());
    for item in normalized.items {
        let landing = placed
            .iter()
            .filter(|p| shares_columns(&p.rect, &item.rect))
            .map(|p| p.rect.bottom())
            .max()
            .unwrap_or(0);
        let rect = Rect {
            y: landing.min(item.rect.y),
            ..item.rect
        };
        placed.push(LayoutItem::new(item.id, rect));
    }
    LayoutModel::new(model.surface, sorted_by_position(&placed))
}

/// True iff every rectangle is well formed and no two overlap.
pub fn validate_layout(model: &LayoutModel) -> bool {
    let items = &model.items;
    if !items.iter().all(|i| i.rect.is_well_formed()) {
        return false;
    }
    for (n, a) in items.iter().enumerate() {
        if items[n + 1..].iter().any(|b| a.rect.overlaps(&b.rect)) {
            return false;
        }
    }
    true
}

/// Position for a new `w × h` widget: column 0, below everything else.
pub fn place_new_widget(model: &LayoutModel, w: i32, h: i32) -> Rect {
    Rect::new(0, model.bottom(), w, h)
}

/// Keep every item inside a grid `columns` wide.
///
/// Items wider than the grid shrink to its width; items hanging off the
/// right edge slide left.  Runs after policy clamping, so a policy minimum
/// wider than the grid still loses to the grid.
pub fn fit_to_columns(model: &LayoutModel, columns: i32) -> LayoutModel {
    let columns = columns.max(1);
    let items = model
        .items
        .iter()
        .map(|item| {
            let w = item.rect.w.min(columns);
            let x = item.rect.x.min(columns - w);
            LayoutItem::new(item.id.clone(), Rect { x, w, ..item.rect })
        })
        .collect();
    LayoutModel::new(model.surface, items)
}

/// Run the commit pipeline for one surface: constraints, column fit, then
/// normalization, then merge back into the widget array.
pub fn commit_surface<P: PolicyRegistry + ?Sized>(
    widgets: &[Widget],
    surface: Surface,
    registry: &P,
    columns: i32,
) -> Vec<Widget> {
    let model = widgets_to_layout_model(widgets, surface);
    let constrained = apply_constraints_to_layout(&model, widgets, registry);
    let fitted = fit_to_columns(&constrained, columns);
    let normalized = normalize_layout(&fitted);
    apply_layout_to_widgets(widgets, &normalized)
}

//  Mobile derivation

/// Re-flow the primary layout into a single stacked column.
///
/// Every widget spans the full `columns` width, keeps its primary height
/// (capped at [`MAX_CELLS`]), and is stacked in primary `(y, x)` order (ties
/// broken by id so the output does not depend on input order).
pub fn derive_linked_mobile_layout(primary: &LayoutModel, columns: i32) -> LayoutModel {
    let columns = columns.max(1);
    let mut ordered: Vec<&LayoutItem> = primary.items.iter().collect();
    ordered.sort_by(|a, b| {
        (a.rect.y, a.rect.x, a.id.as_str()).cmp(&(b.rect.y, b.rect.x, b.id.as_str()))
    });
    let mut y = 0;
    let items = ordered
        .into_iter()
        .map(|item| {
            let h = item.rect.h.clamp(1, MAX_CELLS);
            let rect = Rect::new(0, y, columns, h);
            y = rect.bottom();
            LayoutItem::new(item.id.clone(), rect)
        })
        .collect();
    LayoutModel::new(Surface::Mobile, items)
}

/// Discard every stored mobile layout and replace it with one derived from
/// the primary layout.
pub fn snapshot_to_mobile_layout(widgets: &[Widget], columns: i32) -> Vec<Widget> {
    let primary = widgets_to_layout_model(widgets, Surface::Desktop);
    let mobile = derive_linked_mobile_layout(&primary, columns);
    let cleared: Vec<Widget> = widgets
        .iter()
        .map(|w| Widget {
            mobile_layout: None,
            ..w.clone()
        })
        .collect();
    apply_layout_to_widgets(&cleared, &mobile)
}

//  Diffing

/// Whether two widget arrays differ in any widget (order-insensitive).
pub fn is_different(a: &[Widget], b: &[Widget]) -> bool {
    !get_changed_widget_ids(a, b).is_empty()
}

/// Ids that were added, removed, or changed between `a` and `b`.
///
/// Ids are reported in the order they appear in `b`, followed by ids that
/// only exist in `a`.
pub fn get_changed_widget_ids(a: &[Widget], b: &[Widget]) -> Vec<String> {
    let before: HashMap<&str, &Widget> = a.iter().map(|w| (w.id.as_str(), w)).collect();
    let after: HashSet<&str> = b.iter().map(|w| w.id.as_str()).collect();
    let mut changed: Vec<String> = b
        .iter()
        .filter(|w| before.get(w.id.as_str()).map_or(true, |old| *old != *w))
        .map(|w| w.id.clone())
        .collect();
    changed.extend(
        a.iter()
            .filter(|w| !after.contains(w.id.as_str()))
            .map(|w| w.id.clone()),
    );
    changed
}

/// Whether both arrays hold exactly the same set of widget ids.
pub fn widget_sets_match(a: &[Widget], b: &[Widget]) -> bool {
    let ids_a: HashSet<&str> = a.iter().map(|w| w.id.as_str()).collect();
    let ids_b: HashSet<&str> = b.iter().map(|w| w.id.as_str()).collect();
    a.len() == b.len() && ids_a == ids_b
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::GridPolicy;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn item(id: &str, x: i32, y: i32, w: i32, h: i32) -> LayoutItem {
        LayoutItem::new(id, Rect::new(x, y, w, h))
    }

    fn model(items: Vec<LayoutItem>) -> LayoutModel {
        LayoutModel::new(Surface::Desktop, items)
    }

    fn widget(id: &str, ty: &str, x: i32, y: i32, w: i32, h: i32) -> Widget {
        Widget::new(id, ty, Rect::new(x, y, w, h))
    }

    fn registry() -> HashMap<String, GridPolicy> {
        let mut r = HashMap::new();
        r.insert(
            "clock".to_string(),
            GridPolicy {
                min_w: 2,
                min_h: 1,
                max_w: 4,
                max_h: 3,
                default_w: 2,
                default_h: 2,
            },
        );
        r
    }

    #[test]
    fn add_appends_and_ignores_duplicate_id() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2)];
        let ws = add_widget(&ws, widget("b", "clock", 2, 0, 2, 2));
        assert_eq!(ws.len(), 2);
        let again = add_widget(&ws, widget("b", "other", 9, 9, 1, 1));
        assert_eq!(again, ws);
    }

    #[test]
    fn delete_absent_id_is_noop() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2)];
        assert_eq!(delete_widget(&ws, "missing"), ws);
        assert!(delete_widget(&ws, "a").is_empty());
    }

    #[test]
    fn move_only_touches_requested_surface() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2)];
        let moved = move_widget(&ws, Surface::Mobile, "a", Rect::new(0, 5, 1, 1));
        assert_eq!(moved[0].layout, Rect::new(0, 0, 2, 2));
        assert_eq!(moved[0].mobile_layout, Some(Rect::new(0, 5, 1, 1)));
        assert_eq!(move_widget(&ws, Surface::Desktop, "nope", Rect::new(1, 1, 1, 1)), ws);
    }

    #[test]
    fn projection_round_trips_through_apply() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2), widget("b", "clock", 2, 0, 2, 2)];
        let mut m = widgets_to_layout_model(&ws, Surface::Desktop);
        m.items[1].rect.y = 7;
        let merged = apply_layout_to_widgets(&ws, &m);
        assert_eq!(merged[0], ws[0]);
        assert_eq!(merged[1].layout.y, 7);
    }

    #[test]
    fn apply_leaves_widgets_missing_from_model_untouched() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2), widget("b", "clock", 2, 0, 2, 2)];
        let partial = model(vec![item("b", 5, 5, 1, 1), item("ghost", 0, 0, 1, 1)]);
        let merged = apply_layout_to_widgets(&ws, &partial);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0], ws[0]);
        assert_eq!(merged[1].layout, Rect::new(5, 5, 1, 1));
    }

    #[test]
    fn constraints_clamp_size_and_position() {
        let ws = vec![widget("a", "clock", -3, -1, 10, 0)];
        let m = widgets_to_layout_model(&ws, Surface::Desktop);
        let c = apply_constraints_to_layout(&m, &ws, &registry());
        assert_eq!(c.items[0].rect, Rect::new(0, 0, 4, 1));
    }

    #[test]
    fn unknown_type_uses_fallback_policy() {
        let ws = vec![widget("a", "unheard-of", 0, 0, 0, -4)];
        let m = widgets_to_layout_model(&ws, Surface::Desktop);
        let c = apply_constraints_to_layout(&m, &ws, &registry());
        assert_eq!(c.items[0].rect, Rect::new(0, 0, 1, 1));
    }

    #[test]
    fn normalize_pushes_overlapping_item_down() {
        let m = model(vec![item("a", 0, 0, 2, 2), item("b", 1, 1, 2, 2)]);
        let n = normalize_layout(&m);
        assert_eq!(n.get("a"), Some(&Rect::new(0, 0, 2, 2)));
        assert_eq!(n.get("b"), Some(&Rect::new(1, 2, 2, 2)));
        assert!(validate_layout(&n));
    }

    #[test]
    fn normalize_cascades_pushes() {
        let m = model(vec![
            item("a", 0, 0, 4, 2),
            item("b", 0, 1, 2, 2),
            item("c", 0, 3, 2, 1),
        ]);
        let n = normalize_layout(&m);
        assert_eq!(n.get("b"), Some(&Rect::new(0, 2, 2, 2)));
        assert_eq!(n.get("c"), Some(&Rect::new(0, 4, 2, 1)));
    }

    #[test]
    fn normalize_keeps_non_overlapping_layout() {
        let m = model(vec![item("a", 0, 0, 2, 2), item("b", 2, 0, 2, 2), item("c", 0, 5, 1, 1)]);
        let n = normalize_layout(&m);
        assert_eq!(n, m);
    }

    #[test]
    fn compact_floats_items_up() {
        let m = model(vec![item("a", 0, 0, 2, 2), item("b", 0, 6, 2, 1), item("c", 3, 4, 1, 1)]);
        let c = compact_layout(&m);
        assert_eq!(c.get("b"), Some(&Rect::new(0, 2, 2, 1)));
        assert_eq!(c.get("c"), Some(&Rect::new(3, 0, 1, 1)));
        assert_eq!(compact_layout(&c), c);
    }

    #[test]
    fn validate_detects_overlap_and_bad_sizes() {
        assert!(!validate_layout(&model(vec![item("a", 0, 0, 2, 2), item("b", 1, 1, 1, 1)])));
        assert!(!validate_layout(&model(vec![item("a", 0, 0, 0, 2)])));
        assert!(!validate_layout(&model(vec![item("a", -1, 0, 1, 1)])));
        assert!(validate_layout(&model(vec![])));
    }

    #[test]
    fn new_widget_goes_below_everything() {
        let m = model(vec![item("a", 0, 0, 2, 3), item("b", 4, 1, 2, 4)]);
        assert_eq!(place_new_widget(&m, 2, 2), Rect::new(0, 5, 2, 2));
    }

    #[test]
    fn commit_surface_clamps_then_resolves_collisions() {
        let ws = vec![widget("a", "clock", 0, 0, 2, 2), widget("b", "clock", 0, 0, 1, 9)];
        let committed = commit_surface(&ws, Surface::Desktop, &registry(), 12);
        assert_eq!(committed[1].layout, Rect::new(0, 2, 2, 3));
        assert!(validate_layout(&widgets_to_layout_model(&committed, Surface::Desktop)));
    }

    #[test]
    fn items_are_pulled_inside_the_grid() {
        let m = model(vec![
            item("wide", 3, 0, 20, 1),
            item("overhang", 10, 2, 4, 1),
            item("inside", 2, 4, 3, 1),
        ]);
        let fitted = fit_to_columns(&m, 12);
        assert_eq!(fitted.get("wide"), Some(&Rect::new(0, 0, 12, 1)));
        assert_eq!(fitted.get("overhang"), Some(&Rect::new(8, 2, 4, 1)));
        assert_eq!(fitted.get("inside"), Some(&Rect::new(2, 4, 3, 1)));
    }

    #[test]
    fn linked_mobile_layout_stacks_in_primary_order() {
        let primary = model(vec![
            item("right", 6, 0, 6, 2),
            item("left", 0, 0, 6, 3),
            item("below", 0, 4, 12, 1),
        ]);
        let mobile = derive_linked_mobile_layout(&primary, 2);
        assert_eq!(mobile.surface, Surface::Mobile);
        assert_eq!(
            mobile.items,
            vec![
                item("left", 0, 0, 2, 3),
                item("right", 0, 3, 2, 2),
                item("below", 0, 5, 2, 1),
            ]
        );
        assert!(validate_layout(&mobile));
    }

    #[test]
    fn linked_mobile_layout_is_deterministic() {
        let primary = model(vec![item("b", 0, 0, 2, 2), item("a", 0, 0, 2, 2)]);
        let mut reversed = primary.clone();
        reversed.items.reverse();
        let first = derive_linked_mobile_layout(&primary, 1);
        assert_eq!(first, derive_linked_mobile_layout(&primary, 1));
        assert_eq!(first, derive_linked_mobile_layout(&reversed, 1));
    }

    #[test]
    fn snapshot_to_mobile_replaces_stored_layouts() {
        let ws = vec![
            widget("a", "clock", 0, 0, 4, 2).with_rect(Surface::Mobile, Rect::new(0, 9, 1, 1)),
            widget("b", "clock", 4, 0, 4, 3),
        ];
        let linked = snapshot_to_mobile_layout(&ws, 1);
        assert_eq!(linked[0].mobile_layout, Some(Rect::new(0, 0, 1, 2)));
        assert_eq!(linked[1].mobile_layout, Some(Rect::new(0, 2, 1, 3)));
        assert_eq!(linked[0].layout, ws[0].layout);
    }

    #[test]
    fn diffing_reports_changed_added_and_removed() {
        let a = vec![widget("x", "clock", 0, 0, 1, 1), widget("y", "clock", 1, 0, 1, 1)];
        let mut b = a.clone();
        assert!(!is_different(&a, &b));
        b[1].layout.x = 3;
        b.push(widget("z", "clock", 0, 1, 1, 1));
        b.remove(0);
        assert!(is_different(&a, &b));
        assert_eq!(get_changed_widget_ids(&a, &b), vec!["y", "z", "x"]);
    }

    #[test]
    fn reordering_is_not_a_difference() {
        let a = vec![widget("x", "clock", 0, 0, 1, 1), widget("y", "clock", 1, 0, 1, 1)];
        let b = vec![a[1].clone(), a[0].clone()];
        assert!(!is_different(&a, &b));
        assert!(widget_sets_match(&a, &b));
    }

    #[test]
    fn set_match_ignores_layout_but_not_membership() {
        let a = vec![widget("x", "clock", 0, 0, 1, 1)];
        let moved = vec![widget("x", "clock", 5, 5, 1, 1)];
        assert!(widget_sets_match(&a, &moved));
        assert!(!widget_sets_match(&a, &[]));
        assert!(!widget_sets_match(&a, &[widget("q", "clock", 0, 0, 1, 1)]));
    }

    #[test]
    fn compaction_lifts_far_away_items_in_one_step() {
        let m = model(vec![
            item("a", 0, 0, 1, 1),
            item("b", 5, 300_000_000, 1, 1),
            item("c", 0, i32::MAX - 1, 2, 1),
        ]);
        let c = compact_layout(&m);
        assert_eq!(c.get("b"), Some(&Rect::new(5, 0, 1, 1)));
        assert_eq!(c.get("c"), Some(&Rect::new(0, 1, 2, 1)));
    }

    #[test]
    fn linked_derivation_caps_huge_heights() {
        let half = i32::MAX / 2 + 1;
        let m = model(vec![item("a", 0, 0, 1, half), item("b", 1, 0, 1, half)]);
        let d = derive_linked_mobile_layout(&m, 1);
        assert_eq!(d.get("a"), Some(&Rect::new(0, 0, 1, MAX_CELLS)));
        assert_eq!(d.get("b"), Some(&Rect::new(0, MAX_CELLS, 1, MAX_CELLS)));
        assert!(validate_layout(&d));
    }

    #[test]
    fn huge_stored_rects_are_bounded_by_the_pipeline() {
        let reg: HashMap<String, GridPolicy> = HashMap::new();
        let ws = vec![
            widget("a", "unknown", 0, 0, 1, 1_500_000_000),
            widget("b", "unknown", 1, i32::MAX, 1, 1_500_000_000),
        ];
        let settled = commit_surface(&ws, Surface::Desktop, &reg, 12);
        let desktop = widgets_to_layout_model(&settled, Surface::Desktop);
        assert_eq!(desktop.get("a"), Some(&Rect::new(0, 0, 1, MAX_CELLS)));
        assert_eq!(desktop.get("b"), Some(&Rect::new(1, MAX_CELLS, 1, MAX_CELLS)));
        let linked = snapshot_to_mobile_layout(&settled, 1);
        assert!(validate_layout(&widgets_to_layout_model(&linked, Surface::Mobile)));
    }

    fn arb_model() -> impl Strategy<Value = LayoutModel> {
        prop::collection::vec((0..12i32, 0..20i32, 1..6i32, 1..6i32), 0..16).prop_map(|rects| {
            let items = rects
                .into_iter()
                .enumerate()
                .map(|(n, (x, y, w, h))| item(&format!("w{n}"), x, y, w, h))
                .collect();
            model(items)
        })
    }

    /// Widgets with arbitrary, often malformed, desktop rects.
    fn arb_wild_widgets() -> impl Strategy<Value = Vec<Widget>> {
        prop::collection::vec(
            (any::<i32>(), any::<i32>(), any::<i32>(), any::<i32>()),
            0..12,
        )
        .prop_map(|rects| {
            rects
                .into_iter()
                .enumerate()
                .map(|(n, (x, y, w, h))| widget(&format!("w{n}"), "any", x, y, w, h))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn pipeline_accepts_any_rect(
            ws in arb_wild_widgets(),
            cols in 1..16i32,
            mobile_cols in 1..4i32,
        ) {
            let reg: HashMap<String, GridPolicy> = HashMap::new();
            let settled = commit_surface(&ws, Surface::Desktop, &reg, cols);
            let desktop = widgets_to_layout_model(&settled, Surface::Desktop);
            prop_assert!(validate_layout(&desktop));
            for r in desktop.items.iter().map(|i| i.rect) {
                prop_assert!(r.right() <= cols);
            }

            let compacted = compact_layout(&desktop);
            prop_assert!(validate_layout(&compacted));
            prop_assert_eq!(compact_layout(&compacted), compacted);

            let linked = snapshot_to_mobile_layout(&settled, mobile_cols);
            prop_assert!(validate_layout(&widgets_to_layout_model(&linked, Surface::Mobile)));
        }

        #[test]
        fn normalize_is_idempotent(m in arb_model()) {
            let once = normalize_layout(&m);
            prop_assert_eq!(normalize_layout(&once), once);
        }

        #[test]
        fn normalize_leaves_no_overlaps(m in arb_model()) {
            prop_assert!(validate_layout(&normalize_layout(&m)));
        }

        #[test]
        fn normalize_never_moves_items_up_or_sideways(m in arb_model()) {
            let n = normalize_layout(&m);
            for original in &m.items {
                let after = n.get(&original.id).unwrap();
                prop_assert_eq!(after.x, original.rect.x);
                prop_assert!(after.y >= original.rect.y);
            }
        }

        #[test]
        fn compaction_is_idempotent_and_valid(m in arb_model()) {
            let c = compact_layout(&m);
            prop_assert!(validate_layout(&c));
            prop_assert_eq!(compact_layout(&c), c);
        }

        #[test]
        fn constraints_always_respect_policy(
            x in any::<i32>(), y in any::<i32>(), w in any::<i32>(), h in any::<i32>(),
            min_w in -3..8i32, min_h in -3..8i32, span_w in -3..8i32, span_h in -3..8i32,
        ) {
            let policy = GridPolicy {
                min_w,
                min_h,
                max_w: min_w.saturating_add(span_w),
                max_h: min_h.saturating_add(span_h),
                default_w: 1,
                default_h: 1,
            };
            let mut reg = HashMap::new();
            reg.insert("t".to_string(), policy);
            let ws = resize_widget(&[widget("a", "t", 0, 0, 1, 1)], Surface::Desktop, "a", Rect::new(x, y, w, h));
            let m = widgets_to_layout_model(&ws, Surface::Desktop);
            let r = apply_constraints_to_layout(&m, &ws, &reg).items[0].rect;
            let p = policy.sanitized();
            prop_assert!(r.w >= p.min_w && r.w <= p.max_w);
            prop_assert!(r.h >= p.min_h && r.h <= p.max_h);
            prop_assert!(r.x >= 0 && r.y >= 0);
            prop_assert!(r.is_well_formed());
        }

        #[test]
        fn linked_derivation_is_valid_and_deterministic(m in arb_model(), cols in 1..4i32) {
            let a = derive_linked_mobile_layout(&m, cols);
            prop_assert!(validate_layout(&a));
            prop_assert_eq!(a, derive_linked_mobile_layout(&m, cols));
        }
    }
}
