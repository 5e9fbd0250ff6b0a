//! Bounded per-surface undo/redo history.
//!
//! [`HistoryManager`] keeps one [`HistoryStack`] for each [`Surface`].  The
//! stacks are fully partitioned: nothing done to the mobile history can be
//! observed through the desktop one.
//!
//! ```text
//! push(desktop, s1), push(desktop, s2)
//!   desktop  undo: [s1, s2]   redo: []
//!
//! undo_from(desktop, current=s3)  → returns s2
//!   desktop  undo: [s1]       redo: [s3]
//!
//! push(desktop, s4)            new edit, redo chain invalidated
//!   desktop  undo: [s1, s4]   redo: []
//! ```
//!
//! Snapshots are owned copies of the widget array.  `push` clones what it
//! is given and `undo`/`redo` hand out owned values, so mutating a widget
//! array after pushing it (or after popping it) never reaches back into the
//! stored history.

use crate::widget::{MobileLayoutMode, Surface, Widget};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default maximum entries per stack.
pub const MAX_HISTORY_SIZE: usize = 50;

/// Tuning for the history manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum entries kept in each undo and each redo stack.  Default: `50`.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: MAX_HISTORY_SIZE,
        }
    }
}

/// The full widget set at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub widgets: Vec<Widget>,
    /// Mobile layout mode in effect when the snapshot was taken, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<MobileLayoutMode>,
}

impl HistorySnapshot {
    pub fn new(widgets: &[Widget]) -> Self {
        Self {
            widgets: widgets.to_vec(),
            mode: None,
        }
    }

    /// Tag the snapshot with the mode it was taken in.
    pub fn in_mode(mut self, mode: MobileLayoutMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Undo and redo entries for one surface, oldest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryStack {
    undo: VecDeque<HistorySnapshot>,
    redo: VecDeque<HistorySnapshot>,
}

impl HistoryStack {
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// Append to `stack` and evict from the oldest end past `cap`.
fn push_bounded(stack: &mut VecDeque<HistorySnapshot>, snapshot: HistorySnapshot, cap: usize) {
    stack.push_back(snapshot);
    while stack.len() > cap {
        stack.pop_front();
    }
}

/// Per-surface undo/redo stacks with a re-entrancy guard.
///
/// # Re-entrancy guard
///
/// Applying an undo or redo writes a layout, and layout writes normally
/// record history.  Between [`begin_apply`](Self::begin_apply) and
/// [`end_apply`](Self::end_apply) every [`push`](Self::push) is dropped so
/// that the write is not recorded as a fresh user action.  The owner ends
/// the guard on its next tick, after the write has settled.
#[derive(Debug)]
pub struct HistoryManager {
    desktop: HistoryStack,
    mobile: HistoryStack,
    max_depth: usize,
    applying: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl HistoryManager {
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            desktop: HistoryStack::default(),
            mobile: HistoryStack::default(),
            max_depth: config.max_depth.max(1),
            applying: false,
        }
    }

    /// Maximum entries per stack.
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Read-only view of one surface's stacks.
    pub fn stack(&self, surface: Surface) -> &HistoryStack {
        match surface {
            Surface::Desktop => &self.desktop,
            Surface::Mobile => &self.mobile,
        }
    }

    fn stack_mut(&mut self, surface: Surface) -> &mut HistoryStack {
        match surface {
            Surface::Desktop => &mut self.desktop,
            Surface::Mobile => &mut self.mobile,
        }
    }

    //  Recording

    /// Record a committed action: copy `snapshot` onto the undo stack and
    /// drop the surface's redo chain.
    ///
    /// Ignored while an undo/redo is being applied.
    pub fn push(&mut self, surface: Surface, snapshot: &HistorySnapshot) {
        if self.applying {
            debug!("history push on {} suppressed during apply", surface);
            return;
        }
        let cap = self.max_depth;
        let stack = self.stack_mut(surface);
        push_bounded(&mut stack.undo, snapshot.clone(), cap);
        stack.redo.clear();
    }

    /// Copy `snapshot` onto the undo stack without touching the redo stack.
    pub fn push_to_undo(&mut self, surface: Surface, snapshot: &HistorySnapshot) {
        let cap = self.max_depth;
        push_bounded(&mut self.stack_mut(surface).undo, snapshot.clone(), cap);
    }

    /// Copy `snapshot` onto the redo stack.
    pub fn push_to_redo(&mut self, surface: Surface, snapshot: &HistorySnapshot) {
        let cap = self.max_depth;
        push_bounded(&mut self.stack_mut(surface).redo, snapshot.clone(), cap);
    }

    //  Stepping

    /// Pop the most recent undo entry.
    ///
    /// The caller owns putting its pre-undo state on the redo stack; see
    /// [`undo_from`](Self::undo_from) for the variant that does it.
    pub fn undo(&mut self, surface: Surface) -> Option<HistorySnapshot> {
        self.stack_mut(surface).undo.pop_back()
    }

    /// Pop the most recent redo entry.
    pub fn redo(&mut self, surface: Surface) -> Option<HistorySnapshot> {
        self.stack_mut(surface).redo.pop_back()
    }

    /// Undo with `current` moved onto the redo stack in the same step.
    ///
    /// Returns `None` and leaves both stacks untouched if there is nothing
    /// to undo.
    pub fn undo_from(&mut self, surface: Surface, current: &HistorySnapshot) -> Option<HistorySnapshot> {
        let snapshot = self.undo(surface)?;
        self.push_to_redo(surface, current);
        Some(snapshot)
    }

    /// Redo with `current` moved onto the undo stack in the same step.
    pub fn redo_from(&mut self, surface: Surface, current: &HistorySnapshot) -> Option<HistorySnapshot> {
        let snapshot = self.redo(surface)?;
        self.push_to_undo(surface, current);
        Some(snapshot)
    }

    //  Queries

    pub fn can_undo(&self, surface: Surface) -> bool {
        !self.stack(surface).undo.is_empty()
    }

    pub fn can_redo(&self, surface: Surface) -> bool {
        !self.stack(surface).redo.is_empty()
    }

    /// Empty one surface's stacks, or every stack when `surface` is `None`.
    pub fn clear(&mut self, surface: Option<Surface>) {
        match surface {
            Some(s) => self.stack_mut(s).clear(),
            None => {
                self.desktop.clear();
                self.mobile.clear();
            }
        }
    }

    //  Re-entrancy guard

    /// Start applying an undo/redo result; pushes are dropped until
    /// [`end_apply`](Self::end_apply).
    pub fn begin_apply(&mut self) {
        self.applying = true;
    }

    pub fn end_apply(&mut self) {
        self.applying = false;
    }

    pub fn is_applying(&self) -> bool {
        self.applying
    }
}

//  Tests

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::Rect;

    fn snap(tag: i32) -> HistorySnapshot {
        HistorySnapshot {
            widgets: vec![Widget::new("w", "clock", Rect::new(tag, 0, 1, 1))],
            mode: None,
        }
    }

    fn tag_of(s: &HistorySnapshot) -> i32 {
        s.widgets[0].layout.x
    }

    #[test]
    fn empty_history_returns_none() {
        let mut h = HistoryManager::default();
        assert!(!h.can_undo(Surface::Desktop));
        assert!(h.undo(Surface::Desktop).is_none());
        assert!(h.redo(Surface::Desktop).is_none());
        assert!(h.undo_from(Surface::Desktop, &snap(0)).is_none());
        assert!(!h.can_redo(Surface::Desktop), "failed undo must not touch redo");
    }

    #[test]
    fn undo_returns_most_recent_first() {
        let mut h = HistoryManager::default();
        h.push(Surface::Desktop, &snap(1));
        h.push(Surface::Desktop, &snap(2));
        assert_eq!(tag_of(&h.undo(Surface::Desktop).unwrap()), 2);
        assert_eq!(tag_of(&h.undo(Surface::Desktop).unwrap()), 1);
        assert!(!h.can_undo(Surface::Desktop));
    }

    #[test]
    fn push_clears_redo() {
        let mut h = HistoryManager::default();
        h.push(Surface::Desktop, &snap(1));
        h.push_to_redo(Surface::Desktop, &snap(2));
        assert!(h.can_redo(Surface::Desktop));
        h.push(Surface::Desktop, &snap(3));
        assert!(!h.can_redo(Surface::Desktop));
    }

    #[test]
    fn push_to_undo_keeps_redo() {
        let mut h = HistoryManager::default();
        h.push_to_redo(Surface::Desktop, &snap(2));
        h.push_to_undo(Surface::Desktop, &snap(1));
        assert!(h.can_redo(Surface::Desktop));
        assert!(h.can_undo(Surface::Desktop));
    }

    #[test]
    fn history_is_bounded() {
        let mut h = HistoryManager::default();
        for n in 0..(MAX_HISTORY_SIZE + 10) {
            h.push(Surface::Desktop, &snap(n as i32));
        }
        let mut undos = 0;
        let mut last = None;
        while let Some(s) = h.undo(Surface::Desktop) {
            undos += 1;
            last = Some(tag_of(&s));
        }
        assert_eq!(undos, MAX_HISTORY_SIZE);
        assert_eq!(last, Some(10), "the oldest ten entries are evicted");
        assert!(!h.can_undo(Surface::Desktop));
    }

    #[test]
    fn redo_stack_is_bounded_too() {
        let mut h = HistoryManager::new(HistoryConfig { max_depth: 3 });
        for n in 0..5 {
            h.push_to_redo(Surface::Mobile, &snap(n));
        }
        assert_eq!(h.stack(Surface::Mobile).redo_len(), 3);
        assert_eq!(tag_of(&h.redo(Surface::Mobile).unwrap()), 4);
    }

    #[test]
    fn surfaces_are_isolated() {
        let mut h = HistoryManager::default();
        h.push(Surface::Mobile, &snap(1));
        h.push_to_redo(Surface::Mobile, &snap(2));
        assert!(!h.can_undo(Surface::Desktop));
        assert!(!h.can_redo(Surface::Desktop));

        h.push(Surface::Desktop, &snap(3));
        assert!(h.can_redo(Surface::Mobile), "desktop push must not clear mobile redo");

        h.clear(Some(Surface::Desktop));
        assert!(h.can_undo(Surface::Mobile));
        assert!(h.can_redo(Surface::Mobile));
        assert!(h.undo(Surface::Desktop).is_none());
    }

    #[test]
    fn clear_all_empties_both_surfaces() {
        let mut h = HistoryManager::default();
        h.push(Surface::Desktop, &snap(1));
        h.push(Surface::Mobile, &snap(2));
        h.clear(None);
        assert!(!h.can_undo(Surface::Desktop));
        assert!(!h.can_undo(Surface::Mobile));
    }

    #[test]
    fn mutating_after_push_does_not_change_history() {
        let mut h = HistoryManager::default();
        let mut s = snap(1);
        h.push(Surface::Desktop, &s);
        s.widgets[0].layout.x = 99;
        s.widgets.push(Widget::new("extra", "clock", Rect::new(0, 0, 1, 1)));
        let popped = h.undo(Surface::Desktop).unwrap();
        assert_eq!(popped, snap(1));
    }

    #[test]
    fn mutating_popped_value_does_not_change_history() {
        let mut h = HistoryManager::default();
        h.push_to_redo(Surface::Desktop, &snap(1));
        let mut current = snap(5);
        let mut popped = h.redo_from(Surface::Desktop, &current).unwrap();
        popped.widgets.clear();
        current.widgets.clear();
        assert_eq!(h.undo(Surface::Desktop), Some(snap(5)));
    }

    #[test]
    fn undo_from_and_redo_from_transfer_symmetrically() {
        let mut h = HistoryManager::default();
        h.push(Surface::Desktop, &snap(1));
        let restored = h.undo_from(Surface::Desktop, &snap(2)).unwrap();
        assert_eq!(tag_of(&restored), 1);
        assert!(h.can_redo(Surface::Desktop));

        let again = h.redo_from(Surface::Desktop, &restored).unwrap();
        assert_eq!(tag_of(&again), 2);
        assert_eq!(tag_of(&h.undo(Surface::Desktop).unwrap()), 1);
    }

    #[test]
    fn pushes_are_dropped_while_applying() {
        let mut h = HistoryManager::default();
        h.begin_apply();
        h.push(Surface::Desktop, &snap(1));
        assert!(!h.can_undo(Surface::Desktop));
        h.end_apply();
        h.push(Surface::Desktop, &snap(1));
        assert!(h.can_undo(Surface::Desktop));
    }
}
