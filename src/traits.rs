//! Seams between the grid engine and its collaborators.
//!
//! The engine never knows how widgets are persisted, where size policies
//! come from, how touch events reach it, or who sends it commands.  Each of
//! those is a trait here; the [`GridEditor`](crate::editor::GridEditor) and
//! [`GestureRecognizer`](crate::gesture::GestureRecognizer) depend only on
//! these abstractions.

use crate::command::EditCommand;
use crate::gesture::{DispatchError, ListenerSpec, SyntheticTouch, TouchEvent, WidgetBounds};
use crate::widget::{GridPolicy, MobileLayoutMode, Surface, Widget};
use std::collections::HashMap;
use std::sync::mpsc;

/// Persistence for the canonical widget array.
///
/// An implementation might write a JSON file, call an HTTP API, or record
/// calls in a test.
pub trait WidgetStore {
    /// The error type produced by this store.
    type Error: std::error::Error + Send + 'static;

    /// Load the persisted widget array.
    fn load(&self) -> Result<Vec<Widget>, Self::Error>;

    /// Replace the persisted widget array.
    fn save(&self, widgets: &[Widget]) -> Result<(), Self::Error>;
}

/// Lookup of per-type size constraints, owned by the widget registry.
pub trait PolicyRegistry {
    /// Constraints for `widget_type`.  Unknown types should return
    /// [`fallback_policy`](PolicyRegistry::fallback_policy).
    fn policy(&self, widget_type: &str) -> GridPolicy;

    /// Constraints for items whose type is unknown.
    fn fallback_policy(&self) -> GridPolicy {
        GridPolicy::default()
    }
}

impl PolicyRegistry for HashMap<String, GridPolicy> {
    fn policy(&self, widget_type: &str) -> GridPolicy {
        self.get(widget_type)
            .copied()
            .unwrap_or_else(|| self.fallback_policy())
    }
}

/// The UI runtime as seen by the gesture recognizer.
///
/// # Listener priority
///
/// The recognizer's grid listeners must see every touch before the drag
/// library does.  Hosts register them capture-phase on an ancestor of the
/// widgets; when some other component may already have taken an event, it
/// reports so through [`is_claimed`](TouchHost::is_claimed) instead of
/// relying on registration order.
pub trait TouchHost {
    /// Rendered bounds of every widget, bottom-most first.
    fn widget_bounds(&self) -> Vec<WidgetBounds>;

    /// Dispatch a `touchstart` at the widget so the drag library picks the
    /// contact up.
    fn dispatch_touch_start(&mut self, touch: &SyntheticTouch) -> Result<(), DispatchError>;

    /// Register native listeners.
    fn attach_listeners(&mut self, listeners: &[ListenerSpec]);

    /// Remove every listener registered by
    /// [`attach_listeners`](TouchHost::attach_listeners).
    fn detach_listeners(&mut self);

    /// Whether a higher-priority handler has already taken `event`.
    fn is_claimed(&self, _event: &TouchEvent) -> bool {
        false
    }
}

/// Events sent from the [`GridEditor`](crate::editor::GridEditor) to
/// rendering code over an [`mpsc`](std::sync::mpsc) channel.
#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    /// The widget array changed; `surface` is where the edit happened.
    LayoutChanged { surface: Surface, widgets: Vec<Widget> },
    /// Undo/redo availability for `surface`, for toolbar state.
    HistoryChanged {
        surface: Surface,
        can_undo: bool,
        can_redo: bool,
    },
    /// The mobile layout mode was switched.
    ModeChanged(MobileLayoutMode),
}

/// A source of [`EditCommand`]s.
///
/// Implementations read some transport (a pipe, a socket, a test fixture)
/// and forward parsed commands into `sink`.
///
/// # Contract
///
/// * [`run`](CommandSource::run) **blocks** until the source is exhausted or
///   an unrecoverable error occurs.
/// * Each received command must be sent through `sink` exactly once.
pub trait CommandSource: Send {
    /// The error type produced by this source.
    type Error: std::error::Error + Send + 'static;

    /// Forward every incoming [`EditCommand`] into `sink`.
    fn run(&mut self, sink: mpsc::Sender<EditCommand>) -> Result<(), Self::Error>;
}
