//! Hold-to-drag touch gesture recognizer.
//!
//! On touch surfaces a widget only becomes draggable after a deliberate
//! hold, so a scroll that happens to start over a widget is never mistaken
//! for a drag.  Once the hold threshold is met the recognizer hands the
//! contact to the drag library by dispatching a synthetic `touchstart`.
//!
//! # State machine
//!
//! ```text
//!             touchstart on widget
//!    Idle ───────────────────────────► Holding
//!     ▲  ▲                              │  │
//!     │  │  moved > threshold,          │  │ hold timer fires
//!     │  └─ touchend / cancel ──────────┘  ▼
//!     │                                 DragReady ──► synthetic touchstart
//!     │                                    │          on next frame
//!     └──── auto-reset timer after ────────┘
//!           touchend (250 ms)
//! ```
//!
//! | Input                      | Holding                              | DragReady                     |
//! |----------------------------|--------------------------------------|-------------------------------|
//! | `TouchMove` within 5 px    | stop propagation, track position     | pass                          |
//! | `TouchMove` beyond 5 px    | cancel, pass (native scroll)         | pass                          |
//! | `TouchEnd` / `TouchCancel` | cancel                               | start auto-reset timer        |
//! | `DocumentTouchMove`        | pass                                 | prevent default (scroll lock) |
//!
//! Time is never read from a clock.  Every input carries a millisecond
//! timestamp and the host delivers [`GestureInput::Timer`] and
//! [`GestureInput::AnimationFrame`] inputs, so the whole machine can be
//! driven deterministically.  Timers that are already due are fired before
//! any later input is processed.

use crate::drag::{DragHandle, PixelRect, Point, DEFAULT_HANDLE_INSET};
use crate::traits::TouchHost;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Tuning knobs for hold recognition.
///
/// All durations are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Hold time before a widget becomes drag-ready.  Default: `200`.
    pub hold_ms: u64,
    /// Elapsed hold time at which visual progress starts rising from 0.
    /// Default: `70`.
    pub progress_delay_ms: u64,
    /// Movement (Euclidean, in pixels) that turns a hold into a scroll.
    /// Default: `5.0`.
    pub move_threshold_px: f64,
    /// How long drag-readiness survives after the finger lifts.
    /// Default: `250`.
    pub auto_reset_ms: u64,
    /// Window during which the recognizer lets its own synthetic
    /// `touchstart` through.  Default: `50`.
    pub synthetic_guard_ms: u64,
    /// Side of the corner squares that belong to the resize handles, and
    /// the inset of the drag handle from each widget edge.  Default: `12.0`.
    pub resize_zone_px: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            hold_ms: 200,
            progress_delay_ms: 70,
            move_threshold_px: 5.0,
            auto_reset_ms: 250,
            synthetic_guard_ms: 50,
            resize_zone_px: DEFAULT_HANDLE_INSET,
        }
    }
}

impl GestureConfig {
    /// The drag handle every widget is presented with.
    pub fn drag_handle(&self) -> DragHandle {
        DragHandle::new(self.resize_zone_px)
    }
}

/// What the touch landed on, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TouchTarget {
    /// Inside an element marked as a no-drag area.
    pub no_drag: bool,
    /// On a resize handle rendered by the drag library.
    pub resize_handle: bool,
}

/// A native touch event.
#[derive(Debug, Clone, PartialEq)]
pub struct TouchEvent {
    pub time_ms: u64,
    /// Every contact currently on the surface.
    pub touches: Vec<Point>,
    pub target: TouchTarget,
}

impl TouchEvent {
    /// Single-finger event at `(x, y)`.
    pub fn single(time_ms: u64, x: f64, y: f64) -> Self {
        Self {
            time_ms,
            touches: vec![Point::new(x, y)],
            target: TouchTarget::default(),
        }
    }

    /// Event with no remaining contacts (as seen on `touchend`).
    pub fn lifted(time_ms: u64) -> Self {
        Self {
            time_ms,
            touches: Vec::new(),
            target: TouchTarget::default(),
        }
    }

    fn primary(&self) -> Option<Point> {
        self.touches.first().copied()
    }
}

/// One input to the recognizer's transition function.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureInput {
    /// Capture-phase `touchstart` on the grid.
    TouchStart(TouchEvent),
    /// Capture-phase `touchmove` on the grid.
    TouchMove(TouchEvent),
    TouchEnd(TouchEvent),
    TouchCancel(TouchEvent),
    /// Document-level `touchmove` (scroll lock).
    DocumentTouchMove(TouchEvent),
    /// Document-level `touchend` (starts the auto-reset timer).
    DocumentTouchEnd(TouchEvent),
    /// A scheduled timer has come due.
    Timer { now_ms: u64 },
    /// An animation frame is being rendered.
    AnimationFrame { now_ms: u64 },
}

impl GestureInput {
    fn time_ms(&self) -> u64 {
        match self {
            GestureInput::TouchStart(e)
            | GestureInput::TouchMove(e)
            | GestureInput::TouchEnd(e)
            | GestureInput::TouchCancel(e)
            | GestureInput::DocumentTouchMove(e)
            | GestureInput::DocumentTouchEnd(e) => e.time_ms,
            GestureInput::Timer { now_ms } | GestureInput::AnimationFrame { now_ms } => *now_ms,
        }
    }
}

/// What the host must do with the native event after the recognizer saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Disposition {
    /// Keep the event away from listeners after this one (the drag library).
    pub stop_propagation: bool,
    /// Suppress the browser's default action (scrolling).
    pub prevent_default: bool,
}

impl Disposition {
    pub const PASS: Self = Self {
        stop_propagation: false,
        prevent_default: false,
    };
    pub const STOP: Self = Self {
        stop_propagation: true,
        prevent_default: false,
    };
    pub const PREVENT: Self = Self {
        stop_propagation: false,
        prevent_default: true,
    };
}

/// Rendered position of one widget, used for hit testing.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetBounds {
    pub id: String,
    pub rect: PixelRect,
}

/// The `touchstart` the recognizer asks the host to dispatch at a widget.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticTouch {
    pub widget_id: String,
    pub point: Point,
}

/// The host could not build or dispatch a synthetic touch event.
#[derive(Debug, thiserror::Error)]
#[error("synthetic touch dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Where a native listener is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerTarget {
    Grid,
    Document,
}

/// Which native event a listener receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TouchKind {
    Start,
    Move,
    End,
    Cancel,
}

/// One native listener the host must register while the recognizer is
/// attached.
///
/// Grid listeners are capture-phase: they must run before any listener the
/// drag library registers on the widgets themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerSpec {
    pub target: ListenerTarget,
    pub kind: TouchKind,
    pub capture: bool,
    /// A passive listener cannot prevent default.
    pub passive: bool,
}

/// Every listener the recognizer needs.
pub const LISTENERS: [ListenerSpec; 6] = [
    ListenerSpec { target: ListenerTarget::Grid, kind: TouchKind::Start, capture: true, passive: false },
    ListenerSpec { target: ListenerTarget::Grid, kind: TouchKind::Move, capture: true, passive: false },
    ListenerSpec { target: ListenerTarget::Grid, kind: TouchKind::End, capture: true, passive: true },
    ListenerSpec { target: ListenerTarget::Grid, kind: TouchKind::Cancel, capture: true, passive: true },
    ListenerSpec { target: ListenerTarget::Document, kind: TouchKind::Move, capture: false, passive: false },
    ListenerSpec { target: ListenerTarget::Document, kind: TouchKind::End, capture: false, passive: true },
];

/// Externally observable projection of the recognizer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActivationState {
    pub drag_ready_widget_id: Option<String>,
    pub holding_widget_id: Option<String>,
    /// Visual feedback only, in `[0, 1]`.
    pub hold_progress: f64,
}

/// An in-flight hold.
#[derive(Debug, Clone)]
struct HoldSession {
    widget_id: String,
    start: Point,
    current: Point,
    started_ms: u64,
}

#[derive(Debug, Clone)]
enum Phase {
    Idle,
    Holding(HoldSession),
    DragReady { widget_id: String },
}

/// Hold-to-drag recognizer for one grid.
///
/// All interception state lives on the instance, so several grids (for
/// example the desktop and mobile surfaces) can each own a recognizer
/// without interfering.
#[derive(Debug)]
pub struct GestureRecognizer {
    config: GestureConfig,
    corners: DragHandle,
    attached: bool,
    phase: Phase,
    hold_progress: f64,
    /// Hold timer.
    hold_deadline: Option<u64>,
    /// Auto-reset timer after release.
    reset_deadline: Option<u64>,
    /// Progress animation requested.
    progress_loop: bool,
    /// Synthetic touch waiting for the next animation frame.
    pending_dispatch: Option<SyntheticTouch>,
    /// Until when our own synthetic `touchstart` is let through.
    synthetic_guard_until: Option<u64>,
}

impl GestureRecognizer {
    pub fn new(config: GestureConfig) -> Self {
        let corners = config.drag_handle();
        Self {
            config,
            corners,
            attached: false,
            phase: Phase::Idle,
            hold_progress: 0.0,
            hold_deadline: None,
            reset_deadline: None,
            progress_loop: false,
            pending_dispatch: None,
            synthetic_guard_until: None,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(GestureConfig::default())
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    //  Attachment

    /// Turn touch blocking on or off.
    ///
    /// Activating registers [`LISTENERS`] with the host.  Deactivating
    /// clears every timer and session and unregisters the listeners.
    pub fn set_active<H: TouchHost + ?Sized>(&mut self, active: bool, host: &mut H) {
        if active == self.attached {
            return;
        }
        if active {
            debug!("gesture recognizer attached");
            host.attach_listeners(&LISTENERS);
        } else {
            debug!("gesture recognizer detached");
            self.reset();
            host.detach_listeners();
        }
        self.attached = active;
    }

    pub fn is_active(&self) -> bool {
        self.attached
    }

    /// Drop the session and every outstanding timer and frame request.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.hold_progress = 0.0;
        self.hold_deadline = None;
        self.reset_deadline = None;
        self.progress_loop = false;
        self.pending_dispatch = None;
        self.synthetic_guard_until = None;
    }

    //  Observation

    pub fn activation(&self) -> ActivationState {
        match &self.phase {
            Phase::Idle => ActivationState::default(),
            Phase::Holding(s) => ActivationState {
                drag_ready_widget_id: None,
                holding_widget_id: Some(s.widget_id.clone()),
                hold_progress: self.hold_progress,
            },
            Phase::DragReady { widget_id } => ActivationState {
                drag_ready_widget_id: Some(widget_id.clone()),
                holding_widget_id: None,
                hold_progress: 1.0,
            },
        }
    }

    pub fn drag_ready_widget_id(&self) -> Option<&str> {
        match &self.phase {
            Phase::DragReady { widget_id } => Some(widget_id),
            _ => None,
        }
    }

    /// Earliest pending timer, so the host knows when to deliver
    /// [`GestureInput::Timer`].
    pub fn next_deadline(&self) -> Option<u64> {
        [self.hold_deadline, self.reset_deadline, self.synthetic_guard_until]
            .into_iter()
            .flatten()
            .min()
    }

    /// Whether the host should deliver an [`GestureInput::AnimationFrame`].
    pub fn wants_animation_frame(&self) -> bool {
        self.progress_loop || self.pending_dispatch.is_some()
    }

    //  Transition function

    /// Feed one input through the state machine.
    pub fn handle<H: TouchHost + ?Sized>(&mut self, input: GestureInput, host: &mut H) -> Disposition {
        if !self.attached {
            return Disposition::PASS;
        }
        self.fire_due_timers(input.time_ms());
        match input {
            GestureInput::TouchStart(event) => self.on_touch_start(event, host),
            GestureInput::TouchMove(event) => self.on_touch_move(&event),
            GestureInput::TouchEnd(event) | GestureInput::TouchCancel(event) => {
                self.on_release(event.time_ms)
            }
            GestureInput::DocumentTouchEnd(event) => {
                if matches!(self.phase, Phase::DragReady { .. }) {
                    self.arm_auto_reset(event.time_ms);
                }
                Disposition::PASS
            }
            GestureInput::DocumentTouchMove(_) => {
                if matches!(self.phase, Phase::DragReady { .. }) {
                    Disposition::PREVENT
                } else {
                    Disposition::PASS
                }
            }
            GestureInput::Timer { .. } => Disposition::PASS,
            GestureInput::AnimationFrame { now_ms } => {
                self.on_frame(now_ms, host);
                Disposition::PASS
            }
        }
    }

    fn on_touch_start<H: TouchHost + ?Sized>(&mut self, event: TouchEvent, host: &mut H) -> Disposition {
        if event.touches.len() != 1 {
            return Disposition::PASS;
        }
        let Some(point) = event.primary() else {
            return Disposition::PASS;
        };
        if self
            .synthetic_guard_until
            .is_some_and(|until| event.time_ms < until)
        {
            debug!("letting synthetic touchstart through");
            return Disposition::PASS;
        }
        if host.is_claimed(&event) || event.target.no_drag || event.target.resize_handle {
            return Disposition::PASS;
        }
        let bounds = host.widget_bounds();
        // Topmost widget wins: later entries render above earlier ones.
        let Some(hit) = bounds.iter().rev().find(|b| b.rect.contains(point)) else {
            return Disposition::PASS;
        };
        if self.corners.in_resize_zone(&hit.rect, point) {
            return Disposition::PASS;
        }

        let continues_drag = match &self.phase {
            Phase::Idle => None,
            Phase::DragReady { widget_id } => Some(*widget_id == hit.id),
            Phase::Holding(_) => Some(false),
        };
        match continues_drag {
            Some(true) => {
                debug!("re-touch on drag-ready widget {}, continuing", hit.id);
                self.reset_deadline = None;
                Disposition::PASS
            }
            Some(false) => Disposition::PASS,
            None => {
                debug!("hold started on {} at ({:.0}, {:.0})", hit.id, point.x, point.y);
                self.phase = Phase::Holding(HoldSession {
                    widget_id: hit.id.clone(),
                    start: point,
                    current: point,
                    started_ms: event.time_ms,
                });
                self.hold_progress = 0.0;
                self.hold_deadline = Some(event.time_ms + self.config.hold_ms);
                self.progress_loop = true;
                Disposition::STOP
            }
        }
    }

    fn on_touch_move(&mut self, event: &TouchEvent) -> Disposition {
        let Phase::Holding(session) = &mut self.phase else {
            return Disposition::PASS;
        };
        let Some(point) = event.primary() else {
            return Disposition::PASS;
        };
        // Scroll intent must be detected before anything is suppressed.
        if point.distance(&session.start) > self.config.move_threshold_px {
            debug!("hold on {} cancelled by movement, falling back to scroll", session.widget_id);
            self.cancel_hold();
            return Disposition::PASS;
        }
        session.current = point;
        Disposition::STOP
    }

    fn on_release(&mut self, now_ms: u64) -> Disposition {
        match self.phase {
            Phase::Holding(_) => self.cancel_hold(),
            Phase::DragReady { .. } => self.arm_auto_reset(now_ms),
            Phase::Idle => {}
        }
        Disposition::PASS
    }

    fn on_frame<H: TouchHost + ?Sized>(&mut self, now_ms: u64, host: &mut H) {
        if let Phase::Holding(session) = &self.phase {
            if self.progress_loop {
                self.hold_progress = self.progress_at(now_ms.saturating_sub(session.started_ms));
            }
        }
        if let Some(touch) = self.pending_dispatch.take() {
            self.synthetic_guard_until = Some(now_ms + self.config.synthetic_guard_ms);
            match host.dispatch_touch_start(&touch) {
                Ok(()) => debug!("dispatched synthetic touchstart to {}", touch.widget_id),
                Err(e) => {
                    warn!("{}", e);
                    self.synthetic_guard_until = None;
                }
            }
        }
    }

    //  Timers

    fn fire_due_timers(&mut self, now_ms: u64) {
        if self.hold_deadline.is_some_and(|d| now_ms >= d) {
            self.hold_deadline = None;
            self.on_hold_elapsed();
        }
        if self.reset_deadline.is_some_and(|d| now_ms >= d) {
            self.reset_deadline = None;
            if let Phase::DragReady { widget_id } = &self.phase {
                debug!("drag-ready on {} expired", widget_id);
                self.phase = Phase::Idle;
                self.hold_progress = 0.0;
            }
        }
        if self.synthetic_guard_until.is_some_and(|d| now_ms >= d) {
            self.synthetic_guard_until = None;
        }
    }

    fn on_hold_elapsed(&mut self) {
        let Phase::Holding(session) = std::mem::replace(&mut self.phase, Phase::Idle) else {
            return;
        };
        debug!("{} is drag-ready", session.widget_id);
        self.progress_loop = false;
        self.hold_progress = 1.0;
        self.pending_dispatch = Some(SyntheticTouch {
            widget_id: session.widget_id.clone(),
            point: session.current,
        });
        self.phase = Phase::DragReady {
            widget_id: session.widget_id,
        };
    }

    fn arm_auto_reset(&mut self, now_ms: u64) {
        self.reset_deadline = Some(now_ms + self.config.auto_reset_ms);
    }

    fn cancel_hold(&mut self) {
        self.phase = Phase::Idle;
        self.hold_deadline = None;
        self.progress_loop = false;
        self.hold_progress = 0.0;
    }

    /// Visual progress after `elapsed_ms` of holding.
    fn progress_at(&self, elapsed_ms: u64) -> f64 {
        let delay = self.config.progress_delay_ms;
        let hold = self.config.hold_ms;
        if hold <= delay {
            return if elapsed_ms >= hold { 1.0 } else { 0.0 };
        }
        if elapsed_ms <= delay {
            return 0.0;
        }
        ((elapsed_ms - delay) as f64 / (hold - delay) as f64).min(1.0)
    }
}

//  Tests
