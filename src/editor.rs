//! The orchestrator that ties layout, history, persistence, and command
//! sources together.
//!
//! [`GridEditor`] owns the canonical widget array and reacts to
//! [`EditCommand`]s by running them through the commit pipeline:
//!
//! ```text
//! edit ──► constraints ──► column fit ──► normalize ──► mobile follow-up
//!                                                            │
//!      EditorEvent ◄── WidgetStore::save ◄── history push ◄──┘
//!                                            (only if changed)
//! ```
//!
//! The mobile follow-up depends on [`MobileLayoutMode`]: in linked mode the
//! mobile layout is re-derived from the desktop one after every commit; in
//! independent mode it is left alone, except that adding or removing a
//! widget also settles the mobile surface.

use crate::command::EditCommand;
use crate::config::GridConfig;
use crate::history::{HistoryConfig, HistoryManager, HistorySnapshot};
use crate::layout;
use crate::traits::{EditorEvent, PolicyRegistry, WidgetStore};
use crate::widget::{generate_widget_id, LayoutModel, MobileLayoutMode, Surface, Widget};
use log::{debug, info, warn};
use std::sync::mpsc;

/// Possible errors from the editor.
#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    /// The widget store failed to load or save.
    #[error("widget store error: {0}")]
    Store(String),
}

/// Direction of a history step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Undo,
    Redo,
}

/// Orchestrates layout edits, history, and persistence.
///
/// The editor is generic over any [`WidgetStore`] and [`PolicyRegistry`],
/// so it is independent of where widgets live and where size policies come
/// from.
///
/// # Typical usage
///
/// ```ignore
/// let store = JsonFileStore::new("widgets.json");
/// let mut editor = GridEditor::open(store, registry, config.grid, config.history)?;
/// editor.handle(EditCommand::Undo(Surface::Desktop))?;
/// editor.tick();
/// ```
///
/// # Re-entrancy
///
/// Applying an undo or redo is itself a layout write, and drag libraries
/// typically echo such writes back as a layout change.  After an undo/redo
/// the history guard stays up until [`tick`](Self::tick) or the next
/// command that is not a [`CommitLayout`](EditCommand::CommitLayout), so
/// the echo is applied without being recorded as a new action.
pub struct GridEditor<S: WidgetStore, P: PolicyRegistry> {
    store: S,
    registry: P,
    grid: GridConfig,
    widgets: Vec<Widget>,
    mode: MobileLayoutMode,
    history: HistoryManager,
    events: Option<mpsc::Sender<EditorEvent>>,
}

impl<S: WidgetStore, P: PolicyRegistry> GridEditor<S, P> {
    /// Create an editor with no widgets.  Nothing is loaded from `store`.
    pub fn new(store: S, registry: P, grid: GridConfig, history: HistoryConfig) -> Self {
        let mode = grid.mobile_layout_mode;
        Self {
            store,
            registry,
            grid,
            widgets: Vec::new(),
            mode,
            history: HistoryManager::new(history),
            events: None,
        }
    }

    /// Create an editor from the widgets currently in `store`.
    ///
    /// Loaded widgets go through the commit pipeline (without history or a
    /// write back) so that malformed entries are clamped and overlaps
    /// resolved before anything is rendered.
    pub fn open(
        store: S,
        registry: P,
        grid: GridConfig,
        history: HistoryConfig,
    ) -> Result<Self, EditorError> {
        let loaded = store
            .load()
            .map_err(|e| EditorError::Store(e.to_string()))?;
        let mut editor = Self::new(store, registry, grid, history);
        editor.widgets = editor.settle(Surface::Desktop, loaded, true);
        info!("opened {} widget(s) in {:?} mode", editor.widgets.len(), editor.mode);
        Ok(editor)
    }

    /// Attach an event channel for rendering code.
    ///
    /// The editor sends [`EditorEvent::LayoutChanged`] and
    /// [`EditorEvent::HistoryChanged`] after every applied edit, undo, or
    /// redo, and [`EditorEvent::ModeChanged`] when the mobile mode switches.
    pub fn set_events(&mut self, tx: mpsc::Sender<EditorEvent>) {
        self.events = Some(tx);
    }

    /// The canonical widget array.
    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn mode(&self) -> MobileLayoutMode {
        self.mode
    }

    pub fn grid_config(&self) -> &GridConfig {
        &self.grid
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Project one surface for a rendering or drag library.
    pub fn layout_model(&self, surface: Surface) -> LayoutModel {
        layout::widgets_to_layout_model(&self.widgets, surface)
    }

    /// Let a pending undo/redo settle: release the history guard.
    pub fn tick(&mut self) {
        if self.history.is_applying() {
            debug!("history guard released");
            self.history.end_apply();
        }
    }

    /// Process a single [`EditCommand`].
    ///
    /// Absent ids and empty history are no-ops.  If the store fails to save,
    /// the in-memory state has **already** been updated and events sent;
    /// the error is returned so the caller can retry or report it.
    pub fn handle(&mut self, cmd: EditCommand) -> Result<(), EditorError> {
        if !matches!(cmd, EditCommand::CommitLayout { .. }) {
            self.tick();
        }
        info!("{}", cmd);
        match cmd {
            EditCommand::AddWidget {
                widget_type,
                config,
            } => {
                let policy = self.registry.policy(&widget_type).sanitized();
                let desktop = self.layout_model(Surface::Desktop);
                let rect = layout::place_new_widget(&desktop, policy.default_w, policy.default_h);
                let mut widget = Widget::new(generate_widget_id(), widget_type, rect);
                widget.config = config;
                if self.mode == MobileLayoutMode::Independent {
                    let mobile = self.layout_model(Surface::Mobile);
                    widget.mobile_layout = Some(layout::place_new_widget(
                        &mobile,
                        policy.default_w,
                        policy.default_h,
                    ));
                }
                debug!("  → {} at {}", widget.id, widget.layout);
                let next = layout::add_widget(&self.widgets, widget);
                self.commit(Surface::Desktop, next)?;
            }

            EditCommand::DeleteWidget { id } => {
                if layout::get_widget_by_id(&self.widgets, &id).is_none() {
                    debug!("no widget {}, nothing to delete", id);
                    return Ok(());
                }
                let mut next = layout::delete_widget(&self.widgets, &id);
                if self.grid.compact_on_delete {
                    next = compact(&next, Surface::Desktop);
                    if self.mode == MobileLayoutMode::Independent {
                        next = compact(&next, Surface::Mobile);
                    }
                }
                self.commit(Surface::Desktop, next)?;
            }

            EditCommand::MoveWidget { surface, id, rect } => {
                if self.accepts_edits_on(surface) {
                    let next = layout::move_widget(&self.widgets, surface, &id, rect);
                    self.commit(surface, next)?;
                }
            }

            EditCommand::ResizeWidget { surface, id, rect } => {
                if self.accepts_edits_on(surface) {
                    let next = layout::resize_widget(&self.widgets, surface, &id, rect);
                    self.commit(surface, next)?;
                }
            }

            EditCommand::CommitLayout { surface, items } => {
                if self.accepts_edits_on(surface) {
                    let model = LayoutModel::new(surface, items);
                    let next = layout::apply_layout_to_widgets(&self.widgets, &model);
                    self.commit(surface, next)?;
                }
            }

            EditCommand::Undo(surface) => self.step(surface, Step::Undo)?,

            EditCommand::Redo(surface) => self.step(surface, Step::Redo)?,

            EditCommand::SetMobileMode(mode) => self.set_mode(mode)?,

            EditCommand::ClearHistory(surface) => {
                self.history.clear(surface);
                match surface {
                    Some(s) => self.emit_history(s),
                    None => {
                        self.emit_history(Surface::Desktop);
                        self.emit_history(Surface::Mobile);
                    }
                }
            }
        }
        Ok(())
    }

    //  Pipeline

    /// Columns available on `surface`.
    fn columns(&self, surface: Surface) -> i32 {
        match surface {
            Surface::Desktop => self.grid.columns,
            Surface::Mobile => self.grid.mobile_columns,
        }
    }

    /// Mobile edits are meaningless while the mobile layout is derived.
    fn accepts_edits_on(&self, surface: Surface) -> bool {
        if surface == Surface::Mobile && self.mode == MobileLayoutMode::Linked {
            warn!("mobile layout is linked to desktop, ignoring mobile edit");
            return false;
        }
        true
    }

    /// Run `widgets` through the pipeline for `surface` and the mobile
    /// follow-up of the current mode.  `set_changed` is whether widgets
    /// were added or removed.
    fn settle(&self, surface: Surface, widgets: Vec<Widget>, set_changed: bool) -> Vec<Widget> {
        let settled =
            layout::commit_surface(&widgets, surface, &self.registry, self.columns(surface));
        match self.mode {
            MobileLayoutMode::Linked => {
                layout::snapshot_to_mobile_layout(&settled, self.grid.mobile_columns)
            }
            MobileLayoutMode::Independent if surface == Surface::Desktop && set_changed => {
                layout::commit_surface(
                    &settled,
                    Surface::Mobile,
                    &self.registry,
                    self.grid.mobile_columns,
                )
            }
            MobileLayoutMode::Independent => settled,
        }
    }

    /// Settle `next`, and if it differs from the current widgets record the
    /// current ones on `surface`'s history and replace them.
    fn commit(&mut self, surface: Surface, next: Vec<Widget>) -> Result<(), EditorError> {
        let set_changed = !layout::widget_sets_match(&self.widgets, &next);
        let next = self.settle(surface, next, set_changed);
        if !layout::is_different(&self.widgets, &next) {
            debug!("no change on {}", surface);
            return Ok(());
        }
        debug!(
            "changed on {}: {:?}",
            surface,
            layout::get_changed_widget_ids(&self.widgets, &next)
        );
        self.history.push(surface, &self.snapshot());
        self.replace(surface, next)
    }

    /// The current widgets, tagged with the current mode.
    fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot::new(&self.widgets).in_mode(self.mode)
    }

    /// Install `next` as the current widgets, persist, and notify.
    fn replace(&mut self, surface: Surface, next: Vec<Widget>) -> Result<(), EditorError> {
        self.widgets = next;
        let saved = self
            .store
            .save(&self.widgets)
            .map_err(|e| EditorError::Store(e.to_string()));
        if let Err(e) = &saved {
            warn!("layout applied but not saved: {}", e);
        }
        self.emit(EditorEvent::LayoutChanged {
            surface,
            widgets: self.widgets.clone(),
        });
        self.emit_history(surface);
        saved
    }

    /// Apply the top of the undo or redo stack for `surface`.
    ///
    /// Mode switches live on the mobile history, so a mobile step also
    /// restores the mode its snapshot was taken in.  While linked, the
    /// mobile history holds nothing but mode switches.
    fn step(&mut self, surface: Surface, step: Step) -> Result<(), EditorError> {
        let current = self.snapshot();
        let popped = match step {
            Step::Undo => self.history.undo_from(surface, &current),
            Step::Redo => self.history.redo_from(surface, &current),
        };
        let Some(snapshot) = popped else {
            debug!("nothing to {:?} on {}", step, surface);
            return Ok(());
        };
        if surface == Surface::Mobile {
            if let Some(mode) = snapshot.mode.filter(|m| *m != self.mode) {
                debug!("{:?} restores {:?} mode", step, mode);
                self.mode = mode;
                self.emit(EditorEvent::ModeChanged(mode));
            }
        }
        self.history.begin_apply();
        let set_changed = !layout::widget_sets_match(&self.widgets, &snapshot.widgets);
        let next = self.settle(surface, snapshot.widgets, set_changed);
        self.replace(surface, next)
    }

    fn set_mode(&mut self, mode: MobileLayoutMode) -> Result<(), EditorError> {
        if mode == self.mode {
            debug!("already in {:?} mode", mode);
            return Ok(());
        }
        let before = self.snapshot();
        self.mode = mode;
        self.emit(EditorEvent::ModeChanged(mode));
        match mode {
            MobileLayoutMode::Linked => {
                // Recorded even when the derived layout matches, so the
                // switch itself can be undone.
                let next = layout::snapshot_to_mobile_layout(&self.widgets, self.grid.mobile_columns);
                self.history.push(Surface::Mobile, &before);
                self.replace(Surface::Mobile, next)
            }
            MobileLayoutMode::Independent => {
                // Materialize the derived layout for widgets that never
                // stored one, so the mobile surface can be edited as shown.
                let derived = layout::derive_linked_mobile_layout(
                    &self.layout_model(Surface::Desktop),
                    self.grid.mobile_columns,
                );
                let missing: Vec<_> = derived
                    .items
                    .into_iter()
                    .filter(|item| {
                        layout::get_widget_by_id(&self.widgets, &item.id)
                            .is_some_and(|w| w.mobile_layout.is_none())
                    })
                    .collect();
                if missing.is_empty() {
                    return Ok(());
                }
                let next = layout::apply_layout_to_widgets(
                    &self.widgets,
                    &LayoutModel::new(Surface::Mobile, missing),
                );
                self.replace(Surface::Mobile, next)
            }
        }
    }

    //  Events

    fn emit(&self, event: EditorEvent) {
        if let Some(tx) = &self.events {
            let _ = tx.send(event);
        }
    }

    fn emit_history(&self, surface: Surface) {
        self.emit(EditorEvent::HistoryChanged {
            surface,
            can_undo: self.history.can_undo(surface),
            can_redo: self.history.can_redo(surface),
        });
    }
}

/// Float every widget up on `surface`.
fn compact(widgets: &[Widget], surface: Surface) -> Vec<Widget> {
    let model = layout::widgets_to_layout_model(widgets, surface);
    layout::apply_layout_to_widgets(widgets, &layout::compact_layout(&model))
}

//  Tests
