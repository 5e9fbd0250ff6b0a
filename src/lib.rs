//! **widgrid** — the grid layout engine of a self-hosted widget dashboard.
//!
//! Widgets live on a cell grid with two surfaces: the primary "desktop"
//! layout and a secondary "mobile" one that is either derived from the
//! primary (linked) or edited on its own (independent).  The crate keeps
//! both layouts valid, records per-surface undo history, and turns a
//! deliberate touch-and-hold into a drag start on touch screens.
//!
//! # Architecture
//!
//! * [`layout`] — pure operations over the [`widget`] data model:
//!   constraint clamping, overlap normalization, mobile derivation, and
//!   diffing.
//! * [`history`] — bounded per-surface undo/redo stacks.
//! * [`gesture`] and [`drag`] — the hold-to-drag recognizer and the
//!   stateless drag-handle projection used by rendering code.
//! * [`editor::GridEditor`] — wires the above together and reacts to
//!   [`command::EditCommand`]s.
//!
//! The collaborators are traits in [`traits`]:
//!
//! * [`traits::WidgetStore`] — where the widget array is persisted.
//! * [`traits::PolicyRegistry`] — per-type size constraints.
//! * [`traits::TouchHost`] — the UI runtime delivering touches and
//!   receiving synthetic ones.
//! * [`traits::CommandSource`] — the transport that delivers user intent.
//!
//! Concrete implementations live in [`store`] (a JSON file) and [`ipc`]
//! (stdin and Unix-socket command readers).

pub mod command;
pub mod config;
pub mod drag;
pub mod editor;
pub mod gesture;
pub mod history;
pub mod ipc;
pub mod layout;
pub mod store;
pub mod traits;
pub mod widget;
