//! Edit commands accepted by the grid editor.
//!
//! [`EditCommand`] is the vocabulary shared by every producer of user
//! intent: the toolbar, the drag library's stop callbacks, and the
//! line-oriented command sources in [`ipc`](crate::ipc).
//!
//! # Wire format
//!
//! Commands use serde's externally tagged encoding, one JSON value per
//! message:
//!
//! ```json
//! {"AddWidget":{"widget_type":"clock"}}
//! {"DeleteWidget":{"id":"widget-3-9f0c..."}}
//! {"MoveWidget":{"surface":"desktop","id":"a","rect":{"x":2,"y":0,"w":3,"h":2}}}
//! {"CommitLayout":{"surface":"mobile","items":[{"i":"a","x":0,"y":0,"w":1,"h":2}]}}
//! {"Undo":"desktop"}
//! {"SetMobileMode":"independent"}
//! {"ClearHistory":null}
//! ```

use crate::widget::{LayoutItem, MobileLayoutMode, Rect, Surface};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Every edit the [`GridEditor`](crate::editor::GridEditor) can perform.
///
/// Commands are produced by [`CommandSource`](crate::traits::CommandSource)
/// implementations and consumed by
/// [`GridEditor::handle`](crate::editor::GridEditor::handle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditCommand {
    /// Create a widget of `widget_type` sized from its policy defaults and
    /// placed below everything else.
    AddWidget {
        widget_type: String,
        #[serde(default)]
        config: serde_json::Map<String, serde_json::Value>,
    },

    /// Remove a widget.  Unknown ids are a no-op.
    DeleteWidget { id: String },

    /// Place one widget at `rect` on `surface`.
    MoveWidget {
        surface: Surface,
        id: String,
        rect: Rect,
    },

    /// Resize one widget on `surface`.  Same effect as
    /// [`MoveWidget`](EditCommand::MoveWidget); kept separate so logs say
    /// which gesture produced the edit.
    ResizeWidget {
        surface: Surface,
        id: String,
        rect: Rect,
    },

    /// The full layout reported by the drag library when a drag or resize
    /// stops.  Items with unknown ids are ignored.
    CommitLayout {
        surface: Surface,
        items: Vec<LayoutItem>,
    },

    /// Step back one edit on the given surface.
    Undo(Surface),

    /// Re-apply the last undone edit on the given surface.
    Redo(Surface),

    /// Switch how the mobile layout relates to the desktop one.
    SetMobileMode(MobileLayoutMode),

    /// Drop history for one surface, or for both when `None`.
    ClearHistory(Option<Surface>),
}

impl fmt::Display for EditCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditCommand::AddWidget { widget_type, .. } => write!(f, "add {}", widget_type),
            EditCommand::DeleteWidget { id } => write!(f, "delete {}", id),
            EditCommand::MoveWidget { surface, id, rect } => {
                write!(f, "move {} to {} on {}", id, rect, surface)
            }
            EditCommand::ResizeWidget { surface, id, rect } => {
                write!(f, "resize {} to {} on {}", id, rect, surface)
            }
            EditCommand::CommitLayout { surface, items } => {
                write!(f, "commit {} items on {}", items.len(), surface)
            }
            EditCommand::Undo(surface) => write!(f, "undo {}", surface),
            EditCommand::Redo(surface) => write!(f, "redo {}", surface),
            EditCommand::SetMobileMode(MobileLayoutMode::Linked) => write!(f, "mobile mode linked"),
            EditCommand::SetMobileMode(MobileLayoutMode::Independent) => {
                write!(f, "mobile mode independent")
            }
            EditCommand::ClearHistory(Some(surface)) => write!(f, "clear {} history", surface),
            EditCommand::ClearHistory(None) => write!(f, "clear all history"),
        }
    }
}
