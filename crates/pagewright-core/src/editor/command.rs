//! Editor commands and their outcomes.

use crate::guides::{GuideEvent, Orientation};
use crate::live::EditError;
use crate::object::{CanvasObject, ObjectId};
use crate::snap::SnapResult;
use kurbo::{Point, Vec2};

/// A user action, queued and processed in order by the [`Editor`](super::Editor).
#[derive(Debug, Clone, PartialEq)]
pub enum EditorCommand {
    /// Switch the displayed page. The outgoing page is saved first.
    OpenPage { page_id: String },
    /// Write the live objects of the displayed page to its page record.
    SavePage,
    /// Insert a blank page at `index` (clamped).
    InsertPage { index: usize },
    DeletePage { page_id: String },

    /// Add a page-local object on top of the displayed page.
    AddObject(CanvasObject),
    RemoveObject(ObjectId),
    /// Replace a page-local object by value. The replacement keeps the id.
    ReplaceObject(CanvasObject),
    MoveObject { id: ObjectId, delta: Vec2 },
    /// Change the text of a frame. Linked chains are reflowed.
    SetText { id: ObjectId, content: String },

    /// Attach a page to a master page, or detach it with `None`.
    ApplyMasterPage {
        page_id: String,
        master_page_id: Option<String>,
    },
    /// Replace an inherited object with an editable copy.
    OverrideMasterObject(ObjectId),
    /// Turn the local objects of the displayed page into a new master page.
    CreateMasterFromPage { name: String },
    DeleteMasterPage { master_page_id: String },

    /// A ruler guide request for the displayed page.
    Guide(GuideEvent),

    /// Pointer down on an object.
    BeginMove { id: ObjectId, at: Point },
    /// Pointer down on a ruler.
    BeginGuideDrag { orientation: Orientation, position: f64 },
    /// Pointer moved during a drag.
    DragTo { at: Point },
    /// Pointer up.
    EndDrag,
    /// Abandon the current drag and restore what it changed.
    CancelDrag,

    /// Capture a recovery snapshot of the displayed page now.
    TakeSnapshot,
    /// Replace the displayed page with its latest recovery snapshot.
    RecoverPage,
}

/// What processing a command did.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    /// The command took effect.
    Applied,
    PageOpened {
        page_id: String,
        objects: usize,
        /// Snapshot entries that could not be reconstructed.
        skipped: usize,
    },
    PageInserted(String),
    ObjectAdded(ObjectId),
    /// The inherited object was replaced by the page-local object with this id.
    Overridden(ObjectId),
    MasterCreated(String),
    /// A drag step, with whatever snapping applied to it.
    Moved(SnapResult),
    Recovered { objects: usize },
    /// A referenced page, master or object is missing, or nothing is open. Nothing changed.
    Ignored(String),
    /// The edit would break an invariant. Nothing changed.
    Refused(EditError),
}

impl CommandOutcome {
    /// Whether the command changed anything.
    pub fn is_effective(&self) -> bool {
        !matches!(self, Self::Ignored(_) | Self::Refused(_))
    }
}

impl From<EditError> for CommandOutcome {
    fn from(error: EditError) -> Self {
        log::warn!("Edit refused: {}", error);
        Self::Refused(error)
    }
}
