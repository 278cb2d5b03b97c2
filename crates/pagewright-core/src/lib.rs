//! Pagewright Core Library
//!
//! Page persistence, master page inheritance and snapping for the Pagewright
//! layout editor. Rendering and the editing UI live elsewhere.

pub mod config;
pub mod document;
pub mod editor;
pub mod guides;
pub mod live;
pub mod master;
pub mod object;
pub mod overrides;
pub mod recovery;
pub mod shapes;
pub mod snap;
pub mod snapshot;
pub mod storage;
pub mod store;
pub mod text_flow;

pub use config::{ConfigError, EditorConfig};
pub use document::{Document, DocumentMetadata, MasterPage, Page, Unit};
pub use editor::{CommandOutcome, Editor, EditorCommand, EditorContext, EmergencySource, LoadOutcome};
pub use guides::{GuideEvent, GuideManager, Guides, Orientation};
pub use live::{EditError, LiveObjectSet};
pub use object::{CanvasObject, MasterLink, ObjectId, Placement};
pub use overrides::override_master_object;
pub use recovery::{PageCapture, RecoveryManager};
pub use snap::{SnapOptions, SnapResult, snap_object, snap_to_grid, snap_to_guides};
pub use snapshot::{Reconstruction, SerializedObject, Snapshot, reconstruct, serialize};
pub use storage::{Storage, StorageError, StorageResult};
pub use store::{DocumentStore, MemoryDocumentStore};
pub use text_flow::{NoopTextFlow, TextFlow};
