//! The editor coordinator.
//!
//! Every mutation of the displayed page goes through [`Editor`]. Commands are
//! queued and processed one at a time, so a page switch always writes the outgoing
//! page to its record before the incoming page is reconstructed, and an override
//! always lands before any later edit of the same object.

mod command;

pub use command::{CommandOutcome, EditorCommand};

use crate::config::EditorConfig;
use crate::document::{Document, Page};
use crate::guides::{GuideDrag, GuideEvent, GuideManager, Orientation};
use crate::live::{EditError, LiveObjectSet};
use crate::master;
use crate::object::{CanvasObject, ObjectId};
use crate::overrides::override_master_object;
use crate::recovery::{PageCapture, RecoveryManager};
use crate::snap::{IndicatorBoard, snap_object};
use crate::snapshot::{Reconstruction, Snapshot, reconstruct, serialize};
use crate::storage::{Storage, StorageError, StorageResult, load_with_timeout};
use crate::store::DocumentStore;
use crate::text_flow::{NoopTextFlow, TextFlow, chain_of};
use kurbo::Point;
use std::collections::VecDeque;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Collaborators of the editor, handed over at construction.
pub struct EditorContext {
    pub store: Box<dyn DocumentStore>,
    pub config: EditorConfig,
    pub text_flow: Box<dyn TextFlow>,
}

impl EditorContext {
    /// A context with no text reflow.
    pub fn new(store: impl DocumentStore + 'static, config: EditorConfig) -> Self {
        Self {
            store: Box::new(store),
            config,
            text_flow: Box::new(NoopTextFlow),
        }
    }

    pub fn with_text_flow(mut self, text_flow: impl TextFlow + 'static) -> Self {
        self.text_flow = Box::new(text_flow);
        self
    }
}

#[derive(Debug, Clone)]
enum DragSession {
    Move {
        id: ObjectId,
        origin: Point,
        /// The object as it was on pointer down.
        original: CanvasObject,
    },
    Guide(GuideDrag),
}

/// Where the emergency load path rebuilt the displayed page from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmergencySource {
    PageRecord,
    RecoverySnapshot,
    Empty,
}

/// Result of [`Editor::load_document`].
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded {
        document_id: String,
        /// Page records whose in-memory copy was newer than the stored one.
        kept_in_memory: usize,
    },
    Emergency {
        error: StorageError,
        source: EmergencySource,
    },
}

/// A page ready to display.
struct PageLoad {
    live: LiveObjectSet,
    background: String,
    skipped: usize,
}

/// Owns the live object set of the displayed page and applies commands to it.
pub struct Editor {
    ctx: EditorContext,
    live: LiveObjectSet,
    active_page: Option<String>,
    background: String,
    queue: VecDeque<EditorCommand>,
    drag: Option<DragSession>,
    indicators: IndicatorBoard,
    recovery: RecoveryManager,
}

impl Editor {
    pub fn new(ctx: EditorContext) -> Self {
        let recovery = RecoveryManager::new(
            ctx.config.snapshot_interval(),
            ctx.config.retained_snapshots,
        );
        let indicators = IndicatorBoard::new(ctx.config.indicator_duration());
        let background = ctx.store.get().metadata.background;
        Self {
            ctx,
            live: LiveObjectSet::new(),
            active_page: None,
            background,
            queue: VecDeque::new(),
            drag: None,
            indicators,
            recovery,
        }
    }

    /// A copy of the current document.
    pub fn document(&self) -> Document {
        self.ctx.store.get()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.ctx.config
    }

    /// Objects of the displayed page.
    pub fn live(&self) -> &LiveObjectSet {
        &self.live
    }

    pub fn active_page(&self) -> Option<&str> {
        self.active_page.as_deref()
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    pub fn indicators(&self) -> &IndicatorBoard {
        &self.indicators
    }

    pub fn recovery(&self) -> &RecoveryManager {
        &self.recovery
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Number of queued commands.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a command.
    pub fn submit(&mut self, command: EditorCommand) {
        self.queue.push_back(command);
    }

    /// Process every queued command in order.
    pub fn process(&mut self, now: Instant) -> Vec<CommandOutcome> {
        let mut outcomes = Vec::with_capacity(self.queue.len());
        while let Some(command) = self.queue.pop_front() {
            outcomes.push(self.execute(command, now));
        }
        outcomes
    }

    /// Queue `command` and process the queue. Returns the outcome of `command`.
    pub fn run(&mut self, command: EditorCommand, now: Instant) -> CommandOutcome {
        self.submit(command);
        self.process(now)
            .pop()
            .unwrap_or_else(|| CommandOutcome::Ignored("nothing processed".to_string()))
    }

    /// Advance timers: drop expired snap indicators and take a recovery snapshot
    /// when one is due. Returns true if a snapshot was taken.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.indicators.prune(now);
        let live = &mut self.live;
        let background = &self.background;
        self.recovery
            .tick(now, |page_id| Some(PageCapture::new(page_id, serialize(live, background))))
    }

    fn execute(&mut self, command: EditorCommand, now: Instant) -> CommandOutcome {
        match command {
            EditorCommand::OpenPage { page_id } => self.open_page(&page_id, now),
            EditorCommand::SavePage => {
                if self.save_page() {
                    CommandOutcome::Applied
                } else {
                    no_page()
                }
            }
            EditorCommand::InsertPage { index } => self.insert_page(index),
            EditorCommand::DeletePage { page_id } => self.delete_page(&page_id),
            EditorCommand::AddObject(object) => self.add_object(object),
            EditorCommand::RemoveObject(id) => self.edit_local(|live| live.remove(&id).map(|_| ())),
            EditorCommand::ReplaceObject(object) => {
                let id = object.id().clone();
                self.edit_local(|live| live.update(&id, move |_| object))
            }
            EditorCommand::MoveObject { id, delta } => {
                self.edit_local(|live| live.update(&id, |o| o.clone().translated(delta)))
            }
            EditorCommand::SetText { id, content } => self.set_text(&id, content),
            EditorCommand::ApplyMasterPage {
                page_id,
                master_page_id,
            } => self.apply_master_page(&page_id, master_page_id),
            EditorCommand::OverrideMasterObject(id) => self.override_object(&id),
            EditorCommand::CreateMasterFromPage { name } => self.create_master_from_page(name),
            EditorCommand::DeleteMasterPage { master_page_id } => {
                self.delete_master_page(&master_page_id)
            }
            EditorCommand::Guide(event) => self.apply_guide_event(event),
            EditorCommand::BeginMove { id, at } => self.begin_move(id, at),
            EditorCommand::BeginGuideDrag {
                orientation,
                position,
            } => self.begin_guide_drag(orientation, position),
            EditorCommand::DragTo { at } => self.drag_to(at, now),
            EditorCommand::EndDrag => self.end_drag(),
            EditorCommand::CancelDrag => self.cancel_drag(),
            EditorCommand::TakeSnapshot => self.take_snapshot(),
            EditorCommand::RecoverPage => self.recover_page(),
        }
    }

    fn update_document<'a, F>(&self, edit: F)
    where
        F: FnOnce(&mut Document) + 'a,
    {
        self.ctx.store.update(Box::new(move |current: &Document| {
            let mut next = current.clone();
            edit(&mut next);
            next
        }));
    }

    // Pages

    /// Write the live objects of the displayed page to its record.
    fn save_page(&mut self) -> bool {
        let Some(page_id) = self.active_page.clone() else {
            return false;
        };
        let snapshot = serialize(&mut self.live, &self.background);
        let mut saved = false;
        self.update_document(|doc| match doc.page_mut(&page_id) {
            Some(page) => {
                page.store_snapshot(&snapshot);
                saved = true;
            }
            None => log::warn!("Page not found: {}", page_id),
        });
        if saved {
            log::debug!("Saved page {} ({} objects)", page_id, snapshot.len());
        }
        saved
    }

    fn open_page(&mut self, page_id: &str, now: Instant) -> CommandOutcome {
        if self.ctx.store.get().page(page_id).is_none() {
            log::warn!("Page not found: {}", page_id);
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        }

        // The outgoing page is captured before anything is cleared.
        self.abandon_drag();
        self.save_page();
        self.recovery.stop_snapshots();

        let document = self.ctx.store.get();
        let Some(page) = document.page(page_id) else {
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        };
        let load = build_page(&document, page);
        let (objects, skipped) = (load.live.len(), load.skipped);
        if skipped > 0 {
            log::error!("Page {}: {} objects could not be reconstructed", page_id, skipped);
        }
        self.install_page(page_id, load, now);
        log::debug!("Opened page {} ({} objects)", page_id, objects);
        CommandOutcome::PageOpened {
            page_id: page_id.to_string(),
            objects,
            skipped,
        }
    }

    fn install_page(&mut self, page_id: &str, load: PageLoad, now: Instant) {
        self.live = load.live;
        self.background = load.background;
        self.active_page = Some(page_id.to_string());
        self.indicators.clear();
        self.recovery.start_snapshots(page_id, now);
    }

    fn close_page(&mut self) {
        self.drag = None;
        self.live.clear();
        self.active_page = None;
        self.indicators.clear();
        self.recovery.stop_snapshots();
        self.background = self.ctx.store.get().metadata.background;
    }

    fn insert_page(&mut self, index: usize) -> CommandOutcome {
        let mut inserted = String::new();
        self.update_document(|doc| inserted = doc.insert_page(index));
        log::debug!("Inserted page {} at {}", inserted, index);
        CommandOutcome::PageInserted(inserted)
    }

    fn delete_page(&mut self, page_id: &str) -> CommandOutcome {
        let mut removed = false;
        self.update_document(|doc| removed = doc.delete_page(page_id).is_some());
        if !removed {
            log::warn!("Page not found: {}", page_id);
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        }
        self.recovery.forget(page_id);
        if self.active_page.as_deref() == Some(page_id) {
            self.close_page();
        }
        log::debug!("Deleted page {}", page_id);
        CommandOutcome::Applied
    }

    // Objects

    fn edit_local<F>(&mut self, edit: F) -> CommandOutcome
    where
        F: FnOnce(&mut LiveObjectSet) -> Result<(), EditError>,
    {
        if self.active_page.is_none() {
            return no_page();
        }
        match edit(&mut self.live) {
            Ok(()) => {
                self.save_page();
                CommandOutcome::Applied
            }
            Err(e) => e.into(),
        }
    }

    fn add_object(&mut self, object: CanvasObject) -> CommandOutcome {
        if self.active_page.is_none() {
            return no_page();
        }
        let object = if object.id().is_missing() {
            object.with_id(ObjectId::new())
        } else {
            object
        };
        match self.live.insert(object) {
            Ok(id) => {
                self.save_page();
                CommandOutcome::ObjectAdded(id)
            }
            Err(e) => e.into(),
        }
    }

    fn set_text(&mut self, id: &ObjectId, content: String) -> CommandOutcome {
        if self.active_page.is_none() {
            return no_page();
        }
        match self.live.get(id) {
            None => return EditError::NotFound(id.clone()).into(),
            Some(object) if object.shape.as_text_frame().is_none() => {
                return EditError::NotTextFrame(id.clone()).into();
            }
            Some(_) => {}
        }
        if let Err(e) = self.live.update(id, |o| with_content(o, content)) {
            return e.into();
        }
        self.reflow(id);
        self.save_page();
        CommandOutcome::Applied
    }

    /// Hand the chain containing `id` to the text flow and apply what comes back.
    fn reflow(&mut self, id: &ObjectId) {
        let chain = chain_of(&self.live, id);
        if chain.is_empty() {
            return;
        }
        let frames: Vec<&CanvasObject> = chain.iter().filter_map(|id| self.live.get(id)).collect();
        let updates = self.ctx.text_flow.reflow(&frames);
        log::debug!(
            "Reflowed chain of {} frames, {} changed",
            chain.len(),
            updates.len()
        );
        for update in updates {
            if !chain.contains(&update.id) {
                log::warn!("Text flow returned {} outside the chain, ignoring", update.id);
                continue;
            }
            if let Err(e) = self.live.update(&update.id, |o| with_content(o, update.content)) {
                log::warn!("Reflow of {} refused: {}", update.id, e);
            }
        }
    }

    // Master pages

    fn apply_master_page(&mut self, page_id: &str, master_page_id: Option<String>) -> CommandOutcome {
        let document = self.ctx.store.get();
        let Some(page) = document.page(page_id) else {
            log::warn!("Page not found: {}", page_id);
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        };
        if let Some(master_id) = &master_page_id {
            if document.master_page(master_id).is_none() {
                log::warn!("Master page not found: {}", master_id);
                return CommandOutcome::Ignored(format!("master page {master_id} not found"));
            }
        }

        // Overrides name objects of the previous master.
        let master_changed = page.master_page_id != master_page_id;
        self.update_document(|doc| {
            if let Some(page) = doc.page_mut(page_id) {
                if master_changed {
                    page.overrides.clear();
                }
                page.master_page_id = master_page_id.clone();
            }
        });

        if self.active_page.as_deref() == Some(page_id) {
            self.refresh_master_instances();
            self.save_page();
        }
        match &master_page_id {
            Some(master_id) => log::info!("Applied master page {} to page {}", master_id, page_id),
            None => log::info!("Detached page {} from its master page", page_id),
        }
        CommandOutcome::Applied
    }

    /// Re-resolve the inherited objects of the displayed page.
    fn refresh_master_instances(&mut self) -> usize {
        let document = self.ctx.store.get();
        let Some(page) = self.active_page.as_deref().and_then(|id| document.page(id)) else {
            return 0;
        };
        master::apply_to_live(&mut self.live, master::resolve(&document, page))
    }

    fn override_object(&mut self, id: &ObjectId) -> CommandOutcome {
        let Some(page_id) = self.active_page.clone() else {
            return no_page();
        };
        let Some(mut page) = self.ctx.store.get().page(&page_id).cloned() else {
            log::warn!("Page not found: {}", page_id);
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        };
        match override_master_object(&mut self.live, &mut page, id) {
            Ok(replacement) => {
                let overrides = page.overrides;
                self.update_document(|doc| {
                    if let Some(page) = doc.page_mut(&page_id) {
                        page.overrides = overrides;
                    }
                });
                self.save_page();
                CommandOutcome::Overridden(replacement.id().clone())
            }
            Err(e) => e.into(),
        }
    }

    fn create_master_from_page(&mut self, name: String) -> CommandOutcome {
        if self.active_page.is_none() {
            return no_page();
        }
        let master = master::master_from_objects(name, self.live.local_objects());
        let master_id = master.id.clone();
        log::info!(
            "Created master page {} from {} objects",
            master_id,
            master.object_snapshot.len()
        );
        self.update_document(|doc| doc.upsert_master_page(master));
        CommandOutcome::MasterCreated(master_id)
    }

    fn delete_master_page(&mut self, master_page_id: &str) -> CommandOutcome {
        let mut removed = false;
        self.update_document(|doc| removed = doc.delete_master_page(master_page_id).is_some());
        if !removed {
            log::warn!("Master page not found: {}", master_page_id);
            return CommandOutcome::Ignored(format!("master page {master_page_id} not found"));
        }
        if self.active_page.is_some() {
            self.refresh_master_instances();
            self.save_page();
        }
        log::info!("Deleted master page {}", master_page_id);
        CommandOutcome::Applied
    }

    // Guides

    fn apply_guide_event(&mut self, event: GuideEvent) -> CommandOutcome {
        let Some(page_id) = self.active_page.clone() else {
            return no_page();
        };
        let mut changed = false;
        self.update_document(|doc| {
            if let Some(page) = doc.page_mut(&page_id) {
                changed = GuideManager::apply(&mut page.guides, event);
            }
        });
        if changed {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored("guide unchanged".to_string())
        }
    }

    // Drags

    fn begin_move(&mut self, id: ObjectId, at: Point) -> CommandOutcome {
        if self.active_page.is_none() {
            return no_page();
        }
        self.abandon_drag();
        let original = match self.live.get(&id) {
            None => return EditError::NotFound(id).into(),
            Some(object) if object.is_from_master() => {
                return EditError::MasterObjectLocked(id).into();
            }
            Some(object) => object.clone(),
        };
        self.drag = Some(DragSession::Move {
            id,
            origin: at,
            original,
        });
        CommandOutcome::Applied
    }

    fn begin_guide_drag(&mut self, orientation: Orientation, position: f64) -> CommandOutcome {
        if self.active_page.is_none() {
            return no_page();
        }
        self.abandon_drag();
        self.drag = Some(DragSession::Guide(GuideDrag::new(orientation, position)));
        CommandOutcome::Applied
    }

    fn drag_to(&mut self, at: Point, now: Instant) -> CommandOutcome {
        let (id, mut target) = match &mut self.drag {
            None => return CommandOutcome::Ignored("no drag in progress".to_string()),
            Some(DragSession::Guide(drag)) => {
                let position = match drag.orientation {
                    Orientation::Horizontal => at.y,
                    Orientation::Vertical => at.x,
                };
                drag.move_to(position);
                return CommandOutcome::Applied;
            }
            Some(DragSession::Move {
                id,
                origin,
                original,
            }) => (id.clone(), original.clone().translated(at - *origin)),
        };

        let document = self.ctx.store.get();
        let Some(page) = self.active_page.as_deref().and_then(|id| document.page(id)) else {
            return no_page();
        };
        let options = self.ctx.config.snap_options(document.metadata.grid_size_px());
        let siblings = self.live.sibling_bounds(&id);
        let result = snap_object(&mut target, &options, &page.guides, &siblings);

        if let Err(e) = self.live.update(&id, move |_| target) {
            self.drag = None;
            return e.into();
        }
        self.indicators.show(&result, now);
        CommandOutcome::Moved(result)
    }

    fn end_drag(&mut self) -> CommandOutcome {
        match self.drag.take() {
            None => CommandOutcome::Ignored("no drag in progress".to_string()),
            Some(DragSession::Move { id, .. }) => {
                log::debug!("Moved {}", id);
                self.save_page();
                CommandOutcome::Applied
            }
            Some(DragSession::Guide(drag)) => {
                let metadata = self.ctx.store.get().metadata;
                let extent = match drag.orientation {
                    Orientation::Horizontal => metadata.page_height,
                    Orientation::Vertical => metadata.page_width,
                };
                match drag.release(extent) {
                    Some(event) => self.apply_guide_event(event),
                    None => {
                        log::debug!("Guide released outside the page, discarded");
                        CommandOutcome::Ignored("guide released outside the page".to_string())
                    }
                }
            }
        }
    }

    fn cancel_drag(&mut self) -> CommandOutcome {
        match self.drag.take() {
            None => CommandOutcome::Ignored("no drag in progress".to_string()),
            Some(DragSession::Move { id, original, .. }) => {
                if let Err(e) = self.live.update(&id, move |_| original) {
                    log::warn!("Could not restore {} after cancelled drag: {}", id, e);
                }
                self.indicators.clear();
                CommandOutcome::Applied
            }
            Some(DragSession::Guide(_)) => CommandOutcome::Applied,
        }
    }

    fn abandon_drag(&mut self) {
        if self.drag.is_some() {
            log::debug!("Abandoning drag in progress");
            self.cancel_drag();
        }
    }

    // Recovery

    fn take_snapshot(&mut self) -> CommandOutcome {
        let Some(page_id) = self.active_page.clone() else {
            return no_page();
        };
        let live = &mut self.live;
        let background = &self.background;
        let taken = self.recovery.take_snapshot(&page_id, |id| {
            Some(PageCapture::new(id, serialize(live, background)))
        });
        if taken {
            CommandOutcome::Applied
        } else {
            CommandOutcome::Ignored("snapshot failed".to_string())
        }
    }

    fn recover_page(&mut self) -> CommandOutcome {
        let Some(page_id) = self.active_page.clone() else {
            return no_page();
        };
        let Some(reconstruction) = self.recovery.recover_page(&page_id, |r| r) else {
            return CommandOutcome::Ignored(format!("no snapshot of page {page_id}"));
        };
        self.abandon_drag();
        let document = self.ctx.store.get();
        let Some(page) = document.page(&page_id) else {
            log::warn!("Page not found: {}", page_id);
            return CommandOutcome::Ignored(format!("page {page_id} not found"));
        };
        let load = page_load(&document, page, reconstruction);
        let objects = load.live.len();
        self.live = load.live;
        self.background = load.background;
        self.indicators.clear();
        self.save_page();
        CommandOutcome::Recovered { objects }
    }

    // Durable storage

    /// Save the displayed page, then write the document to `storage`.
    pub async fn save_document<S: Storage + ?Sized>(&mut self, storage: &S) -> StorageResult<()> {
        self.save_page();
        let document = self.ctx.store.get();
        storage.save(&document.id, &document).await?;
        log::debug!("Saved document {}", document.id);
        Ok(())
    }

    /// Load document `id` from `storage` and display one of its pages.
    ///
    /// The displayed page is saved first. A stored page record older than the
    /// in-memory one loses to it. When the load fails or runs past the configured
    /// timeout, the in-memory document stays and the displayed page is rebuilt
    /// from its record, else its latest recovery snapshot, else empty.
    pub async fn load_document<S: Storage + ?Sized>(
        &mut self,
        storage: &S,
        id: &str,
        now: Instant,
    ) -> LoadOutcome {
        self.abandon_drag();
        self.save_page();

        let timeout = self.ctx.config.load_timeout();
        match load_with_timeout(storage, id, timeout).await {
            Ok(loaded) => {
                let mut kept_in_memory = 0;
                self.ctx
                    .store
                    .update(Box::new(|current: &Document| {
                        merge_loaded(current, loaded, &mut kept_in_memory)
                    }));
                let document = self.ctx.store.get();
                let page_id = self
                    .active_page
                    .clone()
                    .filter(|id| document.page(id).is_some())
                    .or_else(|| document.pages.first().map(|p| p.id.clone()));
                match page_id.as_deref().and_then(|id| document.page(id)) {
                    Some(page) => {
                        self.recovery.stop_snapshots();
                        let load = build_page(&document, page);
                        self.install_page(&page.id, load, now);
                    }
                    None => self.close_page(),
                }
                log::info!("Loaded document {}", document.id);
                LoadOutcome::Loaded {
                    document_id: document.id,
                    kept_in_memory,
                }
            }
            Err(error) => {
                log::error!("Loading document {} failed: {}, rebuilding from memory", id, error);
                let source = self.emergency_rebuild(now);
                LoadOutcome::Emergency { error, source }
            }
        }
    }

    fn emergency_rebuild(&mut self, now: Instant) -> EmergencySource {
        let document = self.ctx.store.get();
        let page = self
            .active_page
            .as_deref()
            .and_then(|id| document.page(id))
            .or_else(|| document.pages.first());
        let Some(page) = page else {
            self.close_page();
            return EmergencySource::Empty;
        };

        let (reconstruction, source) = match page.snapshot() {
            Some(snapshot) => (reconstruct(&snapshot), EmergencySource::PageRecord),
            None => match self.recovery.recover_page(&page.id, |r| r) {
                Some(reconstruction) => (reconstruction, EmergencySource::RecoverySnapshot),
                None => (
                    reconstruct(&Snapshot::empty(document.metadata.background.clone())),
                    EmergencySource::Empty,
                ),
            },
        };
        self.recovery.stop_snapshots();
        let load = page_load(&document, page, reconstruction);
        self.install_page(&page.id, load, now);
        log::warn!("Page {} rebuilt from {:?}", page.id, source);
        source
    }
}

fn no_page() -> CommandOutcome {
    log::warn!("No page is open");
    CommandOutcome::Ignored("no page is open".to_string())
}

fn with_content(object: &CanvasObject, content: String) -> CanvasObject {
    let mut next = object.clone();
    if let Some(frame) = next.shape.as_text_frame_mut() {
        frame.content = content;
    }
    next
}

/// Reconstruct a page record and resolve its master page.
fn build_page(document: &Document, page: &Page) -> PageLoad {
    let snapshot = page
        .snapshot()
        .unwrap_or_else(|| Snapshot::empty(document.metadata.background.clone()));
    page_load(document, page, reconstruct(&snapshot))
}

fn page_load(document: &Document, page: &Page, reconstruction: Reconstruction) -> PageLoad {
    let skipped = reconstruction.errors.len();
    let mut live = LiveObjectSet::from_objects(reconstruction.objects);
    master::apply_to_live(&mut live, master::resolve(document, page));
    PageLoad {
        live,
        background: reconstruction.background,
        skipped,
    }
}

/// Take `loaded`, except where the in-memory document of the same id is newer.
fn merge_loaded(current: &Document, mut loaded: Document, kept: &mut usize) -> Document {
    for page in &mut loaded.pages {
        page.guides = std::mem::take(&mut page.guides).sanitized();
    }
    if loaded.id != current.id {
        return loaded;
    }
    for page in &mut loaded.pages {
        let Some(mine) = current.page(&page.id) else {
            continue;
        };
        if mine.revision > page.revision {
            log::warn!(
                "Stored record of page {} is stale (revision {} < {}), keeping the in-memory one",
                page.id,
                page.revision,
                mine.revision
            );
            *page = mine.clone();
            *kept += 1;
        }
    }
    // Pages created since the stored copy was written.
    for (index, mine) in current.pages.iter().enumerate() {
        if loaded.page(&mine.id).is_none() && mine.revision > 0 {
            log::warn!("Page {} is missing from the stored document, keeping it", mine.id);
            let at = index.min(loaded.pages.len());
            loaded.pages.insert(at, mine.clone());
            *kept += 1;
        }
    }
    loaded
}
