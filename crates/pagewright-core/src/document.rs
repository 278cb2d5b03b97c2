//! Documents, pages and master pages.
//!
//! These are plain values. The [`DocumentStore`](crate::store::DocumentStore) owns the
//! current document and replaces it wholesale on every update.

use crate::guides::Guides;
use crate::snapshot::{SerializedObject, Snapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Physical unit of document-level measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    #[default]
    Mm,
    Cm,
    In,
    Pt,
    Px,
}

impl Unit {
    /// Pixels per one unit at the given DPI.
    pub fn pixels_per_unit(self, dpi: f64) -> f64 {
        match self {
            Unit::Mm => dpi / 25.4,
            Unit::Cm => dpi / 2.54,
            Unit::In => dpi,
            Unit::Pt => dpi / 72.0,
            Unit::Px => 1.0,
        }
    }

    /// Convert a value in this unit to pixels.
    pub fn to_pixels(self, value: f64, dpi: f64) -> f64 {
        value * self.pixels_per_unit(dpi)
    }
}

/// Document-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    pub name: String,
    /// Page width in pixels.
    pub page_width: f64,
    /// Page height in pixels.
    pub page_height: f64,
    /// Snapping grid size in `unit`.
    pub grid_size: f64,
    pub unit: Unit,
    /// Resolution used to convert physical units to pixels.
    pub dpi: f64,
    /// Default page background.
    pub background: String,
}

impl Default for DocumentMetadata {
    fn default() -> Self {
        // A4 portrait at 96 DPI, 5 mm grid.
        Self {
            name: "Untitled".to_string(),
            page_width: 794.0,
            page_height: 1123.0,
            grid_size: 5.0,
            unit: Unit::Mm,
            dpi: 96.0,
            background: "white".to_string(),
        }
    }
}

impl DocumentMetadata {
    /// Grid size converted to whole pixels.
    pub fn grid_size_px(&self) -> f64 {
        crate::snap::grid_size_px(self.grid_size, self.unit, self.dpi)
    }
}

/// Durable record of one page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    /// Serialized [`Snapshot`] of the page's objects, or `None` for a never-saved page.
    #[serde(default)]
    pub object_snapshot: Option<String>,
    #[serde(default)]
    pub master_page_id: Option<String>,
    /// Per master object: whether this page replaced it with a local copy.
    #[serde(default)]
    pub overrides: BTreeMap<String, bool>,
    #[serde(default)]
    pub guides: Guides,
    /// Bumped on every capture; lets a stale storage read lose against memory.
    #[serde(default)]
    pub revision: u64,
}

impl Page {
    /// Create a blank page with a fresh id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object_snapshot: None,
            master_page_id: None,
            overrides: BTreeMap::new(),
            guides: Guides::default(),
            revision: 0,
        }
    }

    /// Whether this page replaced the master object `master_object_id` locally.
    pub fn is_overridden(&self, master_object_id: &str) -> bool {
        self.overrides.get(master_object_id).copied().unwrap_or(false)
    }

    /// Parse the stored snapshot. Absent or unreadable data yields `None`.
    pub fn snapshot(&self) -> Option<Snapshot> {
        self.object_snapshot.as_deref().map(Snapshot::parse_lenient)
    }

    /// Store a new snapshot and bump the revision.
    pub fn store_snapshot(&mut self, snapshot: &Snapshot) {
        match snapshot.to_json() {
            Ok(json) => {
                self.object_snapshot = Some(json);
                self.revision += 1;
            }
            Err(e) => log::error!("Failed to encode snapshot for page {}: {}", self.id, e),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

/// A reusable template of objects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasterPage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub object_snapshot: Vec<SerializedObject>,
    /// Parent master whose objects are inherited first.
    #[serde(default)]
    pub based_on: Option<String>,
}

impl MasterPage {
    pub fn new(name: impl Into<String>, objects: Vec<SerializedObject>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            object_snapshot: objects,
            based_on: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn based_on(mut self, parent: impl Into<String>) -> Self {
        self.based_on = Some(parent.into());
        self
    }
}

/// A layout document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub pages: Vec<Page>,
    #[serde(default)]
    pub master_pages: Vec<MasterPage>,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document with one blank page.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            pages: vec![Page::new()],
            master_pages: Vec::new(),
            metadata: DocumentMetadata::default(),
        }
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn page_mut(&mut self, id: &str) -> Option<&mut Page> {
        self.pages.iter_mut().find(|p| p.id == id)
    }

    pub fn master_page(&self, id: &str) -> Option<&MasterPage> {
        self.master_pages.iter().find(|m| m.id == id)
    }

    /// Insert a blank page at `index` (clamped). Returns the new page id.
    pub fn insert_page(&mut self, index: usize) -> String {
        let page = Page::new();
        let id = page.id.clone();
        let index = index.min(self.pages.len());
        self.pages.insert(index, page);
        id
    }

    /// Delete a page. Returns the removed page.
    pub fn delete_page(&mut self, id: &str) -> Option<Page> {
        let pos = self.pages.iter().position(|p| p.id == id)?;
        Some(self.pages.remove(pos))
    }

    /// Replace a page record by id. Returns false if no such page exists.
    pub fn replace_page(&mut self, page: Page) -> bool {
        match self.page_mut(&page.id) {
            Some(slot) => {
                *slot = page;
                true
            }
            None => false,
        }
    }

    /// Add or replace a master page.
    pub fn upsert_master_page(&mut self, master: MasterPage) {
        match self.master_pages.iter_mut().find(|m| m.id == master.id) {
            Some(slot) => *slot = master,
            None => self.master_pages.push(master),
        }
    }

    /// Delete a master page, detaching every page and child master that used it.
    pub fn delete_master_page(&mut self, id: &str) -> Option<MasterPage> {
        let pos = self.master_pages.iter().position(|m| m.id == id)?;
        let removed = self.master_pages.remove(pos);
        for page in &mut self.pages {
            if page.master_page_id.as_deref() == Some(id) {
                page.master_page_id = None;
                page.overrides.clear();
            }
        }
        for master in &mut self.master_pages {
            if master.based_on.as_deref() == Some(id) {
                master.based_on = None;
            }
        }
        Some(removed)
    }

    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserialize a document from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
