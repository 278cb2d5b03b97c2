//! The document store: sole owner of the current document value.

use crate::document::Document;
use std::sync::RwLock;

/// Update function handed to [`DocumentStore::update`].
pub type DocumentUpdate<'a> = Box<dyn FnOnce(&Document) -> Document + 'a>;

/// Owns the current document. Updates replace the whole value; nothing mutates a
/// document in place.
pub trait DocumentStore {
    /// A copy of the current document.
    fn get(&self) -> Document;

    /// Replace the document with `f(current)`.
    fn update(&self, f: DocumentUpdate<'_>);
}

/// Process-local document store.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    current: RwLock<Document>,
}

impl MemoryDocumentStore {
    pub fn new(document: Document) -> Self {
        Self {
            current: RwLock::new(document),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn get(&self) -> Document {
        match self.current.read() {
            Ok(doc) => doc.clone(),
            Err(poisoned) => {
                log::error!("Document store lock poisoned, reading last value");
                poisoned.into_inner().clone()
            }
        }
    }

    fn update(&self, f: DocumentUpdate<'_>) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::error!("Document store lock poisoned, updating last value");
                poisoned.into_inner()
            }
        };
        let next = f(&guard);
        *guard = next;
    }
}
