//! Process-local storage backend.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::document::Document;
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Keeps documents in memory. Used by tests and by embeddings without a disk.
#[derive(Default)]
pub struct MemoryStorage {
    documents: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    // A panic while holding the lock cannot leave a half-written map: every
    // mutation is a single insert or remove.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Document>> {
        self.documents.read().unwrap_or_else(|poisoned| {
            log::error!("Memory storage lock poisoned, continuing");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Document>> {
        self.documents.write().unwrap_or_else(|poisoned| {
            log::error!("Memory storage lock poisoned, continuing");
            poisoned.into_inner()
        })
    }
}

impl Storage for MemoryStorage {
    fn save(&self, id: &str, document: &Document) -> BoxFuture<'_, StorageResult<()>> {
        let previous = self.write().insert(id.to_string(), document.clone());
        if previous.is_none() {
            log::debug!("Stored new document {} in memory", id);
        }
        Box::pin(async { Ok(()) })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Document>> {
        let found = self
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()));
        Box::pin(async move { found })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        self.write().remove(id);
        Box::pin(async { Ok(()) })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let ids = self.read().keys().cloned().collect();
        Box::pin(async move { Ok(ids) })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let present = self.read().contains_key(id);
        Box::pin(async move { Ok(present) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;

    #[test]
    fn test_save_and_load_keeps_overrides() {
        let storage = MemoryStorage::new();
        let mut doc = Document::new();
        doc.pages[0].overrides.insert("obj-1".into(), true);

        block_on(storage.save("test", &doc)).unwrap();
        let loaded = block_on(storage.load("test")).unwrap();

        assert_eq!(loaded, doc);
        assert!(loaded.pages[0].is_overridden("obj-1"));
    }

    #[test]
    fn test_save_is_a_copy() {
        let storage = MemoryStorage::new();
        let mut doc = Document::new();
        block_on(storage.save("test", &doc)).unwrap();

        doc.metadata.name = "Changed after save".to_string();
        let loaded = block_on(storage.load("test")).unwrap();
        assert_ne!(loaded.metadata.name, doc.metadata.name);
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("nonexistent"));

        assert!(matches!(result, Err(StorageError::NotFound(id)) if id == "nonexistent"));
    }

    #[test]
    fn test_delete_and_exists() {
        let storage = MemoryStorage::new();
        let doc = Document::new();

        assert!(!block_on(storage.exists("test")).unwrap());
        block_on(storage.save("test", &doc)).unwrap();
        assert!(block_on(storage.exists("test")).unwrap());
        assert_eq!(storage.len(), 1);

        block_on(storage.delete("test")).unwrap();
        block_on(storage.delete("test")).unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn test_list_is_sorted() {
        let storage = MemoryStorage::new();
        let doc = Document::new();

        block_on(storage.save("spring-catalog", &doc)).unwrap();
        block_on(storage.save("autumn-catalog", &doc)).unwrap();

        assert_eq!(
            block_on(storage.list()).unwrap(),
            vec!["autumn-catalog".to_string(), "spring-catalog".to_string()]
        );
    }
}
