//! Durable document storage.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use crate::document::Document;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Default bound on a document load.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(5);

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Document not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Bounds on storage backends: `Send + Sync` on native targets only.
#[cfg(not(target_arch = "wasm32"))]
pub trait StorageBounds: Send + Sync {}

#[cfg(not(target_arch = "wasm32"))]
impl<T: Send + Sync + ?Sized> StorageBounds for T {}

#[cfg(target_arch = "wasm32")]
pub trait StorageBounds {}

#[cfg(target_arch = "wasm32")]
impl<T: ?Sized> StorageBounds for T {}

/// A durable home for documents, keyed by document id.
pub trait Storage: StorageBounds {
    /// Write `document` under `id`, replacing any previous copy.
    fn save(&self, id: &str, document: &Document) -> BoxFuture<'_, StorageResult<()>>;

    /// Read the document stored under `id`. Missing documents are `NotFound`.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Document>>;

    /// Remove the document under `id`. Removing a missing document succeeds.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// Ids of all stored documents, sorted.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}

/// Load a document, giving up after `timeout`.
#[cfg(not(target_arch = "wasm32"))]
pub async fn load_with_timeout<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
    timeout: Duration,
) -> StorageResult<Document> {
    match tokio::time::timeout(timeout, storage.load(id)).await {
        Ok(result) => result,
        Err(_) => Err(StorageError::Timeout(timeout)),
    }
}

/// Load a document. The browser event loop has no timer to race the load against.
#[cfg(target_arch = "wasm32")]
pub async fn load_with_timeout<S: Storage + ?Sized>(
    storage: &S,
    id: &str,
    _timeout: Duration,
) -> StorageResult<Document> {
    storage.load(id).await
}

/// Create file storage in the default location.
#[cfg(not(target_arch = "wasm32"))]
pub fn create_default_storage() -> StorageResult<FileStorage> {
    FileStorage::default_location()
}

/// Drive a storage future to completion on a throwaway runtime.
#[cfg(test)]
pub(crate) fn block_on<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("test runtime")
        .block_on(future)
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;

    /// A backend whose loads never complete.
    struct HangingStorage;

    impl Storage for HangingStorage {
        fn save(&self, _id: &str, _document: &Document) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn load(&self, _id: &str) -> BoxFuture<'_, StorageResult<Document>> {
            Box::pin(std::future::pending())
        }

        fn delete(&self, _id: &str) -> BoxFuture<'_, StorageResult<()>> {
            Box::pin(async { Ok(()) })
        }

        fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
            Box::pin(async { Ok(Vec::new()) })
        }

        fn exists(&self, _id: &str) -> BoxFuture<'_, StorageResult<bool>> {
            Box::pin(async { Ok(false) })
        }
    }

    #[tokio::test]
    async fn test_load_times_out() {
        let result = load_with_timeout(&HangingStorage, "doc", Duration::from_millis(20)).await;
        assert!(matches!(result, Err(StorageError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_load_within_timeout() {
        let storage = MemoryStorage::new();
        let doc = Document::new();
        storage.save("doc", &doc).await.unwrap();
        let loaded = load_with_timeout(&storage, "doc", DEFAULT_LOAD_TIMEOUT).await.unwrap();
        assert_eq!(loaded.id, doc.id);
    }
}
