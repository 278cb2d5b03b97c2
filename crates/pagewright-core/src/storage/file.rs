//! One JSON file per document, for native platforms.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::document::Document;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const EXTENSION: &str = "json";

fn io_error(action: &str, path: &Path, error: io::Error) -> StorageError {
    StorageError::Io(format!("Failed to {} {}: {}", action, path.display(), error))
}

/// Stores each document as `<dir>/<id>.json`.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open a storage directory, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> StorageResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| io_error("create", &dir, e))?;
        Ok(Self { dir })
    }

    /// Open `pagewright/documents` under the platform's local data directory.
    pub fn default_location() -> StorageResult<Self> {
        let root = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("No local data directory on this platform".to_string()))?;
        Self::new(root.join("pagewright").join("documents"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Ids map to file names with anything outside `[A-Za-z0-9_-]` replaced by `_`.
    fn path_for(&self, id: &str) -> PathBuf {
        let stem: String = id
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
                _ => '_',
            })
            .collect();
        self.dir.join(stem).with_extension(EXTENSION)
    }

    fn write_atomically(path: &Path, bytes: &[u8]) -> StorageResult<()> {
        let staging = path.with_extension("json.partial");
        fs::write(&staging, bytes).map_err(|e| io_error("write", &staging, e))?;
        fs::rename(&staging, path).map_err(|e| {
            // The staging file is useless once the rename has failed.
            let _ = fs::remove_file(&staging);
            io_error("replace", path, e)
        })
    }

    fn read_document(path: &Path, id: &str) -> StorageResult<Document> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(id.to_string()));
            }
            Err(e) => return Err(io_error("read", path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| {
            log::error!("Document file {} is unreadable: {}", path.display(), e);
            StorageError::Serialization(format!("{}: {}", path.display(), e))
        })
    }

    fn stored_ids(&self) -> StorageResult<Vec<String>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("list", &self.dir, e)),
        };
        let mut ids: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some(EXTENSION))
            .filter_map(|path| path.file_stem().and_then(|stem| stem.to_str()).map(String::from))
            .collect();
        ids.sort();
        Ok(ids)
    }
}

impl Storage for FileStorage {
    fn save(&self, id: &str, document: &Document) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.path_for(id);
        let encoded = serde_json::to_vec_pretty(document);
        Box::pin(async move {
            let bytes = encoded.map_err(|e| StorageError::Serialization(e.to_string()))?;
            Self::write_atomically(&path, &bytes)?;
            log::debug!("Saved document to {}", path.display());
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<Document>> {
        let path = self.path_for(id);
        let id = id.to_string();
        Box::pin(async move { Self::read_document(&path, &id) })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.path_for(id);
        Box::pin(async move {
            match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(io_error("delete", &path, e)),
            }
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move { self.stored_ids() })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.path_for(id);
        Box::pin(async move { Ok(path.is_file()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;
    use tempfile::tempdir;

    #[test]
    fn test_saved_document_reads_back() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let mut doc = Document::new();
        doc.metadata.name = "Brochure".to_string();
        doc.pages[0].guides.vertical.push(120.0);

        block_on(storage.save("brochure", &doc)).unwrap();
        let loaded = block_on(storage.load("brochure")).unwrap();

        assert_eq!(loaded, doc);
        assert!(!dir.path().join("brochure.json.partial").exists());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let result = block_on(storage.load("nonexistent"));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_corrupt_file_is_serialization_error() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let result = block_on(storage.load("broken"));
        assert!(matches!(result, Err(StorageError::Serialization(_))));
    }

    #[test]
    fn test_list_skips_foreign_files_and_delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let doc = Document::new();
        block_on(storage.save("doc2", &doc)).unwrap();
        block_on(storage.save("doc1", &doc)).unwrap();
        assert_eq!(
            block_on(storage.list()).unwrap(),
            vec!["doc1".to_string(), "doc2".to_string()]
        );

        block_on(storage.delete("doc1")).unwrap();
        block_on(storage.delete("doc1")).unwrap();
        assert!(!block_on(storage.exists("doc1")).unwrap());
        assert!(block_on(storage.exists("doc2")).unwrap());
    }

    #[test]
    fn test_unsafe_ids_map_into_the_directory() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path()).unwrap();

        let doc = Document::new();
        block_on(storage.save("../spring/issue:3*", &doc)).unwrap();

        assert!(dir.path().join("___spring_issue_3_.json").is_file());
        let loaded = block_on(storage.load("../spring/issue:3*")).unwrap();
        assert_eq!(loaded.id, doc.id);
    }

    #[test]
    fn test_new_creates_nested_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(&nested).unwrap();
        assert!(storage.dir().is_dir());
        assert!(block_on(storage.list()).unwrap().is_empty());
    }
}
