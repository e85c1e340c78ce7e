// src/storage/file_storage.rs
//! Production storage backend: one file per document under `<base>/<collection>/<id>.doc`.
//! Writes go to a temp file in the same directory and are renamed into place, so a crash
//! mid-write never leaves a torn document behind. Directory creation is memoized so a hot
//! write path doesn't repeatedly stat a directory that's already there.

use crate::document::DocumentId;
use crate::error::{MongoLiteError, Result};
use crate::storage::traits::Storage;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const DOC_EXTENSION: &str = "doc";

pub struct FileStorage {
    base: PathBuf,
    known_dirs: HashSet<String>,
}

impl FileStorage {
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(FileStorage {
            base,
            known_dirs: HashSet::new(),
        })
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.base.join(collection)
    }

    fn doc_path(&self, collection: &str, id: &DocumentId) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.{}", id.as_str(), DOC_EXTENSION))
    }

    fn ensure_dir(&mut self, collection: &str) -> Result<()> {
        if self.known_dirs.contains(collection) {
            return Ok(());
        }
        fs::create_dir_all(self.collection_dir(collection))?;
        self.known_dirs.insert(collection.to_string());
        Ok(())
    }

    fn write_bytes_atomic(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let dir = path.parent().ok_or_else(|| {
            MongoLiteError::Corruption(format!("document path has no parent: {}", path.display()))
        })?;
        let tmp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple()));
        {
            let mut file = fs::File::create(&tmp_path)?;
            file.write_all(&(bytes.len() as u32).to_le_bytes())?;
            file.write_all(bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        let mut file = match fs::File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut len_buf = [0u8; 4];
        if file.read_exact(&mut len_buf).is_err() {
            return Ok(None);
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        let mut body = vec![0u8; len];
        file.read_exact(&mut body)?;
        Ok(Some(body))
    }
}

impl Storage for FileStorage {
    fn write(&mut self, collection: &str, id: &DocumentId, doc: &Value) -> Result<()> {
        self.ensure_dir(collection)?;
        let path = self.doc_path(collection, id);
        let bytes = serde_json::to_vec(doc)?;
        self.write_bytes_atomic(&path, &bytes)
    }

    fn read(&self, collection: &str, id: &DocumentId) -> Result<Option<Value>> {
        let path = self.doc_path(collection, id);
        match Self::read_bytes(&path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn read_all(&self, collection: &str) -> Result<Vec<Value>> {
        let dir = self.collection_dir(collection);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let paths: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(DOC_EXTENSION))
            .collect();

        let mut docs = Vec::with_capacity(paths.len());
        for chunk in paths.chunks(crate::storage::READ_BATCH_SIZE) {
            for path in chunk {
                if let Some(bytes) = Self::read_bytes(path)? {
                    docs.push(serde_json::from_slice(&bytes)?);
                }
            }
        }
        Ok(docs)
    }

    fn delete(&mut self, collection: &str, id: &DocumentId) -> Result<bool> {
        let path = self.doc_path(collection, id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn create_collection(&mut self, name: &str) -> Result<()> {
        self.ensure_dir(name)
    }

    fn drop_collection(&mut self, name: &str) -> Result<()> {
        self.known_dirs.remove(name);
        match fs::remove_dir_all(self.collection_dir(name)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn list_collections(&self) -> Vec<String> {
        let entries = match fs::read_dir(&self.base) {
            Ok(e) => e,
            Err(_) => return Vec::new(),
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path()).unwrap();
        (dir, storage)
    }

    #[test]
    fn write_then_read_roundtrips() {
        let (_dir, mut s) = storage();
        let id = DocumentId::from_string("abc");
        s.write("users", &id, &json!({"name": "Alice"})).unwrap();
        let read = s.read("users", &id).unwrap().unwrap();
        assert_eq!(read["name"], "Alice");
    }

    #[test]
    fn missing_read_is_ok_none_not_an_error() {
        let (_dir, s) = storage();
        let id = DocumentId::from_string("missing");
        assert!(s.read("users", &id).unwrap().is_none());
    }

    #[test]
    fn delete_missing_returns_false_without_error() {
        let (_dir, mut s) = storage();
        let id = DocumentId::from_string("missing");
        assert!(!s.delete("users", &id).unwrap());
    }

    #[test]
    fn delete_existing_removes_it() {
        let (_dir, mut s) = storage();
        let id = DocumentId::from_string("abc");
        s.write("users", &id, &json!({"x": 1})).unwrap();
        assert!(s.delete("users", &id).unwrap());
        assert!(s.read("users", &id).unwrap().is_none());
    }

    #[test]
    fn read_all_returns_every_document_in_a_collection() {
        let (_dir, mut s) = storage();
        for n in 0..5 {
            s.write("items", &DocumentId::from_string(n.to_string()), &json!({"n": n}))
                .unwrap();
        }
        let all = s.read_all("items").unwrap();
        assert_eq!(all.len(), 5);
    }

    #[test]
    fn read_all_on_nonexistent_collection_is_empty() {
        let (_dir, s) = storage();
        assert!(s.read_all("ghost").unwrap().is_empty());
    }

    #[test]
    fn list_collections_reflects_created_directories() {
        let (_dir, mut s) = storage();
        s.create_collection("users").unwrap();
        s.create_collection("orders").unwrap();
        assert_eq!(s.list_collections(), vec!["orders", "users"]);
    }

    #[test]
    fn drop_collection_removes_its_directory_and_documents() {
        let (_dir, mut s) = storage();
        let id = DocumentId::from_string("abc");
        s.write("users", &id, &json!({"x": 1})).unwrap();
        s.drop_collection("users").unwrap();
        assert!(s.read("users", &id).unwrap().is_none());
        assert!(!s.list_collections().contains(&"users".to_string()));
    }

    #[test]
    fn overwrite_replaces_body_atomically() {
        let (_dir, mut s) = storage();
        let id = DocumentId::from_string("abc");
        s.write("users", &id, &json!({"name": "Alice"})).unwrap();
        s.write("users", &id, &json!({"name": "Bob"})).unwrap();
        let read = s.read("users", &id).unwrap().unwrap();
        assert_eq!(read["name"], "Bob");
    }
}
