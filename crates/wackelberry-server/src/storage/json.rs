//! JSON document storage.
//!
//! The user collection is one pretty-printed JSON object keyed by user id:
//!
//! ```json
//! {
//!     "42": { "id": "42", "name": "Ada", "approved": true, "pending": false,
//!             "admin": false, "blocked": false }
//! }
//! ```
//!
//! Saves write a sibling temp file and rename it over the document, so a
//! crash mid-save leaves the previous document in place.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use wackelberry_core::{UserDirectory, UserRecord};

use super::{StorageError, UserStorage};

/// Storage backed by a single JSON file.
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Storage at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl UserStorage for JsonFileStorage {
    fn load(&self) -> Result<UserDirectory, StorageError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(UserDirectory::new()),
            Err(e) => return Err(e.into()),
        };

        if text.trim().is_empty() {
            return Ok(UserDirectory::new());
        }

        let document: BTreeMap<String, UserRecord> = serde_json::from_str(&text)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        for (key, record) in &document {
            if *key != record.id.to_string() {
                tracing::warn!(%key, user_id = %record.id, "document key differs from record id");
            }
        }

        Ok(UserDirectory::from_records(document.into_values()))
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), StorageError> {
        let document: BTreeMap<String, &UserRecord> =
            directory.records().map(|record| (record.id.to_string(), record)).collect();

        let bytes = serde_json::to_vec_pretty(&document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        let temp = self.temp_path();
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;
    use wackelberry_core::{UserId, UserStatus};

    use super::*;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("users.json"));

        assert!(storage.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load() {
        let dir = tempdir().unwrap();
        let storage = JsonFileStorage::new(dir.path().join("users.json"));

        let mut directory = UserDirectory::new();
        directory.insert(UserRecord::pending(UserId::new(7), "Seven"));
        storage.save(&directory).unwrap();

        let loaded = storage.load().unwrap();
        assert_eq!(loaded.status(UserId::new(7)), UserStatus::Pending);
        assert_eq!(loaded.get(UserId::new(7)).map(|r| r.name.as_str()), Some("Seven"));
        assert!(!storage.temp_path().exists());
    }

    #[test]
    fn loads_documents_with_numeric_ids() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(
            &path,
            r#"{
    "100": {"id": 100, "name": "Admin", "approved": false, "pending": false, "admin": true, "blocked": false},
    "200": {"id": 200, "name": "Guest", "approved": false, "pending": true, "admin": false, "blocked": false}
}"#,
        )
        .unwrap();

        let loaded = JsonFileStorage::new(&path).load().unwrap();

        assert_eq!(loaded.status(UserId::new(100)), UserStatus::Admin);
        assert_eq!(loaded.status(UserId::new(200)), UserStatus::Pending);
    }

    #[test]
    fn corrupt_document_is_serialization_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStorage::new(&path).load().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }
}
