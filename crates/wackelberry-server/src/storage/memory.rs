//! In-memory user storage.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use wackelberry_core::{UserDirectory, UserRecord};

use super::{StorageError, UserStorage};

/// In-memory storage implementation for testing and simulation
///
/// Keeps the records of the last save. Counts loads and saves so tests can
/// assert how many writes an operation performed. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    records: Arc<Mutex<Vec<UserRecord>>>,
    loads: Arc<AtomicUsize>,
    saves: Arc<AtomicUsize>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-populated with `records` (not counted as a save).
    pub fn with_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let storage = Self::new();
        *storage.lock() = records.into_iter().collect();
        storage
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Number of loads.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UserRecord>> {
        self.records.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl UserStorage for MemoryStorage {
    fn load(&self) -> Result<UserDirectory, StorageError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(UserDirectory::from_records(self.lock().iter().cloned()))
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), StorageError> {
        *self.lock() = directory.records().cloned().collect();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wackelberry_core::UserId;

    use super::*;

    #[test]
    fn empty_storage_loads_empty_directory() {
        let storage = MemoryStorage::new();
        let directory = storage.load().unwrap();

        assert!(directory.is_empty());
        assert!(!directory.is_dirty());
    }

    #[test]
    fn clones_share_state() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        let mut directory = UserDirectory::new();
        directory.insert(UserRecord::pending(UserId::new(1), "One"));
        clone.save(&directory).unwrap();

        assert_eq!(storage.load().unwrap().len(), 1);
        assert_eq!(storage.save_count(), 1);
        assert_eq!(storage.load_count(), 1);
    }
}
