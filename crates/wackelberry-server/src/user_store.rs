//! Serialized access to the user document.
//!
//! Every mutation is a full load, an in-memory change, and a full save. The
//! store runs each such sequence under one async mutex, so two overlapping
//! commands can never both load the same snapshot and lose one of the
//! writes.

use wackelberry_core::{UserDirectory, UserId, UserStatus};

use crate::storage::{StorageError, UserStorage};

/// User document with serialized read-modify-write.
pub struct UserStore<S: UserStorage> {
    storage: S,
    lock: tokio::sync::Mutex<()>,
}

impl<S: UserStorage> UserStore<S> {
    /// Wrap a storage backend.
    pub fn new(storage: S) -> Self {
        Self { storage, lock: tokio::sync::Mutex::new(()) }
    }

    /// Storage backend (for inspection in tests).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consistent snapshot of the whole document.
    ///
    /// Waits for any in-flight mutation to finish.
    pub async fn snapshot(&self) -> Result<UserDirectory, StorageError> {
        let _guard = self.lock.lock().await;
        self.storage.load()
    }

    /// Derived status of `id` from a fresh snapshot.
    pub async fn status(&self, id: UserId) -> Result<UserStatus, StorageError> {
        Ok(self.snapshot().await?.status(id))
    }

    /// Apply `change` to the current document under the store lock.
    ///
    /// The document is saved only if `change` succeeds and left the
    /// directory dirty. A failed save is returned as the error and the
    /// stored document keeps its previous contents.
    pub async fn modify<T, E>(
        &self,
        change: impl FnOnce(&mut UserDirectory) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StorageError>,
    {
        let _guard = self.lock.lock().await;

        let mut directory = self.storage.load()?;
        let value = change(&mut directory)?;

        if directory.is_dirty() {
            self.storage.save(&directory)?;
        }

        Ok(value)
    }
}
