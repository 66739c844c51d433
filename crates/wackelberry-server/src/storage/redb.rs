//! User document in a redb database.
//!
//! One row per user, keyed by id. A save rewrites the whole table inside a
//! single write transaction, so a crash mid-save leaves the previous document
//! in place.

use std::{fmt::Display, path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};
use wackelberry_core::{UserDirectory, UserRecord};

use super::{StorageError, UserStorage};

/// user id -> CBOR `UserRecord`
const USERS: TableDefinition<i64, &[u8]> = TableDefinition::new("users");

fn io(err: impl Display) -> StorageError {
    StorageError::Io(err.to_string())
}

fn codec(err: impl Display) -> StorageError {
    StorageError::Serialization(err.to_string())
}

/// redb-backed user storage; clones share one database handle.
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open the database at `path`, creating the file and the users table
    /// on first use.
    ///
    /// # Errors
    ///
    /// `StorageError::Io` when the file cannot be opened or is not a redb
    /// database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io)?;

        let txn = db.begin_write().map_err(io)?;
        txn.open_table(USERS).map_err(io)?;
        txn.commit().map_err(io)?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl UserStorage for RedbStorage {
    fn load(&self) -> Result<UserDirectory, StorageError> {
        let txn = self.db.begin_read().map_err(io)?;
        let table = txn.open_table(USERS).map_err(io)?;

        let records = table
            .iter()
            .map_err(io)?
            .map(|entry| {
                let (_, value) = entry.map_err(io)?;
                ciborium::from_reader::<UserRecord, _>(value.value()).map_err(codec)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserDirectory::from_records(records))
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), StorageError> {
        let mut encoded = Vec::with_capacity(directory.len());
        for record in directory.records() {
            let mut bytes = Vec::new();
            ciborium::into_writer(record, &mut bytes).map_err(codec)?;
            encoded.push((record.id.get(), bytes));
        }

        let txn = self.db.begin_write().map_err(io)?;
        {
            txn.delete_table(USERS).map_err(io)?;
            let mut table = txn.open_table(USERS).map_err(io)?;
            for (id, bytes) in &encoded {
                table.insert(*id, bytes.as_slice()).map_err(io)?;
            }
        }
        txn.commit().map_err(io)
    }
}
