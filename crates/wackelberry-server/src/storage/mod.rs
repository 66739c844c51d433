//! Storage abstraction for the user document.
//!
//! The whole user collection is one logical document: backends load and save
//! it as a unit. The trait is synchronous; serialization of concurrent
//! read-modify-write sequences is the job of [`crate::UserStore`], not of the
//! backend.

mod chaotic;
mod error;
mod json;
mod memory;
mod redb;

pub use chaotic::{ChaoticStorage, FaultCounts};
pub use error::StorageError;
pub use json::JsonFileStorage;
pub use memory::MemoryStorage;
use wackelberry_core::UserDirectory;

pub use self::redb::RedbStorage;

/// Storage abstraction for the user document.
///
/// Must be Clone (shared by the store and tests), Send + Sync, and
/// synchronous. Implementations typically share internal state via Arc, so
/// clones access the same underlying document.
pub trait UserStorage: Clone + Send + Sync + 'static {
    /// Load the whole document.
    ///
    /// A backend with nothing stored yet returns an empty directory, not an
    /// error. The returned directory is clean.
    fn load(&self) -> Result<UserDirectory, StorageError>;

    /// Replace the whole document with `directory`.
    ///
    /// # Invariants
    ///
    /// - Post: a subsequent `load` returns the same records
    /// - A failed save leaves the previous document intact
    fn save(&self, directory: &UserDirectory) -> Result<(), StorageError>;
}
