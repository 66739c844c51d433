//! Wackelberry bot runtime.
//!
//! Wraps [`wackelberry_core`]'s Sans-IO rules and live-share state machine
//! with real I/O: a persisted user document, admin notifications, spawned
//! live-share tasks, and a console front-end.
//!
//! # Components
//!
//! - [`Bot`]: command entry point; turns every outcome into a [`Reply`]
//! - [`AccessController`]: register / approve / authorize over the [`UserStore`]
//! - [`NotificationFanout`]: best-effort delivery to every admin
//! - [`LiveShareManager`]: one live-share task per chat, cancellable
//! - [`storage`]: JSON, redb, in-memory, and fault-injecting backends
//! - [`ConsoleChannel`] and [`SimulatedGps`]: stand-ins for the messaging
//!   service and the GPS receiver
//! - [`SystemEnv`]: production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod access;
mod commands;
mod console;
mod error;
mod fanout;
mod gps;
mod live;
mod reply;
pub mod storage;
mod system_env;
mod user_store;

use std::path::{Path, PathBuf};

pub use access::{AccessController, Approval, Delivery, Registration};
pub use commands::{Bot, Command};
pub use console::{ConsoleChannel, ConsoleLine, ConsoleLineError, run_console};
pub use error::{CommandError, LiveShareError, ServerError};
pub use fanout::{FanoutReport, NotificationFanout};
pub use gps::{DEFAULT_JITTER_DEGREES, FixedPosition, SimulatedGps};
pub use live::{LiveShareHandle, LiveShareManager, SessionReport};
pub use reply::{Notice, Reply};
pub use storage::{
    ChaoticStorage, FaultCounts, JsonFileStorage, MemoryStorage, RedbStorage, StorageError,
    UserStorage,
};
pub use system_env::SystemEnv;
pub use user_store::UserStore;
use wackelberry_core::BroadcastConfig;

/// Persistence format of the user document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Single pretty-printed JSON document
    Json,
    /// redb database file
    Redb,
}

impl StoreBackend {
    /// Backend selected by the file extension: `.redb` or JSON otherwise.
    pub fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("redb") => Self::Redb,
            _ => Self::Json,
        }
    }
}

/// Runtime configuration of the bot.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// User document location
    pub store_path: PathBuf,
    /// Live-share timing and fallback position
    pub broadcast: BroadcastConfig,
    /// Report the fallback position exactly instead of simulating jitter
    pub fixed_position: bool,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("users.json"),
            broadcast: BroadcastConfig::default(),
            fixed_position: false,
        }
    }
}

impl BotConfig {
    /// Reject settings the bot cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.store_path.as_os_str().is_empty() {
            return Err(ServerError::Config("store path must not be empty".to_string()));
        }
        self.broadcast.validate()?;
        Ok(())
    }

    /// Backend implied by `store_path`.
    pub fn backend(&self) -> StoreBackend {
        StoreBackend::for_path(&self.store_path)
    }
}
