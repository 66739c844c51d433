//! User records and status derivation.
//!
//! A [`UserRecord`] stores four independent flags. The status a record
//! presents is derived from them with a fixed precedence: admin, approved,
//! pending, blocked. A missing record is [`UserStatus::Unknown`].
//!
//! [`UserDirectory`] is the in-memory snapshot of the whole user document,
//! indexed by [`UserId`] so a status check is a single lookup.

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use thiserror::Error;

/// Stable, unique identifier of a user on the messaging channel.
///
/// Serialized as a decimal string. Deserializes from either a string or an
/// integer so documents written with numeric ids still load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(i64);

impl UserId {
    /// Wrap a raw identifier.
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Raw identifier value.
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Text could not be parsed as a [`UserId`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("not a user identifier: {0:?}")]
pub struct ParseUserIdError(pub String);

impl FromStr for UserId {
    type Err = ParseUserIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Self).map_err(|_| ParseUserIdError(s.to_string()))
    }
}

impl Serialize for UserId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UserIdVisitor;

        impl de::Visitor<'_> for UserIdVisitor {
            type Value = UserId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a user id as integer or decimal string")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<UserId, E> {
                Ok(UserId(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<UserId, E> {
                i64::try_from(v).map(UserId).map_err(|_| E::custom("user id out of range"))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<UserId, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(UserIdVisitor)
    }
}

/// Derived status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// No record, or a record with no flag set
    Unknown,
    /// Registration requested, awaiting an admin
    Pending,
    /// Allowed to use live sharing
    Approved,
    /// Barred; never approvable
    Blocked,
    /// Provisioned out of band; may approve others
    Admin,
}

impl UserStatus {
    /// Returns true if the user may start a live share.
    pub fn can_share(self) -> bool {
        matches!(self, Self::Approved | Self::Admin)
    }

    /// Returns true if `register` has nothing left to do for this user.
    pub fn is_registered(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unknown => "unknown",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Blocked => "blocked",
            Self::Admin => "admin",
        };
        f.write_str(name)
    }
}

/// One persisted user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    /// User identifier (also the document key)
    pub id: UserId,
    /// Display name captured at registration
    pub name: String,
    /// Approved by an admin
    #[serde(default)]
    pub approved: bool,
    /// Registration awaiting approval
    #[serde(default)]
    pub pending: bool,
    /// Provisioned administrator
    #[serde(default)]
    pub admin: bool,
    /// Barred from the service
    #[serde(default)]
    pub blocked: bool,
}

impl UserRecord {
    /// A freshly registered record awaiting approval.
    pub fn pending(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            approved: false,
            pending: true,
            admin: false,
            blocked: false,
        }
    }

    /// Status derived from the flags.
    pub fn status(&self) -> UserStatus {
        if self.admin {
            UserStatus::Admin
        } else if self.approved {
            UserStatus::Approved
        } else if self.pending {
            UserStatus::Pending
        } else if self.blocked {
            UserStatus::Blocked
        } else {
            UserStatus::Unknown
        }
    }
}

/// Indexed snapshot of every user record.
///
/// Tracks whether any mutating accessor was used since the snapshot was
/// loaded, so callers persist only real changes.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: BTreeMap<UserId, UserRecord>,
    dirty: bool,
}

impl UserDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clean directory from stored records.
    ///
    /// Later records with a duplicate id replace earlier ones.
    pub fn from_records(records: impl IntoIterator<Item = UserRecord>) -> Self {
        let users = records.into_iter().map(|record| (record.id, record)).collect();
        Self { users, dirty: false }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Returns true if there are no records.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Record for `id`, if any.
    pub fn get(&self, id: UserId) -> Option<&UserRecord> {
        self.users.get(&id)
    }

    /// Derived status of `id`. `Unknown` when no record exists.
    pub fn status(&self, id: UserId) -> UserStatus {
        self.users.get(&id).map_or(UserStatus::Unknown, UserRecord::status)
    }

    /// All records in id order.
    pub fn records(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values()
    }

    /// Records whose derived status is admin, in id order.
    pub fn admins(&self) -> impl Iterator<Item = &UserRecord> {
        self.users.values().filter(|record| record.status() == UserStatus::Admin)
    }

    /// Insert or replace a record. Marks the directory dirty.
    pub fn insert(&mut self, record: UserRecord) -> Option<UserRecord> {
        self.dirty = true;
        self.users.insert(record.id, record)
    }

    /// Mutable record for `id`. Marks the directory dirty when found.
    pub fn get_mut(&mut self, id: UserId) -> Option<&mut UserRecord> {
        let record = self.users.get_mut(&id);
        if record.is_some() {
            self.dirty = true;
        }
        record
    }

    /// Returns true if the directory changed since it was loaded.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Forget pending changes after they were persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
