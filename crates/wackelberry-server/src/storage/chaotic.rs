//! Fault-injecting storage wrapper.
//!
//! Wraps another backend and fails loads and saves at a seeded rate, so the
//! command layer can be checked for two things under storage faults: a
//! failed save never reaches the wrapped document, and every failure still
//! becomes a reply.

use std::sync::{Arc, Mutex, PoisonError};

use wackelberry_core::UserDirectory;

use super::{StorageError, UserStorage};

/// Seed used by [`ChaoticStorage::new`].
const DEFAULT_SEED: u64 = 0x5EED_CAFE_F00D_0001;

/// Storage wrapper that fails a seeded fraction of operations.
///
/// Clones share the same fault stream. An injected save failure returns
/// before the wrapped backend is touched.
#[derive(Clone)]
pub struct ChaoticStorage<S: UserStorage> {
    inner: S,
    failure_rate: f64,
    faults: Arc<Mutex<Faults>>,
}

/// Counters for one [`ChaoticStorage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultCounts {
    /// Loads attempted
    pub loads: usize,
    /// Saves attempted
    pub saves: usize,
    /// Loads that were failed on purpose
    pub failed_loads: usize,
    /// Saves that were failed on purpose
    pub failed_saves: usize,
}

struct Faults {
    state: u64,
    counts: FaultCounts,
}

impl Faults {
    /// splitmix64 step mapped onto [0, 1).
    fn roll(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[derive(Clone, Copy)]
enum Op {
    Load,
    Save,
}

impl<S: UserStorage> ChaoticStorage<S> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is outside `0.0..=1.0`.
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, DEFAULT_SEED)
    }

    /// Wrap `inner`; the same seed yields the same fault pattern.
    ///
    /// # Panics
    ///
    /// Panics if `failure_rate` is outside `0.0..=1.0`.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        assert!(
            (0.0..=1.0).contains(&failure_rate),
            "failure rate {failure_rate} outside 0.0..=1.0"
        );

        let faults = Faults { state: seed, counts: FaultCounts::default() };
        Self { inner, failure_rate, faults: Arc::new(Mutex::new(faults)) }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Operations seen so far.
    pub fn counts(&self) -> FaultCounts {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner).counts
    }

    fn inject(&self, op: Op) -> Result<(), StorageError> {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        let fail = faults.roll() < self.failure_rate;

        let counts = &mut faults.counts;
        match (op, fail) {
            (Op::Load, false) => counts.loads += 1,
            (Op::Save, false) => counts.saves += 1,
            (Op::Load, true) => {
                counts.loads += 1;
                counts.failed_loads += 1;
            },
            (Op::Save, true) => {
                counts.saves += 1;
                counts.failed_saves += 1;
            },
        }

        if fail {
            let name = match op {
                Op::Load => "load",
                Op::Save => "save",
            };
            tracing::debug!(op = name, "injected storage failure");
            return Err(StorageError::Io(format!("injected {name} failure")));
        }
        Ok(())
    }
}

impl<S: UserStorage> UserStorage for ChaoticStorage<S> {
    fn load(&self) -> Result<UserDirectory, StorageError> {
        self.inject(Op::Load)?;
        self.inner.load()
    }

    fn save(&self, directory: &UserDirectory) -> Result<(), StorageError> {
        self.inject(Op::Save)?;
        self.inner.save(directory)
    }
}
