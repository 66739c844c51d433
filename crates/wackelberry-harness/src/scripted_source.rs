//! Position source that replays a script.

use std::{
    collections::VecDeque,
    sync::{Mutex, MutexGuard, PoisonError},
};

use wackelberry_core::{Position, PositionError, PositionSource};

struct Script {
    samples: VecDeque<Result<Position, PositionError>>,
    last: Option<Result<Position, PositionError>>,
    taken: usize,
}

/// Replays scripted samples in order.
///
/// Once the script runs out the last sample repeats; an empty script reports
/// `Unavailable`.
pub struct ScriptedSource {
    script: Mutex<Script>,
}

impl ScriptedSource {
    /// Source replaying `samples`.
    pub fn new(samples: impl IntoIterator<Item = Result<Position, PositionError>>) -> Self {
        Self {
            script: Mutex::new(Script {
                samples: samples.into_iter().collect(),
                last: None,
                taken: 0,
            }),
        }
    }

    /// Source replaying only available positions.
    pub fn positions(positions: impl IntoIterator<Item = Position>) -> Self {
        Self::new(positions.into_iter().map(Ok))
    }

    /// Source that always reports the same position.
    pub fn fixed(position: Position) -> Self {
        Self::positions([position])
    }

    /// Number of samples taken.
    pub fn taken(&self) -> usize {
        self.lock().taken
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PositionSource for ScriptedSource {
    async fn sample(&self) -> Result<Position, PositionError> {
        let mut script = self.lock();
        script.taken += 1;

        if let Some(next) = script.samples.pop_front() {
            script.last = Some(next.clone());
            return next;
        }

        script
            .last
            .clone()
            .unwrap_or_else(|| Err(PositionError::Unavailable("script is empty".to_string())))
    }
}
