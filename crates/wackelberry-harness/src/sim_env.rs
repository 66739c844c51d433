//! Simulated environment with a virtual clock.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wackelberry_core::env::Environment;

struct SimState {
    now: Duration,
    sleeps: usize,
    rng: ChaCha8Rng,
}

/// Deterministic environment for tests.
///
/// Time only moves when something sleeps: each `sleep` adds its duration to
/// the virtual clock and yields once to the scheduler. A stalled environment
/// never completes a sleep, which parks a live-share loop at its suspension
/// point until it is cancelled.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
    stalled: bool,
}

impl SimEnv {
    /// Environment whose RNG is seeded with `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                now: Duration::ZERO,
                sleeps: 0,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
            stalled: false,
        }
    }

    /// Environment whose sleeps never complete.
    pub fn stalled(seed: u64) -> Self {
        Self { stalled: true, ..Self::with_seed(seed) }
    }

    /// Virtual time elapsed so far.
    pub fn elapsed(&self) -> Duration {
        self.lock().now
    }

    /// Number of completed sleeps.
    pub fn sleep_count(&self) -> usize {
        self.lock().sleeps
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Environment for SimEnv {
    type Instant = Duration;

    fn now(&self) -> Duration {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        let state = Arc::clone(&self.state);
        let stalled = self.stalled;

        async move {
            if stalled {
                std::future::pending::<()>().await;
            }

            {
                let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
                state.now += duration;
                state.sleeps += 1;
            }

            tokio::task::yield_now().await;
        }
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sleep_advances_virtual_clock() {
        let env = SimEnv::with_seed(1);

        env.sleep(Duration::from_secs(15)).await;
        env.sleep(Duration::from_secs(15)).await;

        assert_eq!(env.now(), Duration::from_secs(30));
        assert_eq!(env.sleep_count(), 2);
    }

    #[tokio::test]
    async fn stalled_sleep_never_completes() {
        let env = SimEnv::stalled(1);

        let result =
            tokio::time::timeout(Duration::from_millis(20), env.sleep(Duration::ZERO)).await;

        assert!(result.is_err());
        assert_eq!(env.sleep_count(), 0);
    }

    #[test]
    fn same_seed_same_bytes() {
        let a = SimEnv::with_seed(42);
        let b = SimEnv::with_seed(42);

        assert_eq!(a.random_u64(), b.random_u64());
        assert_ne!(a.random_u64(), SimEnv::with_seed(43).random_u64());
    }
}
