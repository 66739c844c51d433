//! Wall-clock [`Environment`] for the running bot.
//!
//! Live share ticks wait on tokio timers and the simulated GPS draws its
//! jitter from the OS random source.

use std::time::Duration;

use wackelberry_core::Environment;

/// Real clock, tokio sleep, getrandom bytes.
///
/// # Panics
///
/// Panics if the OS RNG fails. That indicates an OS-level fault the process
/// cannot recover from.
#[derive(Debug, Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS random source is available");
    }
}
