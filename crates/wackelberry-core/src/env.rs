//! Clock, sleep and randomness behind one trait.
//!
//! The broadcast loop and the simulated position source never touch system
//! resources directly. The bot runs on the tokio clock and the OS RNG; tests
//! run on a virtual clock with a seeded RNG so tick schedules replay exactly.

use std::time::Duration;

/// Time, randomness and async sleeping for the live-share loop.
///
/// Implementors guarantee that `now()` is monotonic and that `sleep()`
/// resolves no earlier than `duration` of environment time.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Instant type: `std::time::Instant` in production, virtual time in
    /// simulation.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Monotonic current time.
    fn now(&self) -> Self::Instant;

    /// Wait `duration` of environment time.
    ///
    /// This is the only suspension point of a live-share tick. It must be
    /// cancel-safe: dropping the future before it resolves has no effect.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fill `buffer` from the environment RNG.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Random `u64`, big-endian over eight random bytes.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a uniformly distributed `f64` in `[0.0, 1.0)`.
    ///
    /// Uses the top 53 bits of a random `u64`, the full mantissa precision.
    fn random_unit(&self) -> f64 {
        (self.random_u64() >> 11) as f64 / (1u64 << 53) as f64
    }
}
