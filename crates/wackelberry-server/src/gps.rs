//! Position sources for the console bot.
//!
//! No real receiver is attached. [`SimulatedGps`] wanders around a base
//! coordinate using the [`Environment`] RNG, and [`FixedPosition`] always
//! reports the same fix.

use wackelberry_core::{Environment, Position, PositionError, PositionSource};

/// Maximum offset applied to each coordinate, in degrees.
pub const DEFAULT_JITTER_DEGREES: f64 = 0.001;

/// Base coordinate plus uniform jitter and a random heading.
#[derive(Debug, Clone)]
pub struct SimulatedGps<E: Environment> {
    env: E,
    base: Position,
    jitter: f64,
}

impl<E: Environment> SimulatedGps<E> {
    /// Simulated receiver around `base` with [`DEFAULT_JITTER_DEGREES`].
    pub fn new(env: E, base: Position) -> Self {
        Self::with_jitter(env, base, DEFAULT_JITTER_DEGREES)
    }

    /// Simulated receiver around `base` with a custom jitter.
    pub fn with_jitter(env: E, base: Position, jitter: f64) -> Self {
        Self { env, base, jitter: jitter.abs() }
    }

    fn offset(&self) -> f64 {
        (self.env.random_unit() * 2.0 - 1.0) * self.jitter
    }
}

impl<E: Environment> PositionSource for SimulatedGps<E> {
    async fn sample(&self) -> Result<Position, PositionError> {
        let latitude = (self.base.latitude + self.offset()).clamp(-90.0, 90.0);
        let longitude = (self.base.longitude + self.offset()).clamp(-180.0, 180.0);
        // 0 means "unknown"; a moving fix always has a direction
        let heading = (self.env.random_u64() % 360 + 1) as u16;

        Ok(Position::new(latitude, longitude, heading))
    }
}

/// Source that always reports the same position.
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Position);

impl PositionSource for FixedPosition {
    async fn sample(&self) -> Result<Position, PositionError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use wackelberry_harness::SimEnv;

    use super::*;

    const BASE: Position = Position::new(37.7749, -122.4194, 0);

    #[tokio::test]
    async fn samples_stay_within_jitter() {
        let gps = SimulatedGps::new(SimEnv::with_seed(7), BASE);

        for _ in 0..200 {
            let sample = gps.sample().await.unwrap();
            assert!((sample.latitude - BASE.latitude).abs() <= DEFAULT_JITTER_DEGREES);
            assert!((sample.longitude - BASE.longitude).abs() <= DEFAULT_JITTER_DEGREES);
            assert!((1..=360).contains(&sample.heading), "heading {}", sample.heading);
        }
    }

    #[derive(Clone)]
    struct ZeroEnv;

    impl Environment for ZeroEnv {
        type Instant = Duration;

        fn now(&self) -> Duration {
            Duration::ZERO
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }
    }

    #[tokio::test]
    async fn zero_draw_is_not_unknown_heading() {
        let gps = SimulatedGps::new(ZeroEnv, BASE);

        let sample = gps.sample().await.unwrap();

        assert_eq!(sample.heading, 1);
    }

    #[tokio::test]
    async fn same_seed_same_track() {
        let a = SimulatedGps::new(SimEnv::with_seed(3), BASE);
        let b = SimulatedGps::new(SimEnv::with_seed(3), BASE);

        for _ in 0..10 {
            assert_eq!(a.sample().await, b.sample().await);
        }
    }

    #[tokio::test]
    async fn zero_jitter_keeps_base_coordinate() {
        let gps = SimulatedGps::with_jitter(SimEnv::with_seed(1), BASE, 0.0);
        let sample = gps.sample().await.unwrap();

        assert_eq!((sample.latitude, sample.longitude), (BASE.latitude, BASE.longitude));
        assert_eq!(FixedPosition(BASE).sample().await, Ok(BASE));
    }
}
