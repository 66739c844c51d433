//! Property-based tests for the live-share state machine.
//!
//! The session is driven the way the runtime drives it: every emitted edit
//! gets a result fed back before the next tick.

use std::time::Duration;

use proptest::prelude::*;
use wackelberry_core::{
    BroadcastAction, BroadcastConfig, BroadcastSession, ChatId, EndReason, MessageHandle,
    Position, PositionError,
};

const HANDLE: MessageHandle = MessageHandle { chat: ChatId(1), message_id: 1 };

/// Small coordinate alphabet so consecutive samples repeat often.
fn arb_sample() -> impl Strategy<Value = Position> {
    (0u8..3, 0u8..2, prop_oneof![Just(0u16), Just(90u16)])
        .prop_map(|(lat, lon, heading)| Position::new(f64::from(lat), f64::from(lon), heading))
}

/// Drive `samples` through a live session; returns the edits requested.
fn run(session: &mut BroadcastSession, samples: &[Position]) -> Vec<Position> {
    let mut edits = Vec::new();

    for sample in samples {
        for action in session.on_tick(Ok(*sample)) {
            if let BroadcastAction::EditShare { position, .. } = action {
                edits.push(position);
                session.on_edit_result(Ok(()));
            }
        }
    }

    edits
}

fn live(ticks: u32, first: Position) -> BroadcastSession {
    let config = BroadcastConfig {
        update_interval: Duration::from_secs(15),
        total_duration: Duration::from_secs(15) * ticks,
        ..BroadcastConfig::default()
    };
    let mut session = BroadcastSession::new(ChatId(1), config);
    session.start(Ok(first));
    session.on_started(Ok(HANDLE));
    session
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: an edit is requested exactly when the sample differs from
    /// the previous published one
    #[test]
    fn prop_debounce_law(
        first in arb_sample(),
        samples in prop::collection::vec(arb_sample(), 0..40),
    ) {
        let mut session = live(samples.len() as u32 + 1, first);

        let edits = run(&mut session, &samples);

        let mut expected = Vec::new();
        let mut last = first;
        for sample in &samples {
            if *sample != last {
                expected.push(*sample);
                last = *sample;
            }
        }

        prop_assert_eq!(&edits, &expected);
        prop_assert_eq!(session.stats().skipped as usize, samples.len() - expected.len());
    }

    /// Property: never more than floor(D / I) ticks, then Expired
    #[test]
    fn prop_tick_budget_law(
        interval_secs in 1u64..30,
        duration_secs in 0u64..600,
        extra in 0usize..10,
        first in arb_sample(),
    ) {
        let config = BroadcastConfig {
            update_interval: Duration::from_secs(interval_secs),
            total_duration: Duration::from_secs(duration_secs),
            ..BroadcastConfig::default()
        };
        let budget = (duration_secs / interval_secs) as usize;

        let mut session = BroadcastSession::new(ChatId(1), config);
        session.start(Ok(first));
        session.on_started(Ok(HANDLE));

        let samples: Vec<Position> = (0..budget + extra)
            .map(|i| Position::new(i as f64, 0.0, 0))
            .collect();
        run(&mut session, &samples);

        prop_assert_eq!(session.stats().ticks as usize, budget);
        prop_assert!(session.is_finished());
        prop_assert_eq!(session.end_reason(), Some(&EndReason::Expired));
    }

    /// Property: fallback substitution is counted for every unavailable sample
    #[test]
    fn prop_degraded_counted(pattern in prop::collection::vec(any::<bool>(), 1..30)) {
        let mut session = live(pattern.len() as u32 + 1, Position::new(10.0, 10.0, 0));

        for (i, available) in pattern.iter().enumerate() {
            let sample = if *available {
                Ok(Position::new(i as f64, 1.0, 0))
            } else {
                Err(PositionError::Unavailable("no fix".to_string()))
            };
            for action in session.on_tick(sample) {
                if matches!(action, BroadcastAction::EditShare { .. }) {
                    session.on_edit_result(Ok(()));
                }
            }
        }

        let unavailable = pattern.iter().filter(|available| !**available).count();
        prop_assert_eq!(session.stats().degraded as usize, unavailable);
    }
}

/// Three identical samples then a moved one: exactly one edit, on tick four.
#[test]
fn repeated_sample_then_move_edits_once() {
    let still = Position::new(48.0, 11.0, 0);
    let moved = Position::new(48.001, 11.0, 0);
    let mut session = live(10, still);

    for _ in 0..3 {
        assert!(session.on_tick(Ok(still)).is_empty());
    }
    let actions = session.on_tick(Ok(moved));

    assert_eq!(actions, vec![BroadcastAction::EditShare { handle: HANDLE, position: moved }]);
    assert_eq!(session.stats().ticks, 4);
    assert_eq!(session.stats().edits, 1);
}
