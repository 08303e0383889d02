//! Random full matches driven through the protocol adapter. Every step checks
//! tile conservation and zero-sum scores; intents are randomly resubmitted to
//! check that replays are answered from cache without side effects.

use proptest::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use uuid::Uuid;

use tw_mahjong::config::{EngineConfig, RoomSettings};
use tw_mahjong::engine::tw::{InvariantCheck, Points, SeatId, TimerKind, NUM_SEATS};
use tw_mahjong::protocol::{bot, IntentEnvelope, ProtocolAdapter};

const MAX_STEPS: u32 = 5_000;

fn player(seat: SeatId) -> u64 {
    100 + seat as u64
}

fn settings() -> RoomSettings {
    RoomSettings {
        rounds: 2,
        ..RoomSettings::default()
    }
}

fn seated_table(seed: u64) -> ProtocolAdapter {
    let cfg = EngineConfig {
        rng_seed: Some(seed),
        ..EngineConfig::default()
    };
    let mut adapter = ProtocolAdapter::new(Uuid::nil(), settings(), &cfg);
    for seat in 0..NUM_SEATS as SeatId {
        adapter.join(player(seat));
    }
    adapter.start_round(settings());
    adapter
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_matches_conserve_tiles_and_points(seed in 0u64..1_000_000) {
        let mut adapter = seated_table(seed);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut seqs = [0u64; NUM_SEATS];
        let mut steps = 0u32;

        while !adapter.is_finished() && steps < MAX_STEPS {
            steps += 1;
            adapter.take_outbox();
            if adapter.controller().awaiting_next_round() {
                adapter.start_round(settings());
                continue;
            }

            let candidates: Vec<(SeatId, _)> = (0..NUM_SEATS as SeatId)
                .filter_map(|seat| bot::suggest(&adapter.snapshot(Some(seat))).map(|i| (seat, i)))
                .collect();
            let force_timeout = candidates.is_empty() || rng.gen_ratio(1, 8);
            if force_timeout {
                let timer = adapter
                    .active_timers()
                    .into_iter()
                    .find(|t| t.kind != TimerKind::NextRound);
                prop_assert!(timer.is_some(), "seed {seed}: stuck at step {steps}");
                if let Some(timer) = timer {
                    adapter.on_timeout(timer);
                }
            } else {
                let (seat, intent) = candidates[rng.gen_range(0..candidates.len())].clone();
                seqs[seat as usize] += 1;
                let envelope = IntentEnvelope::new(seqs[seat as usize], intent);
                let reply = adapter.apply_intent(player(seat), envelope.clone());
                prop_assert!(reply.last().and_then(|e| e.as_snapshot()).is_some());

                if rng.gen_bool(0.25) {
                    adapter.take_outbox();
                    let before = adapter.snapshot(Some(seat));
                    let replay = adapter.apply_intent(player(seat), envelope);
                    prop_assert_eq!(&replay, &reply);
                    prop_assert_eq!(adapter.snapshot(Some(seat)), before);
                    prop_assert!(adapter.take_outbox().is_empty());
                }
            }

            if let Some(hand) = adapter.controller().hand() {
                let checked = hand.validate_invariants();
                prop_assert!(checked.is_ok(), "seed {seed}: {checked:?} at step {steps}");
            }
            let total: Points = adapter.controller().scores().iter().sum();
            prop_assert_eq!(total, 0);
        }

        prop_assert!(adapter.is_finished(), "seed {seed}: match did not finish");
        prop_assert_eq!(adapter.controller().history().len(), 2);
    }
}
