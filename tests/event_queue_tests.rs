//! Ordering properties of the event queue

use prodline_sim::simulation::EventQueue;
use proptest::prelude::*;

/// Test that popping returns events sorted by time, then by insertion order
#[test]
fn test_pop_order_for_many_random_pushes() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(2024);
    let mut queue = EventQueue::new();
    for index in 0..10_000usize {
        // Coarse times so that many events share an instant
        let time = rng.gen_range(0..500) as f64 * 0.5;
        queue.push(time, index).unwrap();
    }

    let mut previous: Option<(f64, u64)> = None;
    let mut popped = 0;
    while let Some(event) = queue.pop() {
        if let Some((time, seq)) = previous {
            assert!(event.time > time || (event.time == time && event.seq > seq));
        }
        previous = Some((event.time, event.seq));
        popped += 1;
    }
    assert_eq!(popped, 10_000);
}

proptest! {
    /// Test that same-instant events keep their scheduling order under interleaved pops
    #[test]
    fn prop_interleaved_push_pop_is_ordered(
        ops in prop::collection::vec((0u8..20, any::<bool>()), 1..400)
    ) {
        let mut queue = EventQueue::new();
        let mut last_popped: Option<(f64, u64)> = None;
        let mut clock = 0.0;

        for (offset, pop) in ops {
            if pop {
                if let Some(event) = queue.pop() {
                    if let Some((time, seq)) = last_popped {
                        prop_assert!(event.time >= time);
                        if event.time == time {
                            prop_assert!(event.seq > seq);
                        }
                    }
                    clock = event.time;
                    last_popped = Some((event.time, event.seq));
                }
            } else {
                // Never schedule before the last popped instant, as the engine does
                queue.push(clock + offset as f64, ()).unwrap();
            }
        }
    }

    /// Test that non-finite times are refused without disturbing the queue
    #[test]
    fn prop_invalid_times_rejected(time in prop_oneof![Just(f64::NAN), Just(f64::INFINITY), Just(f64::NEG_INFINITY)]) {
        let mut queue = EventQueue::new();
        queue.push(1.0, "kept").unwrap();
        prop_assert!(queue.push(time, "dropped").is_err());
        prop_assert_eq!(queue.len(), 1);
        prop_assert_eq!(queue.pop().map(|e| e.payload), Some("kept"));
    }
}
