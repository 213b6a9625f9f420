//! Resource pool conservation and release policies

use prodline_sim::simulation::{RequestOutcome, ResourcePool};
use prodline_sim::types::{PartId, PoolId, ReleasePolicy, ResourceKind};
use proptest::prelude::*;
use std::collections::HashMap;

fn pool(capacity: u32, policy: ReleasePolicy) -> ResourcePool {
    ResourcePool::new(PoolId::new("pool_test"), ResourceKind::Worker, capacity, 1.0, 30.0, policy)
}

#[derive(Debug, Clone)]
enum Action {
    Request { part: usize, count: u32 },
    Release { part: usize },
}

fn action() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0usize..12, 1u32..6).prop_map(|(part, count)| Action::Request { part, count }),
        (0usize..12).prop_map(|part| Action::Release { part }),
    ]
}

/// Test that a large head request holds back smaller ones under head-of-line
#[test]
fn test_head_of_line_blocking() {
    let mut pool = pool(4, ReleasePolicy::HeadOfLine);
    assert_eq!(pool.request(PartId(0), 2), RequestOutcome::Granted);
    assert_eq!(pool.request(PartId(1), 1), RequestOutcome::Granted);
    assert_eq!(pool.request(PartId(2), 4), RequestOutcome::Queued);
    assert_eq!(pool.request(PartId(3), 2), RequestOutcome::Queued);
    assert_eq!(pool.available(), 1);

    // Part 3 would fit after this release, but part 2 is at the head
    assert!(pool.release(1, 1.0).is_none());
    assert_eq!(pool.available(), 2);
    assert!(pool.is_waiting(PartId(3)));

    let granted = pool.release(2, 1.0).unwrap();
    assert_eq!(granted.requester, PartId(2));
    assert_eq!(pool.available(), 0);
    assert_eq!(pool.busy_hours(), 3.0);
}

/// Test that first-fit lets a small request pass a blocked head
#[test]
fn test_first_fit_skips_blocked_head() {
    let mut pool = pool(3, ReleasePolicy::FirstFit);
    assert_eq!(pool.request(PartId(0), 3), RequestOutcome::Granted);
    assert_eq!(pool.request(PartId(1), 3), RequestOutcome::Queued);
    assert_eq!(pool.request(PartId(2), 1), RequestOutcome::Queued);

    assert!(pool.release(1, 0.5).map(|w| w.requester) == Some(PartId(2)));
    assert!(pool.is_waiting(PartId(1)));
    assert_eq!(pool.busy_hours(), 0.5);
}

proptest! {
    /// Test that available plus outstanding grants always equals capacity
    #[test]
    fn prop_units_are_conserved(
        capacity in 1u32..6,
        first_fit in any::<bool>(),
        actions in prop::collection::vec(action(), 1..200),
    ) {
        let policy = if first_fit { ReleasePolicy::FirstFit } else { ReleasePolicy::HeadOfLine };
        let mut pool = pool(capacity, policy);
        let mut held: HashMap<usize, u32> = HashMap::new();

        for action in actions {
            match action {
                Action::Request { part, count } => {
                    if held.contains_key(&part) || pool.is_waiting(PartId(part)) {
                        continue;
                    }
                    match pool.request(PartId(part), count) {
                        RequestOutcome::Granted => {
                            held.insert(part, count);
                        }
                        RequestOutcome::Queued => prop_assert!(pool.is_waiting(PartId(part))),
                        RequestOutcome::Rejected => prop_assert!(count > capacity),
                    }
                }
                Action::Release { part } => {
                    if let Some(count) = held.remove(&part) {
                        if let Some(granted) = pool.release(count, 1.0) {
                            prop_assert!(!pool.is_waiting(granted.requester));
                            held.insert(granted.requester.index(), granted.count);
                        }
                    }
                }
            }

            let outstanding: u32 = held.values().sum();
            prop_assert!(pool.available() <= capacity);
            prop_assert_eq!(pool.available() + outstanding, capacity);
            prop_assert_eq!(pool.outstanding(), outstanding);
        }
    }
}
