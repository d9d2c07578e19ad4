//! Property-based tests for weighted queue ordering.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::{SeedableRng, rngs::StdRng};

use super::scheduler::WeightedScheduler;

fn queues() -> impl Strategy<Value = Vec<(String, u32)>> {
    prop::collection::btree_map("[a-z]{1,8}", 1u32..100, 1..6)
        .prop_map(|map| map.into_iter().collect())
}

proptest! {
    /// Every round visits each configured queue exactly once.
    #[test]
    fn prop_order_is_permutation(queues in queues(), seed in any::<u64>()) {
        let scheduler = WeightedScheduler::new(queues.clone()).unwrap();
        let mut rng = StdRng::seed_from_u64(seed);

        let order = scheduler.order(&mut rng);
        prop_assert_eq!(order.len(), queues.len());

        let seen: BTreeSet<&str> = order.into_iter().collect();
        let expected: BTreeSet<&str> = queues.iter().map(|(name, _)| name.as_str()).collect();
        prop_assert_eq!(seen, expected);
    }
}
