//! Property-based tests for transfer ordering and conservation.

use proptest::prelude::*;

use super::transfer::{LegSide, TransferInput, lock_ordered_legs};

fn account_id() -> impl Strategy<Value = i64> {
    1i64..10_000
}

fn amount() -> impl Strategy<Value = i64> {
    1i64..1_000_000_000
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The first balance update always targets the lower account id.
    #[test]
    fn prop_lower_id_locked_first(from in account_id(), to in account_id(), amount in amount()) {
        prop_assume!(from != to);

        let [first, second] = lock_ordered_legs(from, to, amount);
        prop_assert_eq!(first.account_id, from.min(to));
        prop_assert_eq!(second.account_id, from.max(to));
    }

    /// The ordering is the same for A->B and B->A.
    #[test]
    fn prop_order_independent_of_direction(a in account_id(), b in account_id(), amount in amount()) {
        prop_assume!(a != b);

        let forward = lock_ordered_legs(a, b, amount).map(|leg| leg.account_id);
        let backward = lock_ordered_legs(b, a, amount).map(|leg| leg.account_id);
        prop_assert_eq!(forward, backward);
    }

    /// Both legs together move no money in or out of the pair.
    #[test]
    fn prop_legs_conserve_money(
        from in account_id(),
        to in account_id(),
        amount in amount(),
        from_balance in 0i64..1_000_000_000,
        to_balance in 0i64..1_000_000_000,
    ) {
        prop_assume!(from != to);

        let mut from_after = from_balance;
        let mut to_after = to_balance;
        for leg in lock_ordered_legs(from, to, amount) {
            match leg.side {
                LegSide::Source => from_after += leg.delta,
                LegSide::Destination => to_after += leg.delta,
            }
        }

        prop_assert_eq!(from_after + to_after, from_balance + to_balance);
        prop_assert_eq!(from_after, from_balance - amount);
    }

    /// Entry amounts mirror the balance legs.
    #[test]
    fn prop_entries_match_legs(from in account_id(), to in account_id(), amount in amount()) {
        prop_assume!(from != to);

        let input = TransferInput::new(from, to, amount);
        prop_assert!(input.validate().is_ok());
        for leg in input.lock_ordered_legs() {
            let expected = match leg.side {
                LegSide::Source => input.debit_amount(),
                LegSide::Destination => input.credit_amount(),
            };
            prop_assert_eq!(leg.delta, expected);
        }
    }
}
