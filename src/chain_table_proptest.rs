#![cfg(test)]

// Property tests for ChainTable kept inside the crate so they can use the
// chain views and the default strategy directly.

use crate::chain_table::ChainTable;
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

// Pool-indexed operations: indices shrink toward earlier keys, the pool
// shrinks in length, and op lists shrink in length.
#[derive(Clone, Debug)]
enum Op {
    Insert(usize, i32),
    Get(usize),
    Contains(String),
    Mutate(usize, i32),
    Iterate,
}

fn arb_scenario() -> impl Strategy<Value = (usize, Vec<String>, Vec<Op>)> {
    (1usize..=12, proptest::collection::vec("[a-e]{0,4}", 1..=10)).prop_flat_map(
        |(buckets, pool)| {
            let idx = proptest::sample::select((0..pool.len()).collect::<Vec<_>>());
            let op = prop_oneof![
                (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Insert(i, v)),
                idx.clone().prop_map(Op::Get),
                prop_oneof![
                    proptest::sample::select(pool.clone()),
                    "[a-e]{0,4}".prop_map(|s| s)
                ]
                .prop_map(Op::Contains),
                (idx, -100i32..100).prop_map(|(i, d)| Op::Mutate(i, d)),
                Just(Op::Iterate),
            ];
            proptest::collection::vec(op, 1..80).prop_map(move |ops| (buckets, pool.clone(), ops))
        },
    )
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences (small pools and
// bucket counts force heavy chaining):
// - `insert` returns the previous value exactly when the model had the key.
// - `get`/`contains_key` parity with the model, present and absent keys.
// - Every entry sits in the chain its key maps to; no key appears twice.
// - `iter` yields each live entry exactly once, `len` matches the model.
// - `insert_calls` counts every insert, overwrites included.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((buckets, pool, ops) in arb_scenario()) {
        let mut sut: ChainTable<String, i32> = ChainTable::with_buckets(buckets).unwrap();
        let mut model: HashMap<String, i32> = HashMap::new();
        let mut inserts = 0usize;

        for op in ops {
            match op {
                Op::Insert(i, v) => {
                    let k = pool[i].clone();
                    inserts += 1;
                    let prev = sut.insert(k.clone(), v);
                    prop_assert_eq!(prev, model.insert(k, v));
                }
                Op::Get(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(k.as_str()), model.get(k));
                }
                Op::Contains(s) => {
                    prop_assert_eq!(sut.contains_key(s.as_str()), model.contains_key(&s));
                }
                Op::Mutate(i, d) => {
                    let k = &pool[i];
                    match (sut.get_mut(k.as_str()), model.get_mut(k)) {
                        (Some(a), Some(b)) => {
                            *a = a.wrapping_add(d);
                            *b = b.wrapping_add(d);
                        }
                        (None, None) => {}
                        (a, b) => prop_assert!(false, "get_mut mismatch: {:?} vs {:?}", a, b),
                    }
                }
                Op::Iterate => {
                    let seen: Vec<(String, i32)> =
                        sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                    prop_assert_eq!(seen.len(), model.len());
                    for (k, v) in &seen {
                        prop_assert_eq!(model.get(k), Some(v));
                    }
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            prop_assert_eq!(sut.is_empty(), model.is_empty());
            prop_assert_eq!(sut.insert_calls(), inserts);
        }

        // Chain placement and uniqueness.
        let mut keys = BTreeSet::new();
        for chain in sut.buckets() {
            for (k, _) in chain.iter() {
                prop_assert_eq!(sut.bucket_index(k.as_str()), chain.index());
                prop_assert!(keys.insert(k.clone()), "key {:?} stored twice", k);
            }
        }
        let expected: BTreeSet<String> = model.keys().cloned().collect();
        prop_assert_eq!(keys, expected);
    }
}
