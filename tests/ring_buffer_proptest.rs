// RingBuffer property tests.
//
// Property: a ring driven by random pushes and pops at both ends behaves
// like VecDeque.
//  - Model: std VecDeque receiving the same operations.
//  - Invariant: len, peek_front/peek_back and the front-to-back order
//    match the model after every step; capacity stays a power of two and
//    strictly greater than len.
//  - Operations: push_back, push_front, pop_front, pop_back, get, clear.
use array_collections::{CollectionError, RingBuffer};
use proptest::prelude::*;
use std::collections::VecDeque;

proptest! {
    #[test]
    fn prop_ring_matches_vecdeque(
        initial in 0usize..20,
        ops in proptest::collection::vec((0u8..=6u8, any::<i16>()), 1..200),
    ) {
        let mut ring = RingBuffer::with_capacity(initial);
        let mut model: VecDeque<i16> = VecDeque::new();

        for (op, x) in ops {
            match op {
                0 | 1 => {
                    ring.push_back(x);
                    model.push_back(x);
                }
                2 => {
                    ring.push_front(x);
                    model.push_front(x);
                }
                3 => {
                    prop_assert_eq!(ring.pop_front().ok(), model.pop_front());
                }
                4 => {
                    prop_assert_eq!(ring.pop_back().ok(), model.pop_back());
                }
                5 => {
                    let i = x.unsigned_abs() as usize % (model.len() + 1);
                    match model.get(i) {
                        Some(v) => prop_assert_eq!(ring.get(i), Ok(v)),
                        None => prop_assert_eq!(
                            ring.get(i),
                            Err(CollectionError::IndexOutOfRange { index: i, len: model.len() })
                        ),
                    }
                }
                // Occasionally start over
                6 => {
                    if x % 8 == 0 {
                        ring.clear();
                        model.clear();
                    }
                }
                _ => unreachable!(),
            }

            // Invariants after each step
            prop_assert_eq!(ring.len(), model.len());
            prop_assert!(ring.capacity().is_power_of_two());
            prop_assert!(ring.capacity() > ring.len());
            prop_assert_eq!(ring.peek_front().ok(), model.front());
            prop_assert_eq!(ring.peek_back().ok(), model.back());
        }

        let items: Vec<i16> = ring.iter().copied().collect();
        prop_assert_eq!(items, model.iter().copied().collect::<Vec<_>>());
        let reversed: Vec<i16> = ring.iter().rev().copied().collect();
        prop_assert_eq!(reversed, model.iter().rev().copied().collect::<Vec<_>>());
    }
}
