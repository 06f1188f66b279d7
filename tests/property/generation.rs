//! Property tests for handle generations.
//!
//! Invariants tested:
//! - Every issued generation is newer than all earlier ones
//! - Generations count up from one

use proptest::prelude::*;
use relink_core::{Generation, GenerationCounter};

proptest! {
    #[test]
    fn generations_strictly_increase(count in 1usize..500) {
        let mut counter = GenerationCounter::new();
        let mut previous = Generation::ZERO;
        for _ in 0..count {
            let next = counter.next();
            prop_assert!(next > previous);
            previous = next;
        }
        prop_assert_eq!(previous.get(), count as u64);
    }
}
