//! Injectable randomness for presentation-order shuffling.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform random indices.
pub trait RandomSource: Send + Sync {
    /// A uniformly distributed index in `0..upper`. `upper` is at least 1.
    fn index_below(&self, upper: usize) -> usize;
}

/// Thread-local OS-seeded randomness.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn index_below(&self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Reproducible randomness from a fixed seed.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<StdRng>,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn index_below(&self, upper: usize) -> usize {
        if upper <= 1 {
            return 0;
        }
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..upper)
    }
}

/// In-place Fisher–Yates shuffle driven by `source`.
pub fn shuffle<T>(items: &mut [T], source: &dyn RandomSource) {
    for i in (1..items.len()).rev() {
        let j = source.index_below(i + 1);
        items.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always picks the lowest index.
    struct Lowest;

    impl RandomSource for Lowest {
        fn index_below(&self, _upper: usize) -> usize {
            0
        }
    }

    #[test]
    fn scripted_source_gives_known_order() {
        let mut items = vec![1, 2, 3, 4];
        shuffle(&mut items, &Lowest);
        // i=3 swaps with 0, i=2 swaps with 0, i=1 swaps with 0
        assert_eq!(items, vec![2, 3, 4, 1]);
    }

    #[test]
    fn same_seed_same_permutation() {
        let mut a: Vec<u32> = (0..50).collect();
        let mut b = a.clone();
        shuffle(&mut a, &SeededRandom::new(7));
        shuffle(&mut b, &SeededRandom::new(7));
        assert_eq!(a, b);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut items: Vec<u32> = (0..100).collect();
        shuffle(&mut items, &ThreadRandom);
        let mut sorted = items.clone();
        sorted.sort();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_slices_are_untouched() {
        let mut empty: Vec<u8> = vec![];
        shuffle(&mut empty, &ThreadRandom);
        let mut one = vec![9];
        shuffle(&mut one, &ThreadRandom);
        assert_eq!(one, vec![9]);
    }
}
