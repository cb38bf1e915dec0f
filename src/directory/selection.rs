//! Randomized selection helpers

use rand::Rng;

/// Shuffle in place: every position i swaps with a uniform index in [0, n)
///
/// Every permutation is reachable. The order is not exactly uniform,
/// which is fine for spreading descriptor fetches across routers.
pub fn shuffle_in_place<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    let n = items.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let swap_idx = rng.gen_range(0..n);
        items.swap(i, swap_idx);
    }
}

/// Uniform pick of one element
pub fn pick_uniform<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        return None;
    }
    items.get(rng.gen_range(0..items.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut items: Vec<u32> = (0..50).collect();
        shuffle_in_place(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_reaches_every_permutation() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut seen = HashSet::new();
        for _ in 0..2_000 {
            let mut items = [0u8, 1, 2];
            shuffle_in_place(&mut items, &mut rng);
            seen.insert(items);
        }
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_different_seeds_differ() {
        let mut a: Vec<u32> = (0..30).collect();
        let mut b = a.clone();
        shuffle_in_place(&mut a, &mut StdRng::seed_from_u64(10));
        shuffle_in_place(&mut b, &mut StdRng::seed_from_u64(11));
        assert_ne!(a, b);
    }

    #[test]
    fn test_small_inputs() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut empty: [u8; 0] = [];
        shuffle_in_place(&mut empty, &mut rng);
        let mut one = [7u8];
        shuffle_in_place(&mut one, &mut rng);
        assert_eq!(one, [7]);
        assert!(pick_uniform::<u8, _>(&[], &mut rng).is_none());
        assert_eq!(pick_uniform(&[5u8], &mut rng), Some(&5));
    }
}
