//! # Seeded Randomness
//!
//! The single random source shared by dungeon generation, obstacle and enemy
//! placement, and behavior decisions. Two `GameRng`s built from the same seed
//! produce the same stream.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// Seedable uniform random number generator.
#[derive(Debug, Clone)]
pub struct GameRng {
    inner: StdRng,
}

impl GameRng {
    /// Creates a generator seeded from a `u64`.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::GameRng;
    ///
    /// let mut a = GameRng::new(7);
    /// let mut b = GameRng::new(7);
    /// assert_eq!(a.range_i32(0, 100), b.range_i32(0, 100));
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform float in `[0, 1)`.
    pub fn value(&mut self) -> f32 {
        self.inner.gen::<f32>()
    }

    /// Uniform integer in `[min, max)`. Returns `min` for an empty range.
    pub fn range_i32(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            min
        } else {
            self.inner.gen_range(min..max)
        }
    }

    /// Uniform integer in `[min, max]`.
    pub fn range_inclusive_u32(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            min
        } else {
            self.inner.gen_range(min..=max)
        }
    }

    /// Uniform float in `[min, max)`. Returns `min` for an empty range.
    pub fn range_f32(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            min
        } else {
            self.inner.gen_range(min..max)
        }
    }

    /// Uniform index into a collection of `len` items.
    pub fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            None
        } else {
            Some(self.inner.gen_range(0..len))
        }
    }

    /// Returns true with probability `p`, clamped to `[0, 1]`.
    pub fn chance(&mut self, p: f64) -> bool {
        self.inner.gen_bool(p.clamp(0.0, 1.0))
    }

    /// Shuffles a slice in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    /// Picks an item with probability proportional to its weight.
    ///
    /// Non-positive weights never win unless every weight is non-positive, in
    /// which case the last item is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use labyrinth::GameRng;
    ///
    /// let mut rng = GameRng::new(1);
    /// let pool = [("common", 10.0), ("never", 0.0)];
    /// let pick = rng.choose_weighted(&pool, |(_, w)| *w).unwrap();
    /// assert_eq!(pick.0, "common");
    /// ```
    pub fn choose_weighted<'a, T, F>(&mut self, items: &'a [T], weight: F) -> Option<&'a T>
    where
        F: Fn(&T) -> f32,
    {
        let last = items.last()?;
        let total: f32 = items.iter().map(|item| weight(item).max(0.0)).sum();
        if total <= 0.0 {
            return Some(last);
        }

        let roll = self.value() * total;
        let mut cumulative = 0.0;
        for item in items {
            let w = weight(item).max(0.0);
            if w <= 0.0 {
                continue;
            }
            cumulative += w;
            if roll < cumulative {
                return Some(item);
            }
        }

        // Float rounding can leave `roll` a hair above the final sum.
        items.iter().rev().find(|item| weight(item) > 0.0).or(Some(last))
    }

    /// Access to the underlying `rand` generator.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = GameRng::new(12345);
        let mut b = GameRng::new(12345);
        for _ in 0..50 {
            assert_eq!(a.value(), b.value());
        }
    }

    #[test]
    fn test_ranges_stay_in_bounds() {
        let mut rng = GameRng::new(3);
        for _ in 0..200 {
            let i = rng.range_i32(-2, 3);
            assert!((-2..3).contains(&i));
            let f = rng.range_f32(0.5, 1.5);
            assert!((0.5..1.5).contains(&f));
            let u = rng.range_inclusive_u32(2, 5);
            assert!((2..=5).contains(&u));
        }
        assert_eq!(rng.range_i32(4, 4), 4);
        assert_eq!(rng.range_f32(2.0, 1.0), 2.0);
        assert_eq!(rng.index(0), None);
    }

    #[test]
    fn test_choose_weighted_respects_zero_weights() {
        let mut rng = GameRng::new(99);
        let pool = [("a", 0.0), ("b", 1.0), ("c", 0.0)];
        for _ in 0..100 {
            assert_eq!(rng.choose_weighted(&pool, |(_, w)| *w).unwrap().0, "b");
        }

        let empty: [(&str, f32); 0] = [];
        assert!(rng.choose_weighted(&empty, |(_, w)| *w).is_none());

        let all_zero = [("x", 0.0), ("y", 0.0)];
        assert_eq!(rng.choose_weighted(&all_zero, |(_, w)| *w).unwrap().0, "y");
    }

    #[test]
    fn test_choose_weighted_distribution() {
        let mut rng = GameRng::new(2024);
        let pool = [("heavy", 9.0), ("light", 1.0)];
        let heavy = (0..2000)
            .filter(|_| rng.choose_weighted(&pool, |(_, w)| *w).unwrap().0 == "heavy")
            .count();
        assert!(heavy > 1600 && heavy < 1990, "heavy picked {} times", heavy);
    }

    #[test]
    fn test_chance_extremes() {
        let mut rng = GameRng::new(5);
        assert!((0..100).all(|_| !rng.chance(0.0)));
        assert!((0..100).all(|_| rng.chance(1.0)));
        assert!((0..100).all(|_| rng.chance(7.0)));
    }
}
