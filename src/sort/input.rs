//! Input generation
//!
//! The coordinator generates the sequence it sorts. Values are drawn uniformly
//! from an inclusive range using a xoshiro generator, seeded for reproducible
//! runs or from entropy otherwise.

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Default lower bound for generated values
pub const DEFAULT_MIN_VALUE: i32 = -100;

/// Default upper bound for generated values
pub const DEFAULT_MAX_VALUE: i32 = 100;

/// Random input generator
pub struct InputGenerator {
    min_value: i32,
    max_value: i32,
    rng: Xoshiro256PlusPlus,
}

impl InputGenerator {
    /// Create a generator seeded from entropy
    pub fn new(min_value: i32, max_value: i32) -> Self {
        assert!(min_value <= max_value, "min_value must not exceed max_value");

        Self {
            min_value,
            max_value,
            rng: Xoshiro256PlusPlus::from_entropy(),
        }
    }

    /// Create a generator with a specific seed
    pub fn with_seed(min_value: i32, max_value: i32, seed: u64) -> Self {
        assert!(min_value <= max_value, "min_value must not exceed max_value");

        Self {
            min_value,
            max_value,
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Create a generator from an optional seed
    pub fn from_seed_option(min_value: i32, max_value: i32, seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::with_seed(min_value, max_value, seed),
            None => Self::new(min_value, max_value),
        }
    }

    /// Generate `len` values in `[min_value, max_value]`
    pub fn generate(&mut self, len: usize) -> Vec<i32> {
        let (lo, hi) = (self.min_value, self.max_value);
        (0..len).map(|_| self.rng.gen_range(lo..=hi)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_within_range() {
        let mut gen = InputGenerator::with_seed(DEFAULT_MIN_VALUE, DEFAULT_MAX_VALUE, 7);
        let values = gen.generate(10_000);

        assert_eq!(values.len(), 10_000);
        assert!(values.iter().all(|v| (DEFAULT_MIN_VALUE..=DEFAULT_MAX_VALUE).contains(v)));
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = InputGenerator::with_seed(-5, 5, 42).generate(256);
        let b = InputGenerator::with_seed(-5, 5, 42).generate(256);
        assert_eq!(a, b);
    }

    #[test]
    fn test_degenerate_range() {
        let values = InputGenerator::with_seed(3, 3, 1).generate(20);
        assert_eq!(values, vec![3; 20]);
    }

    #[test]
    fn test_zero_length() {
        assert!(InputGenerator::from_seed_option(0, 1, None).generate(0).is_empty());
    }

    #[test]
    #[should_panic(expected = "min_value must not exceed max_value")]
    fn test_inverted_range_panics() {
        InputGenerator::new(10, -10);
    }
}
