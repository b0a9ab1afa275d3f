//! Sources of uniform randomness for the simulator.
//!
//! Every random decision the simulator makes is one call to
//! [`RandomSource::next_unit`], in a fixed order per wrapped call:
//!
//! 1. delay sample
//! 2. timeout draw
//! 3. error draw
//! 4. fault kind (only when the error draw hit)
//!
//! [`SequenceRandom`] relies on that order to script outcomes in tests.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Yields uniform samples in `[0, 1)`.
pub trait RandomSource: Send + Sync + 'static {
    fn next_unit(&self) -> f64;
}

/// Thread-local RNG. The default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic RNG for reproducible runs.
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
    fn next_unit(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random::<f64>()
    }
}

/// Replays a fixed list of samples, cycling when it runs out.
///
/// An empty list always yields `0.0`.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: Mutex<usize>,
}

impl SequenceRandom {
    /// Values are clamped into `[0, 1)`.
    pub fn new(values: impl IntoIterator<Item = f64>) -> Self {
        Self {
            values: values
                .into_iter()
                .map(|v| v.clamp(0.0, 1.0 - f64::EPSILON))
                .collect(),
            cursor: Mutex::new(0),
        }
    }

    pub fn constant(value: f64) -> Self {
        Self::new([value])
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let value = self.values[*cursor % self.values.len()];
        *cursor += 1;
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_random_in_unit_interval() {
        for _ in 0..1000 {
            let v = ThreadRandom.next_unit();
            assert!((0.0..1.0).contains(&v));
        }
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let a = SeededRandom::new(42);
        let b = SeededRandom::new(42);
        for _ in 0..20 {
            assert_eq!(a.next_unit(), b.next_unit());
        }
    }

    #[test]
    fn test_sequence_random_cycles() {
        let seq = SequenceRandom::new([0.1, 0.2]);
        assert_eq!(seq.next_unit(), 0.1);
        assert_eq!(seq.next_unit(), 0.2);
        assert_eq!(seq.next_unit(), 0.1);
    }

    #[test]
    fn test_sequence_random_clamps_and_handles_empty() {
        assert!(SequenceRandom::constant(1.0).next_unit() < 1.0);
        assert_eq!(SequenceRandom::constant(-3.0).next_unit(), 0.0);
        assert_eq!(SequenceRandom::new([]).next_unit(), 0.0);
    }
}
