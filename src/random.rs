//! A single seeded random stream shared by every customer task.

use std::{sync::Mutex, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{config::DelayRange, error::ConfigError};

/// Seeded random numbers, safe to draw from concurrently.
///
/// Every draw happens inside one critical section, so each caller gets its own un-interleaved
/// value. Which task gets which value still depends on scheduling; only the stream itself is
/// reproducible.
#[derive(Debug)]
pub struct SharedRandom {
    rng: Mutex<StdRng>,
}

impl SharedRandom {
    /// Start a stream from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// A uniform value in `[0, bound)`.
    pub fn next_int(&self, bound: usize) -> Result<usize, ConfigError> {
        if bound == 0 {
            return Err(ConfigError::InvalidBound(bound));
        }
        Ok(self.with_rng(|rng| rng.random_range(0..bound)))
    }

    /// A uniform value in `[0.0, 1.0)`.
    pub fn next_double(&self) -> f64 {
        self.with_rng(|rng| rng.random::<f64>())
    }

    /// True with probability `p`, from a single draw against the threshold.
    pub fn chance(&self, p: f64) -> bool {
        self.next_double() < p
    }

    /// A uniform value in `[low, high]`.
    pub(crate) fn between(&self, low: usize, high: usize) -> usize {
        debug_assert!(low <= high, "range should be validated with the config");
        self.with_rng(|rng| rng.random_range(low..=high))
    }

    /// A delay somewhere in `range`, to the millisecond.
    pub fn delay(&self, range: &DelayRange) -> Duration {
        let (min, max) = range.millis();
        debug_assert!(min <= max, "range should be validated with the config");
        Duration::from_millis(self.with_rng(|rng| rng.random_range(min..=max)))
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self
            .rng
            .lock()
            .expect("should not panic while holding lock");
        draw(&mut rng)
    }
}
