//! Random draws applied to operations
//!
//! Duration jitter, station breakdowns and quality scrap all come from one
//! seeded generator, so a run is reproducible for a fixed seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Shortest repair after a breakdown (hours)
pub const MIN_REPAIR_HOURS: f64 = 1.0;

/// Longest repair after a breakdown (hours)
pub const MAX_REPAIR_HOURS: f64 = 3.0;

/// Source of the run's stochastic outcomes
#[derive(Debug)]
pub struct OperationVariance {
    rng: StdRng,
}

impl OperationVariance {
    /// Seeded generator; entropy-seeded when no seed is given
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Apply a uniform `±variance_pct` jitter to a duration
    pub fn vary(&mut self, duration: f64, variance_pct: f64) -> f64 {
        if variance_pct <= 0.0 {
            return duration;
        }
        let factor = 1.0 + self.rng.gen_range(-1.0..=1.0) * variance_pct / 100.0;
        (duration * factor).max(0.0)
    }

    /// Draw a breakdown with probability `failure_prob` percent; returns the repair time
    pub fn breakdown(&mut self, failure_prob: f64) -> Option<f64> {
        if failure_prob <= 0.0 {
            return None;
        }
        if self.rng.gen::<f64>() * 100.0 < failure_prob {
            Some(self.rng.gen_range(MIN_REPAIR_HOURS..=MAX_REPAIR_HOURS))
        } else {
            None
        }
    }

    /// Draw a scrap outcome with the given probability
    pub fn scrap(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.rng.gen::<f64>() < probability
    }
}
