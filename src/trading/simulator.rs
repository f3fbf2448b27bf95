//! Tick simulator
//!
//! Random walk with a small upward drift. Seeded runs are reproducible.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub const TICK_COUNT: usize = 20;
/// Per-tick upward bias.
pub const DRIFT: f64 = 0.0008;
/// Half-width of the uniform per-tick noise.
pub const NOISE: f64 = 0.005;
const BASE_PRICE_MIN: f64 = 100.0;
const BASE_PRICE_MAX: f64 = 110.0;

pub struct PriceSimulator {
    rng: Mutex<ChaCha8Rng>,
}

impl PriceSimulator {
    /// `None` seeds from OS entropy.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// `count` prices, each rounded to 4 decimals.
    pub fn ticks(&self, count: usize) -> Vec<f64> {
        let mut rng = self.rng.lock();
        let mut price: f64 = rng.gen_range(BASE_PRICE_MIN..BASE_PRICE_MAX);
        (0..count)
            .map(|_| {
                let noise: f64 = rng.gen_range(-NOISE..NOISE);
                price *= 1.0 + noise + DRIFT;
                round4(price)
            })
            .collect()
    }
}

pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
