use rand::Rng;
use rand_distr::{Distribution, Uniform};

use crate::Result;

/// A weight generator that follows a certain probabilistic distribution.
pub struct RandWeightGen<'r, R: Rng, D: Distribution<f32>> {
    rng: &'r mut R,
    distribution: D,
}

impl<'r, R: Rng, D: Distribution<f32>> RandWeightGen<'r, R, D> {
    /// Creates a new `RandWeightGen` weight generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    pub fn new(rng: &'r mut R, distribution: D) -> Self {
        Self { rng, distribution }
    }

    /// Overwrites every value of `weights` with a new sample.
    pub fn fill(&mut self, weights: &mut [f32]) {
        weights
            .iter_mut()
            .for_each(|w| *w = self.distribution.sample(&mut *self.rng));
    }
}

impl<'r, R: Rng> RandWeightGen<'r, R, Uniform<f32>> {
    /// Creates a new `RandWeightGen` weight generator using Glorot (Xavier) uniform
    /// initialization.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `fan_in` - The number of input units in the weight tensor.
    /// * `fan_out` - The number of output units in the weight tensor.
    ///
    /// # Returns
    /// An error if the calculated range is invalid.
    pub fn glorot_uniform(rng: &'r mut R, fan_in: usize, fan_out: usize) -> Result<Self> {
        let range = (6. / (fan_in + fan_out) as f32).sqrt();
        Ok(Self::new(rng, Uniform::new_inclusive(-range, range)?))
    }
}
