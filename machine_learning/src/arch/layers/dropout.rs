use ndarray::ArrayD;
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{MlErr, Result, arch::Mode};

/// Inverted dropout: while training each value is zeroed with probability `rate` and the
/// survivors are scaled by `1 / (1 - rate)`. It's the identity otherwise.
#[derive(Debug, Clone)]
pub struct Dropout {
    rate: f32,
    rng: StdRng,

    // Forward metadata
    mask: Option<ArrayD<f32>>,
}

impl Dropout {
    /// Creates a new `Dropout`.
    ///
    /// # Arguments
    /// * `rate` - The probability of dropping a value, in `[0, 1)`.
    /// * `seed` - The seed of the layer's own random number generator.
    pub fn new(rate: f32, seed: u64) -> Self {
        Self {
            rate,
            rng: StdRng::seed_from_u64(seed),
            mask: None,
        }
    }

    pub fn forward(&mut self, mut x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        if mode == Mode::Infer {
            self.mask = None;
            return Ok(x);
        }

        let rate = self.rate;
        let scale = 1. / (1. - rate);
        let mask = ArrayD::from_shape_fn(x.raw_dim(), |_| {
            if self.rng.random::<f32>() < rate {
                0.
            } else {
                scale
            }
        });

        x *= &mask;
        self.mask = Some(mask);
        Ok(x)
    }

    pub fn backward(&mut self, mut d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let mask = self
            .mask
            .take()
            .ok_or(MlErr::MissingCache { layer: "Dropout" })?;

        d *= &mask;
        Ok(d)
    }
}
