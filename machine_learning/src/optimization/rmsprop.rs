use super::{Optimizer, optimizer::check_sizes};
use crate::Result;

#[derive(Debug)]
pub struct Rmsprop {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
    velocity: Box<[f32]>,
}

impl Rmsprop {
    /// Creates a new `Rmsprop` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `rho` - The decay of the squared gradient average.
    /// * `epsilon` - A small constant for numerical stability.
    pub fn new(len: usize, learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
            velocity: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Rmsprop {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params, self.velocity.len())?;

        let lr = self.learning_rate;
        let rho = self.rho;
        let eps = self.epsilon;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.velocity.iter_mut())
            .for_each(|((w, g), v)| {
                *v = rho * *v + (1. - rho) * g.powi(2);
                *w -= lr * g / (*v + eps).sqrt();
            });

        Ok(())
    }
}
