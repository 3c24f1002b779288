use super::{Optimizer, optimizer::check_sizes};
use crate::Result;

#[derive(Debug)]
pub struct Adadelta {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
    accumulated_grad: Box<[f32]>,
    accumulated_delta: Box<[f32]>,
}

impl Adadelta {
    /// Creates a new `Adadelta` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The coefficient the adaptive step is scaled by.
    /// * `rho` - The decay of both running averages.
    /// * `epsilon` - A small constant for numerical stability.
    pub fn new(len: usize, learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
            accumulated_grad: vec![0.; len].into_boxed_slice(),
            accumulated_delta: vec![0.; len].into_boxed_slice(),
        }
    }
}

impl Optimizer for Adadelta {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params, self.accumulated_grad.len())?;

        let lr = self.learning_rate;
        let rho = self.rho;
        let eps = self.epsilon;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.accumulated_grad.iter_mut())
            .zip(self.accumulated_delta.iter_mut())
            .for_each(|(((w, g), acc_g), acc_d)| {
                *acc_g = rho * *acc_g + (1. - rho) * g.powi(2);
                let delta = -(*acc_d + eps).sqrt() / (*acc_g + eps).sqrt() * g;
                *acc_d = rho * *acc_d + (1. - rho) * delta.powi(2);
                *w += lr * delta;
            });

        Ok(())
    }
}
