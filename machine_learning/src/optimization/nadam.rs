use super::{Optimizer, optimizer::check_sizes};
use crate::Result;

/// The decay applied to `beta1` on every step to build the momentum schedule.
const SCHEDULE_DECAY: f32 = 0.004;

/// Adam with Nesterov momentum, following the momentum schedule of Dozat (2016).
#[derive(Debug)]
pub struct Nadam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    step: i32,
    beta2_t: f32,
    u_product: f32,
    m: Box<[f32]>,
    v: Box<[f32]>,
}

impl Nadam {
    /// Creates a new `Nadam` optimizer.
    ///
    /// # Arguments
    /// * `len` - The amount of parameters this instance should hold.
    /// * `learning_rate` - The small coefficient that modulates the amount of training per update.
    /// * `beta1` - The decay of the first moment estimate.
    /// * `beta2` - The decay of the second moment estimate.
    /// * `epsilon` - A small constant for numerical stability.
    pub fn new(len: usize, learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            step: 0,
            beta2_t: 1.,
            u_product: 1.,
            m: vec![0.; len].into_boxed_slice(),
            v: vec![0.; len].into_boxed_slice(),
        }
    }

    fn momentum_at(&self, step: i32) -> f32 {
        self.beta1 * (1. - 0.5 * 0.96f32.powf(SCHEDULE_DECAY * step as f32))
    }
}

impl Optimizer for Nadam {
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()> {
        check_sizes(grad, params, self.m.len())?;

        self.step += 1;
        self.beta2_t *= self.beta2;

        let u_t = self.momentum_at(self.step);
        let u_next = self.momentum_at(self.step + 1);
        self.u_product *= u_t;
        let u_product_next = self.u_product * u_next;

        let Self {
            learning_rate: lr,
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            beta2_t,
            u_product,
            ..
        } = *self;

        params
            .iter_mut()
            .zip(grad)
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
            .for_each(|(((w, g), m), v)| {
                *m = b1 * *m + (1. - b1) * g;
                *v = b2 * *v + (1. - b2) * g.powi(2);

                let m_hat =
                    u_next * *m / (1. - u_product_next) + (1. - u_t) * g / (1. - u_product);
                let v_hat = *v / (1. - beta2_t);
                *w -= lr * m_hat / (v_hat.sqrt() + eps);
            });

        Ok(())
    }
}
