use ndarray::{ArrayD, prelude::*};

use crate::{MlErr, Result, arch::Mode};

pub const MOMENTUM: f32 = 0.99;
pub const EPSILON: f32 = 1e-3;

/// Normalizes the last axis of its input.
///
/// Parameters are `[gamma; c]` followed by `[beta; c]`, the state is the moving mean followed
/// by the moving variance.
#[derive(Debug, Clone)]
pub struct BatchNorm {
    channels: usize,
    momentum: f32,
    epsilon: f32,

    // Forward metadata
    x_hat: Option<Array2<f32>>,
    inv_std: Array1<f32>,
}

impl BatchNorm {
    /// Creates a new `BatchNorm` over `channels` features.
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            momentum: MOMENTUM,
            epsilon: EPSILON,
            x_hat: None,
            inv_std: Array1::zeros(channels),
        }
    }

    pub fn size(&self) -> usize {
        2 * self.channels
    }

    pub fn state_size(&self) -> usize {
        2 * self.channels
    }

    /// Normalizes `x` with the batch statistics while training, updating the moving ones, and
    /// with the moving statistics otherwise.
    pub fn forward(
        &mut self,
        params: &[f32],
        state: &mut [f32],
        x: ArrayD<f32>,
        mode: Mode,
    ) -> Result<ArrayD<f32>> {
        let c = self.channels;
        let shape = x.raw_dim();
        let channels = x.shape().last().copied().unwrap_or_default();
        if channels != c {
            return Err(MlErr::SizeMismatch {
                what: "normalized channels",
                got: channels,
                expected: c,
            });
        }

        let rows = x.len() / c;
        let x = x.into_shape_with_order((rows, c))?;
        let (gamma, beta) = params.split_at(c);
        let (gamma, beta) = (ArrayView1::from(gamma), ArrayView1::from(beta));
        let (moving_mean, moving_var) = state.split_at_mut(c);

        let (mean, var) = match mode {
            Mode::Train => {
                let mean = x.mean_axis(Axis(0)).ok_or(MlErr::EmptyDataset)?;
                let var = x.var_axis(Axis(0), 0.);

                let m = self.momentum;
                for ((mm, mv), (bm, bv)) in moving_mean
                    .iter_mut()
                    .zip(moving_var.iter_mut())
                    .zip(mean.iter().zip(&var))
                {
                    *mm = m * *mm + (1. - m) * bm;
                    *mv = m * *mv + (1. - m) * bv;
                }

                (mean, var)
            }
            Mode::Infer => (
                ArrayView1::from(&*moving_mean).to_owned(),
                ArrayView1::from(&*moving_var).to_owned(),
            ),
        };

        let inv_std = var.mapv(|v| 1. / (v + self.epsilon).sqrt());
        let x_hat = (x - &mean) * &inv_std;
        let y = &x_hat * &gamma + &beta;

        if mode == Mode::Train {
            self.x_hat = Some(x_hat);
            self.inv_std = inv_std;
        }

        Ok(y.into_shape_with_order(shape)?)
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let c = self.channels;
        let x_hat = self
            .x_hat
            .take()
            .ok_or(MlErr::MissingCache { layer: "BatchNormalization" })?;

        let shape = d.raw_dim();
        let d = d.into_shape_with_order((x_hat.nrows(), c))?;
        let m = d.nrows() as f32;

        let gamma = ArrayView1::from(&params[..c]);
        let (dgamma, dbeta) = grad.split_at_mut(c);
        ArrayViewMut1::from(dgamma).assign(&(&d * &x_hat).sum_axis(Axis(0)));
        ArrayViewMut1::from(dbeta).assign(&d.sum_axis(Axis(0)));

        let dx_hat = d * &gamma;
        let sum_dx_hat = dx_hat.sum_axis(Axis(0));
        let sum_dx_hat_x_hat = (&dx_hat * &x_hat).sum_axis(Axis(0));

        let dx = (dx_hat * m - &sum_dx_hat - &x_hat * &sum_dx_hat_x_hat) * &(&self.inv_std / m);
        Ok(dx.into_shape_with_order(shape)?)
    }

    /// Sets `gamma` to ones, `beta` to zeros and the moving statistics to a standard normal.
    pub fn init(&self, params: &mut [f32], state: &mut [f32]) {
        let c = self.channels;
        params[..c].fill(1.);
        params[c..].fill(0.);
        state[..c].fill(0.);
        state[c..].fill(1.);
    }
}
