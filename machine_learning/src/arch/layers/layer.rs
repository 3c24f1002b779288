use ndarray::ArrayD;
use rand::Rng;

use super::{Activation, AvgPool, BatchNorm, Conv2d, Dense, Dropout, Flatten, Residual};
use crate::{Result, arch::Mode};

/// A compiled layer. Layers don't own their parameters, each pass receives the slice of the
/// model's parameters (and moving state) that belongs to the layer.
#[derive(Debug, Clone)]
pub enum Layer {
    Conv2d(Conv2d),
    BatchNorm(BatchNorm),
    Activation(Activation),
    AvgPool(AvgPool),
    Dropout(Dropout),
    Flatten(Flatten),
    Dense(Dense),
    Residual(Residual),
}

impl Layer {
    /// Returns the amount of trainable parameters of this layer.
    pub fn size(&self) -> usize {
        match self {
            Layer::Conv2d(l) => l.size(),
            Layer::BatchNorm(l) => l.size(),
            Layer::Dense(l) => l.size(),
            Layer::Residual(l) => l.size(),
            _ => 0,
        }
    }

    /// Returns the amount of non trainable values (moving statistics) of this layer.
    pub fn state_size(&self) -> usize {
        match self {
            Layer::BatchNorm(l) => l.state_size(),
            Layer::Residual(l) => l.state_size(),
            _ => 0,
        }
    }

    /// Makes a forward pass through this layer.
    ///
    /// # Arguments
    /// * `params` - The parameters of this layer.
    /// * `state` - The moving state of this layer, updated in training mode.
    /// * `x` - The input batch.
    /// * `mode` - Whether this pass will be back propagated.
    ///
    /// # Returns
    /// The output batch or an error if the input doesn't fit this layer.
    pub fn forward(
        &mut self,
        params: &[f32],
        state: &mut [f32],
        x: ArrayD<f32>,
        mode: Mode,
    ) -> Result<ArrayD<f32>> {
        match self {
            Layer::Conv2d(l) => l.forward(params, x, mode),
            Layer::BatchNorm(l) => l.forward(params, state, x, mode),
            Layer::Activation(l) => l.forward(x, mode),
            Layer::AvgPool(l) => l.forward(x, mode),
            Layer::Dropout(l) => l.forward(x, mode),
            Layer::Flatten(l) => l.forward(x, mode),
            Layer::Dense(l) => l.forward(params, x, mode),
            Layer::Residual(l) => l.forward(params, state, x, mode),
        }
    }

    /// Makes a backward pass through this layer, overwriting its gradient.
    ///
    /// # Arguments
    /// * `params` - The parameters of this layer.
    /// * `grad` - The gradient of this layer.
    /// * `d` - The delta with respect to the output of this layer.
    ///
    /// # Returns
    /// The delta with respect to the input of this layer.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        match self {
            Layer::Conv2d(l) => l.backward(params, grad, d),
            Layer::BatchNorm(l) => l.backward(params, grad, d),
            Layer::Activation(l) => l.backward(d),
            Layer::AvgPool(l) => l.backward(d),
            Layer::Dropout(l) => l.backward(d),
            Layer::Flatten(l) => l.backward(d),
            Layer::Dense(l) => l.backward(params, grad, d),
            Layer::Residual(l) => l.backward(params, grad, d),
        }
    }

    /// Writes the initial parameters and state of this layer.
    pub fn init<R: Rng>(&self, params: &mut [f32], state: &mut [f32], rng: &mut R) -> Result<()> {
        match self {
            Layer::Conv2d(l) => l.init(params, rng),
            Layer::BatchNorm(l) => {
                l.init(params, state);
                Ok(())
            }
            Layer::Dense(l) => l.init(params, rng),
            Layer::Residual(l) => l.init(params, state, rng),
            _ => Ok(()),
        }
    }
}
