use ndarray::ArrayD;
use rand::Rng;

use super::{
    Mode,
    layers::{Layer, backward_chain, forward_chain, init_chain},
};
use crate::{MlErr, Result};

/// A sequential model: information flows forward when computing an output and backward when
/// computing the *deltas* of its layers.
///
/// The model doesn't own its parameters, they live in a flat buffer of `size()` values (and
/// a moving state buffer of `state_size()` values) owned by the caller.
#[derive(Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    /// Creates a new `Sequential`.
    ///
    /// # Arguments
    /// * `layers` - The layers the sequential is composed of.
    ///
    /// # Returns
    /// A new `Sequential` instance.
    pub fn new<I>(layers: I) -> Self
    where
        I: IntoIterator<Item = Layer>,
    {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Returns the amount of trainable parameters in the model.
    pub fn size(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    /// Returns the amount of non trainable values in the model.
    pub fn state_size(&self) -> usize {
        self.layers.iter().map(Layer::state_size).sum()
    }

    /// Makes a forward pass through the network.
    ///
    /// # Arguments
    /// * `params` - The parameters of the model.
    /// * `state` - The moving state of the model.
    /// * `x` - The input batch, samples along the first axis.
    /// * `mode` - Whether this pass will be back propagated.
    ///
    /// # Returns
    /// The prediction for the given input or an error if occurred.
    pub fn forward(
        &mut self,
        params: &[f32],
        state: &mut [f32],
        x: ArrayD<f32>,
        mode: Mode,
    ) -> Result<ArrayD<f32>> {
        self.check_len("parameters", params.len(), self.size())?;
        self.check_len("state", state.len(), self.state_size())?;
        forward_chain(&mut self.layers, params, state, x, mode)
    }

    /// Back propagates the delta of the last forward pass (which must have been made in
    /// training mode), overwriting `grad`.
    ///
    /// # Arguments
    /// * `params` - The parameters of the model.
    /// * `grad` - A buffer for writing the computed gradient.
    /// * `d` - The delta with respect to the output of the model.
    ///
    /// # Returns
    /// The delta with respect to the input of the model.
    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        self.check_len("parameters", params.len(), self.size())?;
        self.check_len("gradient", grad.len(), self.size())?;
        backward_chain(&mut self.layers, params, grad, d)
    }

    /// Writes the initial parameters and moving state of every layer.
    pub fn init<R: Rng>(&self, params: &mut [f32], state: &mut [f32], rng: &mut R) -> Result<()> {
        self.check_len("parameters", params.len(), self.size())?;
        self.check_len("state", state.len(), self.state_size())?;
        init_chain(&self.layers, params, state, rng)
    }

    fn check_len(&self, what: &'static str, got: usize, expected: usize) -> Result<()> {
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }

        Ok(())
    }
}
