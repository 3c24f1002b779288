mod activation;
mod avg_pool;
mod batch_norm;
mod conv2d;
mod dense;
mod dropout;
mod flatten;
mod layer;
mod residual;

pub use activation::Activation;
pub use avg_pool::AvgPool;
pub use batch_norm::BatchNorm;
pub use conv2d::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use layer::Layer;
pub use residual::Residual;

use ndarray::ArrayD;
use rand::Rng;

use super::Mode;
use crate::{MlErr, Result};

/// Splits the first `at` values off `slice`.
fn take_front<'a>(slice: &mut &'a [f32], at: usize, what: &'static str) -> Result<&'a [f32]> {
    let whole: &'a [f32] = *slice;
    let (front, rest) = whole.split_at_checked(at).ok_or(MlErr::SizeMismatch {
        what,
        got: whole.len(),
        expected: at,
    })?;

    *slice = rest;
    Ok(front)
}

/// Splits the first `at` values off the mutable `slice`.
fn take_front_mut<'a>(
    slice: &mut &'a mut [f32],
    at: usize,
    what: &'static str,
) -> Result<&'a mut [f32]> {
    let len = slice.len();
    let (front, rest) = std::mem::take(slice)
        .split_at_mut_checked(at)
        .ok_or(MlErr::SizeMismatch {
            what,
            got: len,
            expected: at,
        })?;

    *slice = rest;
    Ok(front)
}

/// Splits the last `at` values off `slice`.
fn take_back<'a>(slice: &mut &'a [f32], at: usize, what: &'static str) -> Result<&'a [f32]> {
    let whole: &'a [f32] = *slice;
    let mid = whole.len().checked_sub(at).ok_or(MlErr::SizeMismatch {
        what,
        got: whole.len(),
        expected: at,
    })?;

    let (rest, back) = whole.split_at(mid);
    *slice = rest;
    Ok(back)
}

/// Splits the last `at` values off the mutable `slice`.
fn take_back_mut<'a>(
    slice: &mut &'a mut [f32],
    at: usize,
    what: &'static str,
) -> Result<&'a mut [f32]> {
    let len = slice.len();
    let mid = len.checked_sub(at).ok_or(MlErr::SizeMismatch {
        what,
        got: len,
        expected: at,
    })?;

    let (rest, back) = std::mem::take(slice).split_at_mut(mid);
    *slice = rest;
    Ok(back)
}

/// Makes a forward pass through a chain of layers, handing each one its own slice of
/// `params` and `state`.
pub(crate) fn forward_chain(
    layers: &mut [Layer],
    mut params: &[f32],
    mut state: &mut [f32],
    mut x: ArrayD<f32>,
    mode: Mode,
) -> Result<ArrayD<f32>> {
    for layer in layers {
        let p = take_front(&mut params, layer.size(), "layer parameters")?;
        let s = take_front_mut(&mut state, layer.state_size(), "layer state")?;
        x = layer.forward(p, s, x, mode)?;
    }

    Ok(x)
}

/// Makes a backward pass through a chain of layers, writing each layer's gradient into its
/// slice of `grad`.
///
/// # Returns
/// The delta with respect to the input of the first layer.
pub(crate) fn backward_chain(
    layers: &mut [Layer],
    mut params: &[f32],
    mut grad: &mut [f32],
    mut d: ArrayD<f32>,
) -> Result<ArrayD<f32>> {
    for layer in layers.iter_mut().rev() {
        let p = take_back(&mut params, layer.size(), "layer parameters")?;
        let g = take_back_mut(&mut grad, layer.size(), "layer gradient")?;
        d = layer.backward(p, g, d)?;
    }

    Ok(d)
}

/// Initializes the parameters and state of a chain of layers.
pub(crate) fn init_chain<R: Rng>(
    layers: &[Layer],
    mut params: &mut [f32],
    mut state: &mut [f32],
    rng: &mut R,
) -> Result<()> {
    for layer in layers {
        let p = take_front_mut(&mut params, layer.size(), "layer parameters")?;
        let s = take_front_mut(&mut state, layer.state_size(), "layer state")?;
        layer.init(p, s, rng)?;
    }

    Ok(())
}
