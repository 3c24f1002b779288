use crate::{MlErr, Result};

/// Defines the strategy for updating model parameters based on calculated gradients.
pub trait Optimizer {
    /// Updates the provided slice of parameters using the gradient.
    ///
    /// # Arguments
    /// * `grad` - A reference to the model's gradient.
    /// * `params` - The parameters to update.
    ///
    /// # Returns
    /// An error if there's a mismatch in the sizes of `grad`, `params` or the optimizer's state.
    fn update_params(&mut self, grad: &[f32], params: &mut [f32]) -> Result<()>;
}

/// Checks that `grad` and `params` have as many values as the optimizer was built for.
pub(super) fn check_sizes(grad: &[f32], params: &[f32], len: usize) -> Result<()> {
    for (what, got) in [("gradient", grad.len()), ("parameters", params.len())] {
        if got != len {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected: len,
            });
        }
    }

    Ok(())
}
