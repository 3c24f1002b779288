use ndarray::{ArrayD, IxDyn};

use crate::{MlErr, Result, arch::Mode};

/// Collapses every axis but the batch one.
#[derive(Debug, Clone, Default)]
pub struct Flatten {
    in_dim: Option<IxDyn>,
}

impl Flatten {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forward(&mut self, x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        let in_dim = x.raw_dim();
        let n = x.shape().first().copied().unwrap_or_default();
        let units = x.shape().iter().skip(1).product();

        let y = x.into_shape_with_order(IxDyn(&[n, units]))?;
        self.in_dim = (mode == Mode::Train).then_some(in_dim);
        Ok(y)
    }

    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let in_dim = self
            .in_dim
            .take()
            .ok_or(MlErr::MissingCache { layer: "Flatten" })?;

        Ok(d.into_shape_with_order(in_dim)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_batches_keep_their_units() {
        let mut flatten = Flatten::new();

        let y = flatten
            .forward(ArrayD::zeros(IxDyn(&[0, 2, 3, 4])), Mode::Infer)
            .unwrap();

        assert_eq!(y.shape(), &[0, 24]);
    }
}
