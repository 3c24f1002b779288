use architecture::ActFn;
use ndarray::{ArrayD, Axis, Zip};

use crate::{MlErr, Result, arch::Mode};

/// An element-wise activation, or a softmax over the last axis.
#[derive(Debug, Clone)]
pub struct Activation {
    act_fn: ActFn,

    // Forward metadata
    a: Option<ArrayD<f32>>,
}

impl Activation {
    /// Creates a new `Activation`.
    pub fn new(act_fn: ActFn) -> Self {
        Self { act_fn, a: None }
    }

    /// Applies the activation to `z`.
    ///
    /// # Arguments
    /// * `z` - The pre-activations.
    /// * `mode` - Whether the output will be back propagated.
    ///
    /// # Returns
    /// The activations, with the same shape as `z`.
    pub fn forward(&mut self, mut z: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        match self.act_fn {
            ActFn::Softmax => softmax_inplace(&mut z),
            act_fn => z.mapv_inplace(|z| f(act_fn, z)),
        }

        self.a = match mode {
            Mode::Train => Some(z.clone()),
            Mode::Infer => None,
        };

        Ok(z)
    }

    /// Computes the delta with respect to the pre-activations.
    ///
    /// # Arguments
    /// * `d` - The delta with respect to the activations.
    pub fn backward(&mut self, mut d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let a = self
            .a
            .take()
            .ok_or(MlErr::MissingCache { layer: "Activation" })?;

        if d.shape() != a.shape() {
            return Err(MlErr::SizeMismatch {
                what: "activation delta",
                got: d.len(),
                expected: a.len(),
            });
        }

        match self.act_fn {
            ActFn::Softmax => {
                let last = Axis(a.ndim() - 1);
                let dots = (&d * &a).sum_axis(last).insert_axis(last);
                d -= &dots;
                d *= &a;
            }
            act_fn => d.zip_mut_with(&a, |d, &a| *d *= df(act_fn, a)),
        }

        Ok(d)
    }
}

fn f(act_fn: ActFn, z: f32) -> f32 {
    match act_fn {
        ActFn::Relu => z.max(0.),
        ActFn::Sigmoid => 1. / (1. + (-z).exp()),
        ActFn::Tanh => z.tanh(),
        ActFn::Elu if z > 0. => z,
        ActFn::Elu => z.exp_m1(),
        ActFn::Linear | ActFn::Softmax => z,
    }
}

/// The derivative of `act_fn` written in terms of its output `a`.
fn df(act_fn: ActFn, a: f32) -> f32 {
    match act_fn {
        ActFn::Relu => (a > 0.) as u8 as f32,
        ActFn::Sigmoid => a * (1. - a),
        ActFn::Tanh => 1. - a * a,
        ActFn::Elu if a > 0. => 1.,
        ActFn::Elu => a + 1.,
        ActFn::Linear | ActFn::Softmax => 1.,
    }
}

fn softmax_inplace(z: &mut ArrayD<f32>) {
    let last = Axis(z.ndim() - 1);

    Zip::from(z.lanes_mut(last)).for_each(|mut row| {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    });
}

#[cfg(test)]
mod tests {
    use ndarray::{ArrayD, IxDyn, array};

    use super::*;

    #[test]
    fn softmax_rows_sum_to_one() {
        let z = array![[1., 2., 3.], [1000., 1000., 1000.]].into_dyn();
        let mut softmax = Activation::new(ActFn::Softmax);

        let a = softmax.forward(z, Mode::Infer).unwrap();
        for row in a.rows() {
            assert!((row.sum() - 1.).abs() < 1e-6);
        }
        assert!((a[[1, 0]] - 1. / 3.).abs() < 1e-6);
    }

    #[test]
    fn relu_backward_masks_negative_inputs() {
        let z = ArrayD::from_shape_vec(IxDyn(&[1, 4]), vec![-1., 2., 0., 3.]).unwrap();
        let mut relu = Activation::new(ActFn::Relu);

        relu.forward(z, Mode::Train).unwrap();
        let d = relu.backward(ArrayD::ones(IxDyn(&[1, 4]))).unwrap();

        assert_eq!(d.into_raw_vec_and_offset().0, vec![0., 1., 0., 1.]);
    }

    #[test]
    fn backward_requires_a_training_forward() {
        let mut tanh = Activation::new(ActFn::Tanh);
        tanh.forward(ArrayD::zeros(IxDyn(&[2, 2])), Mode::Infer)
            .unwrap();

        let err = tanh.backward(ArrayD::zeros(IxDyn(&[2, 2]))).unwrap_err();
        assert!(matches!(err, MlErr::MissingCache { .. }));
    }
}
