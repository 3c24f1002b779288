mod adadelta;
mod adagrad;
mod adam;
mod gradient_descent_with_momentum;
mod nadam;
mod optimizer;
mod rmsprop;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use gradient_descent_with_momentum::GradientDescentWithMomentum;
pub use nadam::Nadam;
pub use optimizer::Optimizer;
pub use rmsprop::Rmsprop;

use architecture::OptimizerSpec;

/// Builds the optimizer described by `spec`.
///
/// # Arguments
/// * `spec` - The optimizer's specification.
/// * `len` - The amount of parameters the optimizer will update.
///
/// # Returns
/// The optimizer, ready to be used on a parameter buffer of `len` values.
pub fn build(spec: &OptimizerSpec, len: usize) -> Box<dyn Optimizer + Send> {
    match *spec {
        OptimizerSpec::Adam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } => Box::new(Adam::new(len, learning_rate, beta1, beta2, epsilon)),
        OptimizerSpec::Nadam {
            learning_rate,
            beta1,
            beta2,
            epsilon,
        } => Box::new(Nadam::new(len, learning_rate, beta1, beta2, epsilon)),
        OptimizerSpec::Adagrad {
            learning_rate,
            initial_accumulator,
            epsilon,
        } => Box::new(Adagrad::new(len, learning_rate, initial_accumulator, epsilon)),
        OptimizerSpec::Rmsprop {
            learning_rate,
            rho,
            epsilon,
        } => Box::new(Rmsprop::new(len, learning_rate, rho, epsilon)),
        OptimizerSpec::Adadelta {
            learning_rate,
            rho,
            epsilon,
        } => Box::new(Adadelta::new(len, learning_rate, rho, epsilon)),
        OptimizerSpec::SgdMomentum {
            learning_rate,
            momentum,
        } => Box::new(GradientDescentWithMomentum::new(len, learning_rate, momentum)),
    }
}

#[cfg(test)]
mod tests {
    use architecture::OptimizerKind;

    use super::*;
    use crate::MlErr;

    /// Minimizes `(w - 3)^2` starting from zero.
    fn minimize(spec: OptimizerSpec, steps: usize) -> f32 {
        let mut optimizer = build(&spec, 1);
        let mut params = [0.];

        for _ in 0..steps {
            let grad = [2. * (params[0] - 3.)];
            optimizer.update_params(&grad, &mut params).unwrap();
        }

        params[0]
    }

    #[test]
    fn every_optimizer_moves_towards_the_minimum() {
        for kind in OptimizerKind::ALL {
            let learning_rate = match kind {
                OptimizerKind::Adadelta => 1.,
                _ => 0.05,
            };

            let w = minimize(kind.spec(learning_rate), 200);
            assert!(w > 0.01, "{kind} didn't move, got {w}");
            assert!((w - 3.).abs() < 3., "{kind} diverged, got {w}");
        }
    }

    #[test]
    fn sgd_momentum_converges() {
        let w = minimize(OptimizerKind::SgdMomentum.spec(0.05), 500);
        assert!((w - 3.).abs() < 1e-3);
    }

    #[test]
    fn first_adam_step_has_the_length_of_the_learning_rate() {
        let mut adam = build(&OptimizerKind::Adam.spec(0.01), 2);
        let mut params = [1., 1.];

        adam.update_params(&[0.5, -20.], &mut params).unwrap();

        assert!((params[0] - 0.99).abs() < 1e-5);
        assert!((params[1] - 1.01).abs() < 1e-5);
    }

    #[test]
    fn size_mismatch_is_an_error() {
        let mut optimizer = build(&OptimizerKind::Rmsprop.spec(0.1), 3);
        let err = optimizer.update_params(&[0.; 2], &mut [0.; 3]).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
    }
}
