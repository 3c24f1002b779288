use ndarray::{Array2, ArrayView2, Zip};

use super::LossFn;

/// The bound predictions are clipped to before taking their logarithm.
pub const EPSILON: f32 = 1e-7;

/// Categorical cross-entropy over one-hot (or soft) labels and class probabilities.
#[derive(Debug, Default, Clone, Copy)]
pub struct CategoricalCrossEntropy;

impl CategoricalCrossEntropy {
    /// Returns a new `CategoricalCrossEntropy`.
    pub fn new() -> Self {
        Self
    }
}

fn clip(p: f32) -> f32 {
    p.clamp(EPSILON, 1. - EPSILON)
}

impl LossFn for CategoricalCrossEntropy {
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32 {
        let n = y_pred.nrows().max(1) as f32;
        let total = Zip::from(&y_pred)
            .and(&y)
            .fold(0., |acc, &p, &t| acc - t * clip(p).ln());

        total / n
    }

    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32> {
        let n = y_pred.nrows().max(1) as f32;
        Zip::from(&y_pred)
            .and(&y)
            .map_collect(|&p, &t| -t / (clip(p) * n))
    }
}
