use ndarray::{Array2, ArrayView2};

pub trait LossFn {
    /// Computes the mean loss of a batch of predictions.
    fn loss(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> f32;

    /// Computes the derivative of `loss` with respect to every prediction.
    fn loss_prime(&self, y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Array2<f32>;
}
