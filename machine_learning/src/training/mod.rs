mod classifier;
mod history;

pub use classifier::Classifier;
pub use history::{Evaluation, History};

use ndarray::{Array2, ArrayView1, ArrayView2};

use crate::{MlErr, Result};

/// Encodes integer labels as one-hot rows.
///
/// # Arguments
/// * `labels` - The class of every sample.
/// * `num_classes` - The amount of classes.
///
/// # Returns
/// A `(labels.len(), num_classes)` matrix or an error if some label is out of range.
pub fn one_hot(labels: &[usize], num_classes: usize) -> Result<Array2<f32>> {
    let mut encoded = Array2::zeros((labels.len(), num_classes));

    for (mut row, &label) in encoded.rows_mut().into_iter().zip(labels) {
        let cell = row
            .get_mut(label)
            .ok_or(MlErr::InvalidLabel { label, num_classes })?;
        *cell = 1.;
    }

    Ok(encoded)
}

/// Returns the index of the largest value of `row`, the first one on ties.
pub fn argmax(row: ArrayView1<f32>) -> usize {
    row.iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max { (i, v) } else { (best, max) }
        })
        .0
}

/// Counts the rows of `y_pred` whose most likely class matches the one of `y`.
pub(crate) fn count_correct(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> usize {
    y_pred
        .rows()
        .into_iter()
        .zip(y.rows())
        .filter(|(p, t)| argmax(p.view()) == argmax(t.view()))
        .count()
}
