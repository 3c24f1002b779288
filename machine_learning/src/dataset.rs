use std::num::NonZeroUsize;

use ndarray::{Array2, ArrayD, Axis};
use rand::{Rng, seq::SliceRandom};

use crate::{MlErr, Result};

/// A labelled set of samples: inputs stacked along the first axis of `x` and one-hot labels
/// as the rows of `y`.
#[derive(Debug, Clone)]
pub struct Dataset {
    x: ArrayD<f32>,
    y: Array2<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `x` - The inputs, with the samples along the first axis.
    /// * `y` - The labels, one row per sample.
    ///
    /// # Returns
    /// An error if the dataset is empty or if `x` and `y` hold a different amount of samples.
    pub fn new(x: ArrayD<f32>, y: Array2<f32>) -> Result<Self> {
        let len = x.shape().first().copied().unwrap_or_default();
        if len == 0 {
            return Err(MlErr::EmptyDataset);
        }

        if y.nrows() != len {
            return Err(MlErr::SizeMismatch {
                what: "dataset labels",
                got: y.nrows(),
                expected: len,
            });
        }

        Ok(Self { x, y })
    }

    pub fn x(&self) -> &ArrayD<f32> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f32> {
        &self.y
    }

    /// Returns the amount of samples.
    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits the dataset in shuffled batches of `batch_size` samples, the last one may be
    /// smaller.
    ///
    /// # Arguments
    /// * `batch_size` - The amount of samples per batch.
    /// * `rng` - The generator used to shuffle the samples.
    pub fn shuffled_batches<'a, R: Rng>(
        &'a self,
        batch_size: NonZeroUsize,
        rng: &mut R,
    ) -> impl Iterator<Item = (ArrayD<f32>, Array2<f32>)> + use<'a, R> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(rng);

        let chunks: Vec<Vec<usize>> = order
            .chunks(batch_size.get())
            .map(<[usize]>::to_vec)
            .collect();

        chunks.into_iter().map(move |indices| {
            (
                self.x.select(Axis(0), &indices),
                self.y.select(Axis(0), &indices),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{IxDyn, array};
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn dataset() -> Dataset {
        let x = ArrayD::from_shape_fn(IxDyn(&[5, 2]), |idx| idx[0] as f32);
        let y = Array2::from_shape_fn((5, 1), |(i, _)| i as f32);
        Dataset::new(x, y).unwrap()
    }

    #[test]
    fn batches_cover_every_sample_once() {
        let dataset = dataset();
        let mut rng = StdRng::seed_from_u64(0);
        let batch_size = NonZeroUsize::new(2).unwrap();

        let batches: Vec<_> = dataset.shuffled_batches(batch_size, &mut rng).collect();
        let sizes: Vec<_> = batches.iter().map(|(_, y)| y.nrows()).collect();
        assert_eq!(sizes, [2, 2, 1]);

        let mut seen: Vec<_> = batches.iter().flat_map(|(_, y)| y.iter().copied()).collect();
        seen.sort_by(f32::total_cmp);
        assert_eq!(seen, [0., 1., 2., 3., 4.]);

        for (x, y) in &batches {
            for (row, label) in x.outer_iter().zip(y.column(0)) {
                assert!(row.iter().all(|v| v == label));
            }
        }
    }

    #[test]
    fn mismatched_labels_are_rejected() {
        let x = ArrayD::zeros(IxDyn(&[3, 4]));
        let err = Dataset::new(x, array![[1.], [0.]]).unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 2, expected: 3, .. }));
    }
}
