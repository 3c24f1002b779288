use ndarray::{ArrayD, prelude::*, s};
use rayon::prelude::*;

use crate::{MlErr, Result, arch::Mode};

/// Average pooling with a stride equal to the pool size and same padding. Windows clipped by
/// the border average only their valid cells.
#[derive(Debug, Clone)]
pub struct AvgPool {
    pool: (usize, usize),

    // Forward metadata
    in_dim: Option<(usize, usize, usize, usize)>,
}

impl AvgPool {
    pub fn new(pool: (usize, usize)) -> Self {
        Self { pool, in_dim: None }
    }

    /// The rows and columns covered by the output cell `(i, j)`.
    fn window(&self, i: usize, j: usize, h: usize, w: usize) -> ((usize, usize), (usize, usize)) {
        let (ph, pw) = self.pool;
        let rows = (i * ph, (i * ph + ph).min(h));
        let cols = (j * pw, (j * pw + pw).min(w));
        (rows, cols)
    }

    pub fn forward(&mut self, x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, h, w, c) = x.dim();
        let (oh, ow) = (h.div_ceil(self.pool.0), w.div_ceil(self.pool.1));

        let mut out = Array4::zeros((n, oh, ow, c));
        out.outer_iter_mut()
            .into_par_iter()
            .zip(x.outer_iter().into_par_iter())
            .for_each(|(mut out, sample)| {
                for (i, j) in (0..oh).flat_map(|i| (0..ow).map(move |j| (i, j))) {
                    let ((r0, r1), (c0, c1)) = self.window(i, j, h, w);
                    let count = ((r1 - r0) * (c1 - c0)) as f32;

                    let window = sample.slice(s![r0..r1, c0..c1, ..]);
                    let mean = window.sum_axis(Axis(0)).sum_axis(Axis(0)) / count;
                    out.slice_mut(s![i, j, ..]).assign(&mean);
                }
            });

        self.in_dim = match mode {
            Mode::Train => Some((n, h, w, c)),
            Mode::Infer => None,
        };

        Ok(out.into_dyn())
    }

    /// Spreads every output delta evenly over the cells of its window.
    pub fn backward(&mut self, d: ArrayD<f32>) -> Result<ArrayD<f32>> {
        let (n, h, w, c) = self
            .in_dim
            .take()
            .ok_or(MlErr::MissingCache { layer: "AveragePooling2D" })?;
        let d = d.into_dimensionality::<Ix4>()?;
        let (_, oh, ow, _) = d.dim();

        let mut dx = Array4::zeros((n, h, w, c));
        dx.outer_iter_mut()
            .into_par_iter()
            .zip(d.outer_iter().into_par_iter())
            .for_each(|(mut dx, d)| {
                for (i, j) in (0..oh).flat_map(|i| (0..ow).map(move |j| (i, j))) {
                    let ((r0, r1), (c0, c1)) = self.window(i, j, h, w);
                    let count = ((r1 - r0) * (c1 - c0)) as f32;

                    let share = &d.slice(s![i, j, ..]) / count;
                    let mut window = dx.slice_mut(s![r0..r1, c0..c1, ..]);
                    window += &share;
                }
            });

        Ok(dx.into_dyn())
    }
}
