use architecture::ActFn;
use ndarray::{ArrayD, prelude::*, s};
use rand::Rng;
use rayon::prelude::*;

use super::Activation;
use crate::{MlErr, Result, arch::Mode, arch::init::RandWeightGen};

/// A 2D convolution over NHWC batches with stride 1 and same padding.
///
/// The kernel is laid out as `(kh, kw, in_channels, filters)` followed by one bias per
/// filter. Patches are unrolled (im2col) so that both passes reduce to matrix products.
#[derive(Debug, Clone)]
pub struct Conv2d {
    kernel: (usize, usize),
    in_channels: usize,
    filters: usize,
    act_fn: Option<Activation>,

    // Forward metadata
    cols: Option<Array2<f32>>,
    in_dim: (usize, usize, usize),
}

impl Conv2d {
    /// Creates a new `Conv2d`.
    ///
    /// # Arguments
    /// * `kernel` - The height and width of the kernel.
    /// * `in_channels` - The channels of the input feature maps.
    /// * `filters` - The channels of the output feature maps.
    /// * `act_fn` - An optional activation applied to the output.
    pub fn new(
        kernel: (usize, usize),
        in_channels: usize,
        filters: usize,
        act_fn: Option<ActFn>,
    ) -> Self {
        Self {
            kernel,
            in_channels,
            filters,
            act_fn: act_fn.map(Activation::new),
            cols: None,
            in_dim: (0, 0, 0),
        }
    }

    /// Returns the amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.patch_len() * self.filters + self.filters
    }

    fn patch_len(&self) -> usize {
        self.kernel.0 * self.kernel.1 * self.in_channels
    }

    pub fn forward(&mut self, params: &[f32], x: ArrayD<f32>, mode: Mode) -> Result<ArrayD<f32>> {
        let x = x.into_dimensionality::<Ix4>()?;
        let (n, h, w, c) = x.dim();
        if c != self.in_channels {
            return Err(MlErr::SizeMismatch {
                what: "convolution input channels",
                got: c,
                expected: self.in_channels,
            });
        }

        let cols = self.im2col(x.view())?;
        let (kernel, biases) = self.view_params(params)?;

        let mut z = cols.dot(&kernel);
        z += &biases;
        let z = z.into_shape_with_order((n, h, w, self.filters))?.into_dyn();

        if mode == Mode::Train {
            self.cols = Some(cols);
            self.in_dim = (n, h, w);
        }

        match &mut self.act_fn {
            Some(act_fn) => act_fn.forward(z, mode),
            None => Ok(z),
        }
    }

    pub fn backward(
        &mut self,
        params: &[f32],
        grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let d = match &mut self.act_fn {
            Some(act_fn) => act_fn.backward(d)?,
            None => d,
        };

        let cols = self.cols.take().ok_or(MlErr::MissingCache { layer: "Conv2D" })?;
        let (n, h, w) = self.in_dim;
        let d = d.to_shape((n * h * w, self.filters))?;

        let (dk_raw, db_raw) = grad.split_at_mut(self.patch_len() * self.filters);
        let mut dk = ArrayViewMut2::from_shape((self.patch_len(), self.filters), dk_raw)?;
        let mut db = ArrayViewMut1::from_shape(self.filters, db_raw)?;
        dk.assign(&cols.t().dot(&d));
        db.assign(&d.sum_axis(Axis(0)));

        let (kernel, _) = self.view_params(params)?;
        let dcols = d.dot(&kernel.t());
        Ok(self.col2im(dcols)?.into_dyn())
    }

    pub fn init<R: Rng>(&self, params: &mut [f32], rng: &mut R) -> Result<()> {
        let (kh, kw) = self.kernel;
        let fan_in = kh * kw * self.in_channels;
        let fan_out = kh * kw * self.filters;

        let (kernel, biases) = params.split_at_mut(self.patch_len() * self.filters);
        RandWeightGen::glorot_uniform(rng, fan_in, fan_out)?.fill(kernel);
        biases.fill(0.);
        Ok(())
    }

    /// Returns the offset of the first kernel row and column relative to the output position.
    fn padding(&self) -> (usize, usize) {
        ((self.kernel.0 - 1) / 2, (self.kernel.1 - 1) / 2)
    }

    /// Unrolls every patch of `x` into a row of a `(n * h * w, kh * kw * c)` matrix, one
    /// sample per rayon task. Patch cells falling on the padding are left as zeros.
    fn im2col(&self, x: ArrayView4<f32>) -> Result<Array2<f32>> {
        let (n, h, w, c) = x.dim();
        let (kh, kw) = self.kernel;
        let (pt, pl) = self.padding();
        let patch_len = self.patch_len();

        let mut cols = Array3::zeros((n, h * w, patch_len));
        cols.outer_iter_mut()
            .into_par_iter()
            .zip(x.outer_iter().into_par_iter())
            .for_each(|(mut col, sample)| {
                for (i, j) in (0..h).flat_map(|i| (0..w).map(move |j| (i, j))) {
                    let mut row = col.row_mut(i * w + j);

                    for (di, dj) in (0..kh).flat_map(|di| (0..kw).map(move |dj| (di, dj))) {
                        let (Some(si), Some(sj)) = (
                            (i + di).checked_sub(pt).filter(|&si| si < h),
                            (j + dj).checked_sub(pl).filter(|&sj| sj < w),
                        ) else {
                            continue;
                        };

                        let offset = (di * kw + dj) * c;
                        row.slice_mut(s![offset..offset + c])
                            .assign(&sample.slice(s![si, sj, ..]));
                    }
                }
            });

        Ok(cols.into_shape_with_order((n * h * w, patch_len))?)
    }

    /// Folds the unrolled patch deltas back into an `(n, h, w, c)` delta, summing the
    /// contributions of overlapping patches.
    fn col2im(&self, dcols: Array2<f32>) -> Result<Array4<f32>> {
        let (n, h, w) = self.in_dim;
        let c = self.in_channels;
        let (kh, kw) = self.kernel;
        let (pt, pl) = self.padding();

        let dcols = dcols.into_shape_with_order((n, h * w, self.patch_len()))?;
        let mut dx = Array4::zeros((n, h, w, c));

        dx.outer_iter_mut()
            .into_par_iter()
            .zip(dcols.outer_iter().into_par_iter())
            .for_each(|(mut dsample, col)| {
                for (i, j) in (0..h).flat_map(|i| (0..w).map(move |j| (i, j))) {
                    let row = col.row(i * w + j);

                    for (di, dj) in (0..kh).flat_map(|di| (0..kw).map(move |dj| (di, dj))) {
                        let (Some(si), Some(sj)) = (
                            (i + di).checked_sub(pt).filter(|&si| si < h),
                            (j + dj).checked_sub(pl).filter(|&sj| sj < w),
                        ) else {
                            continue;
                        };

                        let offset = (di * kw + dj) * c;
                        let mut cell = dsample.slice_mut(s![si, sj, ..]);
                        cell += &row.slice(s![offset..offset + c]);
                    }
                }
            });

        Ok(dx)
    }

    /// Gives a view of the raw parameter slice as the unrolled kernel and the biases.
    fn view_params<'a>(
        &self,
        params: &'a [f32],
    ) -> Result<(ArrayView2<'a, f32>, ArrayView1<'a, f32>)> {
        let (k_raw, b_raw) = params.split_at(self.patch_len() * self.filters);
        let kernel = ArrayView2::from_shape((self.patch_len(), self.filters), k_raw)?;
        let biases = ArrayView1::from_shape(self.filters, b_raw)?;
        Ok((kernel, biases))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::IxDyn;

    use super::*;

    #[test]
    fn identity_kernel_keeps_the_input() {
        let mut conv = Conv2d::new((3, 3), 1, 1, None);
        let mut params = vec![0.; conv.size()];
        params[4] = 1.;

        let x = ArrayD::from_shape_fn(IxDyn(&[2, 3, 4, 1]), |idx| (idx[1] * 4 + idx[2]) as f32);
        let y = conv.forward(&params, x.clone(), Mode::Infer).unwrap();

        assert_eq!(y, x);
    }

    #[test]
    fn same_padding_sums_the_valid_neighbourhood() {
        let mut conv = Conv2d::new((3, 3), 1, 1, None);
        let mut params = vec![1.; conv.size()];
        params[9] = 0.5;

        let x = ArrayD::ones(IxDyn(&[1, 3, 3, 1]));
        let y = conv.forward(&params, x, Mode::Infer).unwrap();

        assert_eq!(y[[0, 0, 0, 0]], 4.5);
        assert_eq!(y[[0, 0, 1, 0]], 6.5);
        assert_eq!(y[[0, 1, 1, 0]], 9.5);
    }

    #[test]
    fn wrong_channel_count_is_rejected() {
        let mut conv = Conv2d::new((3, 3), 3, 8, Some(ActFn::Relu));
        let params = vec![0.; conv.size()];

        let err = conv
            .forward(&params, ArrayD::zeros(IxDyn(&[1, 4, 4, 1])), Mode::Infer)
            .unwrap_err();
        assert!(matches!(err, MlErr::SizeMismatch { got: 1, expected: 3, .. }));
    }
}
