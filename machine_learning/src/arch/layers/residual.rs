use ndarray::ArrayD;
use rand::Rng;

use super::{Layer, backward_chain, forward_chain, init_chain, take_front, take_front_mut};
use crate::{MlErr, Result, arch::Mode};

/// A residual unit: the main path and the (optionally projected) shortcut are summed and the
/// result goes through the tail.
///
/// Parameters and state are laid out as main path, shortcut and tail, in that order.
#[derive(Debug, Clone)]
pub struct Residual {
    index: usize,
    main: Vec<Layer>,
    shortcut: Option<Box<Layer>>,
    tail: Vec<Layer>,
}

impl Residual {
    /// Creates a new `Residual`.
    ///
    /// # Arguments
    /// * `index` - The position of the unit in its model, used for error reporting.
    /// * `main` - The layers of the main path.
    /// * `shortcut` - The projection of the shortcut, `None` for the identity.
    /// * `tail` - The layers applied to the sum.
    pub fn new(index: usize, main: Vec<Layer>, shortcut: Option<Layer>, tail: Vec<Layer>) -> Self {
        Self {
            index,
            main,
            shortcut: shortcut.map(Box::new),
            tail,
        }
    }

    pub fn size(&self) -> usize {
        self.sizes(Layer::size).iter().sum()
    }

    pub fn state_size(&self) -> usize {
        self.sizes(Layer::state_size).iter().sum()
    }

    /// Returns some per layer count for the main path, the shortcut and the tail.
    fn sizes<F>(&self, count: F) -> [usize; 3]
    where
        F: Fn(&Layer) -> usize,
    {
        [
            self.main.iter().map(&count).sum(),
            self.shortcut.as_deref().map(&count).unwrap_or_default(),
            self.tail.iter().map(&count).sum(),
        ]
    }

    /// Makes a forward pass through the unit.
    ///
    /// # Returns
    /// The output of the tail, or `ShapeMismatch` if the main path and the shortcut disagree.
    pub fn forward(
        &mut self,
        mut params: &[f32],
        mut state: &mut [f32],
        x: ArrayD<f32>,
        mode: Mode,
    ) -> Result<ArrayD<f32>> {
        let [main_size, shortcut_size, tail_size] = self.sizes(Layer::size);
        let [main_state, shortcut_state, tail_state] = self.sizes(Layer::state_size);

        let main_params = take_front(&mut params, main_size, "residual parameters")?;
        let shortcut_params = take_front(&mut params, shortcut_size, "residual parameters")?;
        let tail_params = take_front(&mut params, tail_size, "residual parameters")?;
        let main_s = take_front_mut(&mut state, main_state, "residual state")?;
        let shortcut_s = take_front_mut(&mut state, shortcut_state, "residual state")?;
        let tail_s = take_front_mut(&mut state, tail_state, "residual state")?;

        let skip = match &mut self.shortcut {
            Some(projection) => projection.forward(shortcut_params, shortcut_s, x.clone(), mode)?,
            None => x.clone(),
        };
        let main = forward_chain(&mut self.main, main_params, main_s, x, mode)?;

        if main.shape() != skip.shape() {
            return Err(MlErr::ShapeMismatch {
                layer: self.index,
                expected: main.shape().to_vec(),
                got: skip.shape().to_vec(),
            });
        }

        forward_chain(&mut self.tail, tail_params, tail_s, main + &skip, mode)
    }

    /// Makes a backward pass through the unit, the delta of the sum flows through both
    /// branches and their input deltas are added.
    pub fn backward(
        &mut self,
        mut params: &[f32],
        mut grad: &mut [f32],
        d: ArrayD<f32>,
    ) -> Result<ArrayD<f32>> {
        let [main_size, shortcut_size, tail_size] = self.sizes(Layer::size);

        let main_params = take_front(&mut params, main_size, "residual parameters")?;
        let shortcut_params = take_front(&mut params, shortcut_size, "residual parameters")?;
        let tail_params = take_front(&mut params, tail_size, "residual parameters")?;
        let main_grad = take_front_mut(&mut grad, main_size, "residual gradient")?;
        let shortcut_grad = take_front_mut(&mut grad, shortcut_size, "residual gradient")?;
        let tail_grad = take_front_mut(&mut grad, tail_size, "residual gradient")?;

        let d_sum = backward_chain(&mut self.tail, tail_params, tail_grad, d)?;
        let dx_main = backward_chain(&mut self.main, main_params, main_grad, d_sum.clone())?;
        let dx_skip = match &mut self.shortcut {
            Some(projection) => projection.backward(shortcut_params, shortcut_grad, d_sum)?,
            None => d_sum,
        };

        Ok(dx_main + &dx_skip)
    }

    pub fn init<R: Rng>(
        &self,
        mut params: &mut [f32],
        mut state: &mut [f32],
        rng: &mut R,
    ) -> Result<()> {
        let [main_size, shortcut_size, tail_size] = self.sizes(Layer::size);
        let [main_state, shortcut_state, tail_state] = self.sizes(Layer::state_size);

        let main_params = take_front_mut(&mut params, main_size, "residual parameters")?;
        let shortcut_params = take_front_mut(&mut params, shortcut_size, "residual parameters")?;
        let tail_params = take_front_mut(&mut params, tail_size, "residual parameters")?;
        let main_s = take_front_mut(&mut state, main_state, "residual state")?;
        let shortcut_s = take_front_mut(&mut state, shortcut_state, "residual state")?;
        let tail_s = take_front_mut(&mut state, tail_state, "residual state")?;

        init_chain(&self.main, main_params, main_s, rng)?;
        if let Some(projection) = &self.shortcut {
            projection.init(shortcut_params, shortcut_s, rng)?;
        }
        init_chain(&self.tail, tail_params, tail_s, rng)
    }
}
