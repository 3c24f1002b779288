use serde::{Deserialize, Serialize};

use crate::{ActFn, ArchErr, Result, Shape};

/// How a windowed operation treats the borders of its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Padding {
    /// The output keeps `ceil(input / stride)` positions per spatial axis.
    #[default]
    Same,
}

/// The specification of a single layer in a `LayerGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerSpec {
    Conv2d {
        filters: usize,
        kernel: (usize, usize),
        padding: Padding,
        act_fn: Option<ActFn>,
    },
    BatchNorm,
    Activation {
        act_fn: ActFn,
    },
    AvgPool {
        pool: (usize, usize),
        padding: Padding,
    },
    Dropout {
        rate: f32,
    },
    Flatten,
    Dense {
        units: usize,
        act_fn: ActFn,
    },
    Residual(ResidualBlockSpec),
}

impl LayerSpec {
    /// A 3x3 convolution with same padding.
    pub fn conv(filters: usize, act_fn: Option<ActFn>) -> Self {
        Self::Conv2d {
            filters,
            kernel: (3, 3),
            padding: Padding::Same,
            act_fn,
        }
    }

    /// A 1x1 convolution used to project a shortcut onto `filters` channels.
    pub fn projection(filters: usize) -> Self {
        Self::Conv2d {
            filters,
            kernel: (1, 1),
            padding: Padding::Same,
            act_fn: None,
        }
    }

    pub fn activation(act_fn: ActFn) -> Self {
        Self::Activation { act_fn }
    }

    /// A 2x2 average pooling with same padding.
    pub fn avg_pool() -> Self {
        Self::AvgPool {
            pool: (2, 2),
            padding: Padding::Same,
        }
    }

    pub fn dropout(rate: f32) -> Self {
        Self::Dropout { rate }
    }

    pub fn dense(units: usize, act_fn: ActFn) -> Self {
        Self::Dense { units, act_fn }
    }

    /// Returns the name this layer is displayed with.
    pub fn kind(&self) -> &'static str {
        match self {
            LayerSpec::Conv2d { .. } => "Conv2D",
            LayerSpec::BatchNorm => "BatchNormalization",
            LayerSpec::Activation { .. } => "Activation",
            LayerSpec::AvgPool { .. } => "AveragePooling2D",
            LayerSpec::Dropout { .. } => "Dropout",
            LayerSpec::Flatten => "Flatten",
            LayerSpec::Dense { .. } => "Dense",
            LayerSpec::Residual(_) => "Residual",
        }
    }

    /// Computes the shape this layer outputs given the shape of its input.
    ///
    /// # Arguments
    /// * `index` - The position of the layer in its graph, used for error reporting.
    /// * `input` - The shape of the layer's input.
    ///
    /// # Returns
    /// The output shape or an error if the input can't be processed by this layer.
    pub fn output_shape(&self, index: usize, input: Shape) -> Result<Shape> {
        match *self {
            LayerSpec::Conv2d { filters, .. } => {
                let (height, width, _) = spatial(index, input)?;
                Ok(Shape::spatial(height, width, filters))
            }
            LayerSpec::AvgPool { pool: (ph, pw), .. } => {
                let (height, width, channels) = spatial(index, input)?;
                Ok(Shape::spatial(
                    height.div_ceil(ph),
                    width.div_ceil(pw),
                    channels,
                ))
            }
            LayerSpec::BatchNorm | LayerSpec::Activation { .. } | LayerSpec::Dropout { .. } => {
                Ok(input)
            }
            LayerSpec::Flatten => Ok(Shape::Flat(input.len())),
            LayerSpec::Dense { units, .. } => match input {
                Shape::Flat(_) => Ok(Shape::Flat(units)),
                got => Err(ArchErr::UnexpectedShape {
                    layer: index,
                    what: "flat",
                    got,
                }),
            },
            LayerSpec::Residual(ref block) => block.output_shape(index, input),
        }
    }

    /// Returns the amount of trainable parameters this layer holds given its input shape.
    pub fn trainable_params(&self, input: Shape) -> usize {
        match *self {
            LayerSpec::Conv2d {
                filters,
                kernel: (kh, kw),
                ..
            } => kh * kw * input.channels() * filters + filters,
            LayerSpec::BatchNorm => 2 * input.channels(),
            LayerSpec::Dense { units, .. } => input.len() * units + units,
            LayerSpec::Residual(ref block) => block.params(input, Self::trainable_params),
            _ => 0,
        }
    }

    /// Returns the amount of non trainable values (moving statistics) this layer holds.
    pub fn non_trainable_params(&self, input: Shape) -> usize {
        match *self {
            LayerSpec::BatchNorm => 2 * input.channels(),
            LayerSpec::Residual(ref block) => block.params(input, Self::non_trainable_params),
            _ => 0,
        }
    }
}

fn spatial(index: usize, input: Shape) -> Result<(usize, usize, usize)> {
    match input {
        Shape::Spatial {
            height,
            width,
            channels,
        } => Ok((height, width, channels)),
        got => Err(ArchErr::UnexpectedShape {
            layer: index,
            what: "spatial",
            got,
        }),
    }
}

/// A residual unit: two normalized convolutions whose output is summed with the unit's input
/// (projected by a 1x1 convolution when `shortcut` is present) before the final activation,
/// pooling and dropout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualBlockSpec {
    pub conv_a: Box<LayerSpec>,
    pub norm_a: Box<LayerSpec>,
    pub act_a: Box<LayerSpec>,
    pub conv_b: Box<LayerSpec>,
    pub norm_b: Box<LayerSpec>,
    pub shortcut: Option<Box<LayerSpec>>,
    pub act_b: Box<LayerSpec>,
    pub pool: Box<LayerSpec>,
    pub dropout: Box<LayerSpec>,
}

impl ResidualBlockSpec {
    /// The layers computing the main path, up to the residual sum.
    pub fn main_path(&self) -> [&LayerSpec; 5] {
        [
            &*self.conv_a,
            &*self.norm_a,
            &*self.act_a,
            &*self.conv_b,
            &*self.norm_b,
        ]
    }

    /// The layers applied after the residual sum.
    pub fn tail(&self) -> [&LayerSpec; 3] {
        [&*self.act_b, &*self.pool, &*self.dropout]
    }

    pub fn has_projection(&self) -> bool {
        self.shortcut.is_some()
    }

    /// Computes the shape of the residual sum and checks the shortcut matches it.
    ///
    /// # Arguments
    /// * `index` - The position of the unit in its graph.
    /// * `input` - The shape of the unit's input.
    ///
    /// # Returns
    /// The shape of the sum or `ShapeMismatch` if both operands differ.
    pub fn sum_shape(&self, index: usize, input: Shape) -> Result<Shape> {
        let mut main = input;
        for layer in self.main_path() {
            main = layer.output_shape(index, main)?;
        }

        let shortcut = match &self.shortcut {
            Some(projection) => projection.output_shape(index, input)?,
            None => input,
        };

        if main != shortcut {
            return Err(ArchErr::ShapeMismatch {
                layer: index,
                expected: main,
                got: shortcut,
            });
        }

        Ok(main)
    }

    fn output_shape(&self, index: usize, input: Shape) -> Result<Shape> {
        let mut shape = self.sum_shape(index, input)?;
        for layer in self.tail() {
            shape = layer.output_shape(index, shape)?;
        }

        Ok(shape)
    }

    /// Sums some per layer count over the unit, threading shapes through the main path.
    ///
    /// Shapes that can't be computed count as zero, the mismatch is reported by
    /// `output_shape`.
    fn params<F>(&self, input: Shape, count: F) -> usize
    where
        F: Fn(&LayerSpec, Shape) -> usize,
    {
        let mut total = 0;
        let mut shape = input;

        for layer in self.main_path() {
            total += count(layer, shape);
            match layer.output_shape(0, shape) {
                Ok(next) => shape = next,
                Err(_) => return total,
            }
        }

        if let Some(projection) = &self.shortcut {
            total += count(&**projection, input);
        }

        for layer in self.tail() {
            total += count(layer, shape);
            match layer.output_shape(0, shape) {
                Ok(next) => shape = next,
                Err(_) => return total,
            }
        }

        total
    }
}
