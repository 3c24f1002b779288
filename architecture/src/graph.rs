use std::fmt::{self, Write};

use serde::{Deserialize, Serialize};

use crate::{LayerSpec, Result, Shape};

/// An ordered sequence of layers, together with the shape of the samples it consumes.
///
/// Graphs are only assembled through a `GraphBuilder` and can't be modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerGraph {
    name: String,
    input_shape: Shape,
    layers: Vec<LayerSpec>,
}

impl LayerGraph {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_shape(&self) -> Shape {
        self.input_shape
    }

    pub fn layers(&self) -> &[LayerSpec] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Returns the display names of the layers, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.layers.iter().map(LayerSpec::kind).collect()
    }

    /// Computes the output shape of every layer.
    ///
    /// This also checks that every residual sum adds operands of the same shape, a condition
    /// otherwise only detected when the graph is executed.
    ///
    /// # Returns
    /// One shape per layer or the first shape error found.
    pub fn output_shapes(&self) -> Result<Vec<Shape>> {
        let mut shape = self.input_shape;

        self.layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                shape = layer.output_shape(i, shape)?;
                Ok(shape)
            })
            .collect()
    }

    /// Returns the shape of the graph's output.
    pub fn output_shape(&self) -> Result<Shape> {
        let shapes = self.output_shapes()?;
        Ok(shapes.last().copied().unwrap_or(self.input_shape))
    }

    /// Returns the channel count of every convolution in the graph, including the main path of
    /// residual units but not their shortcut projections.
    pub fn conv_filters(&self) -> Vec<usize> {
        fn collect(layer: &LayerSpec, out: &mut Vec<usize>) {
            match layer {
                LayerSpec::Conv2d { filters, .. } => out.push(*filters),
                LayerSpec::Residual(block) => {
                    block.main_path().into_iter().for_each(|l| collect(l, out));
                }
                _ => {}
            }
        }

        let mut filters = Vec::new();
        self.layers.iter().for_each(|l| collect(l, &mut filters));
        filters
    }

    /// Returns the amount of trainable and non trainable parameters of the graph.
    pub fn param_counts(&self) -> Result<(usize, usize)> {
        let shapes = self.output_shapes()?;
        let inputs = std::iter::once(self.input_shape).chain(shapes);

        let counts = self
            .layers
            .iter()
            .zip(inputs)
            .fold((0, 0), |(trainable, frozen), (layer, input)| {
                (
                    trainable + layer.trainable_params(input),
                    frozen + layer.non_trainable_params(input),
                )
            });

        Ok(counts)
    }

    /// Renders a table with the type, output shape and parameter count of every layer.
    pub fn summary(&self) -> Result<String> {
        let shapes = self.output_shapes()?;
        let counts = self.param_counts()?;

        let mut out = String::new();
        self.write_summary(&mut out, &shapes, counts)?;
        Ok(out)
    }

    fn write_summary<W: Write>(
        &self,
        out: &mut W,
        shapes: &[Shape],
        (trainable, frozen): (usize, usize),
    ) -> fmt::Result {
        let inputs = std::iter::once(self.input_shape).chain(shapes.iter().copied());
        let rule = "=".repeat(72);

        writeln!(out, "Model: \"{}\"", self.name)?;
        writeln!(out, "{rule}")?;
        writeln!(out, "{:<32}{:<24}{:>16}", "Layer (type)", "Output Shape", "Param #")?;
        writeln!(out, "{rule}")?;

        let rows = self.layers.iter().zip(inputs).zip(shapes).enumerate();
        for (i, ((layer, input), output)) in rows {
            let params = layer.trainable_params(input) + layer.non_trainable_params(input);
            let label = format!("{}_{i} ({})", layer.kind().to_lowercase(), layer.kind());
            writeln!(out, "{label:<32}{:<24}{params:>16}", output.to_string())?;
        }

        writeln!(out, "{rule}")?;
        writeln!(out, "Total params: {}", trainable + frozen)?;
        writeln!(out, "Trainable params: {trainable}")?;
        writeln!(out, "Non-trainable params: {frozen}")
    }
}

/// Accumulates layers and hands out the finished `LayerGraph`.
#[derive(Debug)]
pub struct GraphBuilder {
    name: String,
    input_shape: Shape,
    layers: Vec<LayerSpec>,
}

impl GraphBuilder {
    /// Creates a new `GraphBuilder`.
    ///
    /// # Arguments
    /// * `name` - The name of the model.
    /// * `input_shape` - The shape of a single input sample.
    pub fn new(name: impl Into<String>, input_shape: Shape) -> Self {
        Self {
            name: name.into(),
            input_shape,
            layers: Vec::new(),
        }
    }

    /// Appends a layer.
    pub fn push(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }

    /// Appends every layer of `layers`, in order.
    pub fn extend<I>(mut self, layers: I) -> Self
    where
        I: IntoIterator<Item = LayerSpec>,
    {
        self.layers.extend(layers);
        self
    }

    pub fn finish(self) -> LayerGraph {
        LayerGraph {
            name: self.name,
            input_shape: self.input_shape,
            layers: self.layers,
        }
    }
}
