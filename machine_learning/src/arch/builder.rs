use architecture::{LayerGraph, LayerSpec, ResidualBlockSpec, Shape};
use log::debug;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    Sequential,
    layers::{Activation, AvgPool, BatchNorm, Conv2d, Dense, Dropout, Flatten, Layer, Residual},
};
use crate::Result;

/// Compiles a `LayerGraph` into an executable `Sequential`, inferring the input size of every
/// layer from the graph's input shape.
///
/// Residual units are compiled branch by branch, so an identity shortcut whose shape differs
/// from the main path is only reported once the model is run.
///
/// # Arguments
/// * `graph` - The graph to compile.
/// * `seed` - The seed every dropout layer derives its own generator from.
///
/// # Returns
/// The model or an error if some layer can't consume the shape it receives.
pub fn compile(graph: &LayerGraph, seed: u64) -> Result<Sequential> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut shape = graph.input_shape();

    let layers = graph
        .layers()
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let (layer, output) = compile_layer(i, spec, shape, &mut rng)?;
            shape = output;
            Ok(layer)
        })
        .collect::<Result<Vec<_>>>()?;

    let model = Sequential::new(layers);
    debug!(
        name = graph.name(),
        params = model.size(),
        state = model.state_size();
        "compiled model"
    );

    Ok(model)
}

fn compile_layer<R: Rng>(
    index: usize,
    spec: &LayerSpec,
    input: Shape,
    rng: &mut R,
) -> Result<(Layer, Shape)> {
    let layer = match *spec {
        LayerSpec::Conv2d {
            filters,
            kernel,
            act_fn,
            ..
        } => Layer::Conv2d(Conv2d::new(kernel, input.channels(), filters, act_fn)),
        LayerSpec::BatchNorm => Layer::BatchNorm(BatchNorm::new(input.channels())),
        LayerSpec::Activation { act_fn } => Layer::Activation(Activation::new(act_fn)),
        LayerSpec::AvgPool { pool, .. } => Layer::AvgPool(AvgPool::new(pool)),
        LayerSpec::Dropout { rate } => Layer::Dropout(Dropout::new(rate, rng.random())),
        LayerSpec::Flatten => Layer::Flatten(Flatten::new()),
        LayerSpec::Dense { units, act_fn } => {
            Layer::Dense(Dense::new((input.len(), units), act_fn))
        }
        LayerSpec::Residual(ref block) => return compile_residual(index, block, input, rng),
    };

    let output = spec.output_shape(index, input)?;
    Ok((layer, output))
}

fn compile_chain<'a, R, I>(
    index: usize,
    specs: I,
    mut shape: Shape,
    rng: &mut R,
) -> Result<(Vec<Layer>, Shape)>
where
    R: Rng,
    I: IntoIterator<Item = &'a LayerSpec>,
{
    let mut layers = Vec::new();
    for spec in specs {
        let (layer, output) = compile_layer(index, spec, shape, rng)?;
        layers.push(layer);
        shape = output;
    }

    Ok((layers, shape))
}

fn compile_residual<R: Rng>(
    index: usize,
    block: &ResidualBlockSpec,
    input: Shape,
    rng: &mut R,
) -> Result<(Layer, Shape)> {
    let (main, main_shape) = compile_chain(index, block.main_path(), input, rng)?;
    let shortcut = block
        .shortcut
        .as_deref()
        .map(|projection| compile_layer(index, projection, input, rng))
        .transpose()?
        .map(|(layer, _)| layer);
    let (tail, output) = compile_chain(index, block.tail(), main_shape, rng)?;

    let residual = Residual::new(index, main, shortcut, tail);
    Ok((Layer::Residual(residual), output))
}
