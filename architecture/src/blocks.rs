//! Pure generators for the architectural units the builders are made of.

use crate::{ActFn, ArchErr, LayerSpec, ResidualBlockSpec, Result};

/// Computes the feature maps of every block: `base * 2^i` for the i-th block.
///
/// # Arguments
/// * `base` - The feature maps of the first block.
/// * `num_blocks` - The amount of blocks.
///
/// # Returns
/// The schedule or an error if some entry doesn't fit in a `usize`.
pub fn feature_map_schedule(base: usize, num_blocks: usize) -> Result<Vec<usize>> {
    (0..num_blocks)
        .map(|i| {
            u32::try_from(i)
                .ok()
                .and_then(|exp| 2usize.checked_pow(exp))
                .and_then(|factor| base.checked_mul(factor))
                .ok_or(ArchErr::FeatureMapOverflow { base, block: i })
        })
        .collect()
}

/// Two activated convolutions followed by a pooling.
pub fn plain_block(filters: usize, act_fn: ActFn) -> Vec<LayerSpec> {
    vec![
        LayerSpec::conv(filters, Some(act_fn)),
        LayerSpec::conv(filters, Some(act_fn)),
        LayerSpec::avg_pool(),
    ]
}

/// Two convolutions, each optionally normalized and then activated, followed by a pooling and
/// a dropout.
pub fn normalized_block(
    filters: usize,
    act_fn: ActFn,
    batch_norm: bool,
    drop_rate: f32,
) -> Vec<LayerSpec> {
    let mut layers = Vec::with_capacity(8);

    for _ in 0..2 {
        layers.push(LayerSpec::conv(filters, None));
        if batch_norm {
            layers.push(LayerSpec::BatchNorm);
        }
        layers.push(LayerSpec::activation(act_fn));
    }

    layers.push(LayerSpec::avg_pool());
    layers.push(LayerSpec::dropout(drop_rate));
    layers
}

/// The convolution, normalization and activation opening the residual architecture.
pub fn stem(filters: usize, act_fn: ActFn) -> [LayerSpec; 3] {
    [
        LayerSpec::conv(filters, None),
        LayerSpec::BatchNorm,
        LayerSpec::activation(act_fn),
    ]
}

/// A single residual unit.
///
/// # Arguments
/// * `filters` - The channels of both convolutions (and of the projection if any).
/// * `act_fn` - The activation function.
/// * `drop_rate` - The rate of the closing dropout.
/// * `projection` - Whether the shortcut goes through a 1x1 convolution.
pub fn residual_unit(
    filters: usize,
    act_fn: ActFn,
    drop_rate: f32,
    projection: bool,
) -> ResidualBlockSpec {
    ResidualBlockSpec {
        conv_a: Box::new(LayerSpec::conv(filters, None)),
        norm_a: Box::new(LayerSpec::BatchNorm),
        act_a: Box::new(LayerSpec::activation(act_fn)),
        conv_b: Box::new(LayerSpec::conv(filters, None)),
        norm_b: Box::new(LayerSpec::BatchNorm),
        shortcut: projection.then(|| Box::new(LayerSpec::projection(filters))),
        act_b: Box::new(LayerSpec::activation(act_fn)),
        pool: Box::new(LayerSpec::avg_pool()),
        dropout: Box::new(LayerSpec::dropout(drop_rate)),
    }
}

/// Whether a residual unit projects its shortcut: only the first unit of a group does, and
/// never in the first group.
pub fn use_skip_projection(unit: usize, first_block: bool) -> bool {
    unit == 0 && !first_block
}

/// The residual units of one block-group.
///
/// # Arguments
/// * `filters` - The feature maps of the group.
/// * `units` - The amount of residual units in the group.
/// * `first_block` - Whether this is the first group of the architecture.
/// * `act_fn` - The activation function.
/// * `drop_rate` - The dropout rate of every unit.
pub fn residual_group(
    filters: usize,
    units: usize,
    first_block: bool,
    act_fn: ActFn,
    drop_rate: f32,
) -> Vec<LayerSpec> {
    (0..units)
        .map(|unit| {
            let projection = use_skip_projection(unit, first_block);
            LayerSpec::Residual(residual_unit(filters, act_fn, drop_rate, projection))
        })
        .collect()
}

/// Flattens the features and maps them to class probabilities.
pub fn classification_head(num_classes: usize) -> [LayerSpec; 2] {
    [
        LayerSpec::Flatten,
        LayerSpec::dense(num_classes, ActFn::Softmax),
    ]
}
