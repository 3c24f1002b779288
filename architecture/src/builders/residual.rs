use log::debug;

use crate::{
    BlockConfig, GraphBuilder, LayerGraph, ModelConfig, Result,
    blocks::{classification_head, feature_map_schedule, residual_group, stem},
};

/// Builds the residual architecture: a normalized stem, one block-group of residual units per
/// block with doubling feature maps, and the classification head.
///
/// The stem always uses batch normalization and so do the residual units, `blocks.batch_norm`
/// is ignored. Whether each identity shortcut matches its main path is not checked here, see
/// `LayerGraph::output_shapes`.
///
/// # Arguments
/// * `config` - The model configuration.
/// * `blocks` - The block configuration.
///
/// # Returns
/// The graph or a configuration error.
pub fn build(config: &ModelConfig, blocks: &BlockConfig) -> Result<LayerGraph> {
    config.validate()?;
    blocks.validate()?;

    let schedule = feature_map_schedule(blocks.feature_maps, blocks.num_blocks)?;
    let builder = GraphBuilder::new(&config.name, config.input_shape())
        .extend(stem(blocks.feature_maps, config.activation));

    let graph = schedule
        .iter()
        .enumerate()
        .fold(builder, |builder, (i, &filters)| {
            builder.extend(residual_group(
                filters,
                blocks.residuals_per_group,
                i == 0,
                config.activation,
                blocks.drop_rate,
            ))
        })
        .extend(classification_head(config.num_classes))
        .finish();

    debug!(layers = graph.len(), blocks = blocks.num_blocks; "built residual architecture");
    Ok(graph)
}
