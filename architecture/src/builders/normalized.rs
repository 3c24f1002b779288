use log::debug;

use crate::{
    BlockConfig, GraphBuilder, LayerGraph, ModelConfig, Result,
    blocks::{classification_head, feature_map_schedule, normalized_block},
};

/// Builds the normalized architecture: `num_blocks` blocks of two (optionally batch
/// normalized) convolutions with pooling and dropout, doubling the feature maps on each
/// block, followed by the classification head.
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

    let graph = schedule
        .iter()
        .fold(
            GraphBuilder::new(&config.name, config.input_shape()),
            |builder, &filters| {
                builder.extend(normalized_block(
                    filters,
                    config.activation,
                    blocks.batch_norm,
                    blocks.drop_rate,
                ))
            },
        )
        .extend(classification_head(config.num_classes))
        .finish();

    debug!(layers = graph.len(), blocks = blocks.num_blocks; "built normalized architecture");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArchErr;

    #[test]
    fn block_count_must_be_positive() {
        let blocks = BlockConfig {
            num_blocks: 0,
            ..Default::default()
        };

        let err = build(&ModelConfig::default(), &blocks).unwrap_err();
        assert!(err.is_config_error());
        assert!(matches!(err, ArchErr::InvalidBlockCount { got: 0, .. }));
    }

    #[test]
    fn layer_count_follows_the_blocks() {
        let blocks = BlockConfig {
            num_blocks: 2,
            ..Default::default()
        };

        let graph = build(&ModelConfig::default(), &blocks).unwrap();
        assert_eq!(graph.len(), 2 * 8 + 2);
    }
}
