use log::debug;

use crate::{
    GraphBuilder, LayerGraph, ModelConfig, Result,
    blocks::{classification_head, plain_block},
};

/// The feature maps of the two plain blocks.
pub const FEATURE_MAPS: [usize; 2] = [32, 64];

/// Builds the baseline architecture: two plain blocks of 32 and 64 feature maps followed by
/// the classification head.
///
/// # Arguments
/// * `config` - The model configuration.
///
/// # Returns
/// The graph or a configuration error.
pub fn build(config: &ModelConfig) -> Result<LayerGraph> {
    config.validate()?;

    let graph = FEATURE_MAPS
        .iter()
        .fold(
            GraphBuilder::new(&config.name, config.input_shape()),
            |builder, &filters| builder.extend(plain_block(filters, config.activation)),
        )
        .extend(classification_head(config.num_classes))
        .finish();

    debug!(layers = graph.len(); "built base architecture");
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ActFn, ArchErr, LayerSpec};

    #[test]
    fn convolutions_carry_the_configured_activation() {
        let config = ModelConfig {
            activation: ActFn::Elu,
            ..Default::default()
        };

        let graph = build(&config).unwrap();
        for layer in &graph.layers()[..6] {
            if let LayerSpec::Conv2d { act_fn, .. } = layer {
                assert_eq!(*act_fn, Some(ActFn::Elu));
            }
        }
    }

    #[test]
    fn zero_depth_is_rejected() {
        let config = ModelConfig {
            depth: 0,
            ..Default::default()
        };

        assert!(matches!(
            build(&config),
            Err(ArchErr::InvalidDimension { what: "input depth", .. })
        ));
    }
}
