#![cfg(test)]

use crate::{
    Architecture, BlockConfig, ExperimentConfig, LayerGraph, ModelConfig, Shape,
    builders::{base, residual},
};

#[test]
fn base_param_counts_match_the_layer_formulas() {
    let graph = base::build(&ModelConfig::default()).unwrap();
    let (trainable, frozen) = graph.param_counts().unwrap();

    let expected = (3 * 3 * 3 * 32 + 32)
        + (3 * 3 * 32 * 32 + 32)
        + (3 * 3 * 32 * 64 + 64)
        + (3 * 3 * 64 * 64 + 64)
        + (16 * 16 * 64 * 4 + 4);

    assert_eq!(trainable, expected);
    assert_eq!(trainable, 131_108);
    assert_eq!(frozen, 0);
}

#[test]
fn residual_counts_moving_statistics_as_frozen() {
    let blocks = BlockConfig {
        num_blocks: 1,
        feature_maps: 8,
        ..Default::default()
    };
    let config = ModelConfig {
        input_width: 4,
        input_height: 4,
        num_classes: 2,
        ..Default::default()
    };

    let graph = residual::build(&config, &blocks).unwrap();
    let (_, frozen) = graph.param_counts().unwrap();

    // stem + two per residual unit, mean and variance per channel
    assert_eq!(frozen, 3 * 2 * 8);
}

#[test]
fn summary_lists_every_layer() {
    let graph = base::build(&ModelConfig::default()).unwrap();
    let summary = graph.summary().unwrap();

    assert!(summary.starts_with("Model: \"Base Model\""));
    assert!(summary.contains("conv2d_0 (Conv2D)"));
    assert!(summary.contains("dense_7 (Dense)"));
    assert!(summary.contains("(16, 16, 64)"));
    assert!(summary.contains("Total params: 131108"));
    assert!(summary.ends_with("Non-trainable params: 0\n"));
    assert_eq!(summary.lines().count(), 8 + graph.len());
}

#[test]
fn graphs_roundtrip_through_json() {
    let config = ExperimentConfig {
        model: ModelConfig::default(),
        architecture: Architecture::Residual(BlockConfig::default()),
    };

    let graph = config.architecture.build(&config.model).unwrap();
    let json = serde_json::to_string(&graph).unwrap();
    let restored: LayerGraph = serde_json::from_str(&json).unwrap();

    assert_eq!(graph, restored);
    assert_eq!(restored.input_shape(), Shape::spatial(64, 64, 3));
}
