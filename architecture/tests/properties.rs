use architecture::{
    ActFn, ArchErr, BlockConfig, LayerSpec, ModelConfig, OptimizerKind, OptimizerSpec, Shape,
    builders::{base, normalized, residual},
    optimizer,
};

fn config() -> ModelConfig {
    ModelConfig {
        input_width: 64,
        input_height: 64,
        depth: 3,
        num_classes: 4,
        ..Default::default()
    }
}

fn blocks(num_blocks: usize, feature_maps: usize, batch_norm: bool) -> BlockConfig {
    BlockConfig {
        num_blocks,
        feature_maps,
        batch_norm,
        drop_rate: 0.25,
        residuals_per_group: 1,
    }
}

#[test]
fn base_graph_layout_and_shapes() {
    let graph = base::build(&config()).unwrap();

    assert_eq!(
        graph.kinds(),
        [
            "Conv2D",
            "Conv2D",
            "AveragePooling2D",
            "Conv2D",
            "Conv2D",
            "AveragePooling2D",
            "Flatten",
            "Dense",
        ]
    );
    assert_eq!(graph.conv_filters(), [32, 32, 64, 64]);
    assert_eq!(
        graph.output_shapes().unwrap(),
        [
            Shape::spatial(64, 64, 32),
            Shape::spatial(64, 64, 32),
            Shape::spatial(32, 32, 32),
            Shape::spatial(32, 32, 64),
            Shape::spatial(32, 32, 64),
            Shape::spatial(16, 16, 64),
            Shape::Flat(16 * 16 * 64),
            Shape::Flat(4),
        ]
    );
}

#[test]
fn normalized_schedule_doubles_for_every_block_count() {
    for n in 1..=6 {
        for f in [1, 3, 16, 32] {
            let graph = normalized::build(&config(), &blocks(n, f, true)).unwrap();
            let expected: Vec<_> = (0..n).flat_map(|i| [f << i, f << i]).collect();
            assert_eq!(graph.conv_filters(), expected, "n = {n}, f = {f}");
        }
    }
}

#[test]
fn disabling_batch_norm_only_removes_normalization_layers() {
    for n in 1..=4 {
        let with = normalized::build(&config(), &blocks(n, 8, true)).unwrap();
        let without = normalized::build(&config(), &blocks(n, 8, false)).unwrap();

        let stripped: Vec<_> = with
            .layers()
            .iter()
            .filter(|layer| **layer != LayerSpec::BatchNorm)
            .cloned()
            .collect();

        assert_eq!(stripped, without.layers());
        assert_eq!(with.len() - without.len(), 2 * n);
    }
}

#[test]
fn residual_projection_only_opens_non_first_groups() {
    for n in 2..=5 {
        let graph = residual::build(&config(), &blocks(n, 8, true)).unwrap();
        let units: Vec<_> = graph
            .layers()
            .iter()
            .filter_map(|layer| match layer {
                LayerSpec::Residual(block) => Some(block),
                _ => None,
            })
            .collect();

        assert_eq!(units.len(), n);
        for (i, unit) in units.iter().enumerate() {
            assert_eq!(unit.has_projection(), i > 0, "group {i} of {n}");
            if let Some(projection) = &unit.shortcut {
                assert_eq!(**projection, LayerSpec::projection(8 << i));
            }
        }

        graph.output_shapes().unwrap();
    }
}

#[test]
fn head_is_softmax_regardless_of_activation() {
    for activation in [ActFn::Relu, ActFn::Tanh, ActFn::Sigmoid, ActFn::Elu, ActFn::Linear] {
        let config = ModelConfig {
            activation,
            ..config()
        };

        let graphs = [
            base::build(&config).unwrap(),
            normalized::build(&config, &blocks(2, 8, true)).unwrap(),
            residual::build(&config, &blocks(2, 8, true)).unwrap(),
        ];

        for graph in graphs {
            assert_eq!(
                graph.layers().last(),
                Some(&LayerSpec::dense(4, ActFn::Softmax))
            );
        }
    }
}

#[test]
fn optimizer_selection_keeps_the_learning_rate() {
    for name in ["adam", "nadam", "adagrad", "rmsprop", "adadelta", "sgd-momentum"] {
        let spec = optimizer::select(name, 3e-4);
        assert_eq!(spec.learning_rate(), 3e-4);
        assert_eq!(spec.kind(), name.parse::<OptimizerKind>().unwrap());
    }

    assert_eq!(
        optimizer::select("foo", 3e-4),
        OptimizerSpec::SgdMomentum {
            learning_rate: 3e-4,
            momentum: 0.9,
        }
    );
}

#[test]
fn construction_is_deterministic() {
    let blocks = blocks(3, 16, true);

    assert_eq!(base::build(&config()).unwrap(), base::build(&config()).unwrap());
    assert_eq!(
        normalized::build(&config(), &blocks).unwrap(),
        normalized::build(&config(), &blocks).unwrap()
    );
    assert_eq!(
        residual::build(&config(), &blocks).unwrap(),
        residual::build(&config(), &blocks).unwrap()
    );
}

#[test]
fn invalid_configs_abort_every_builder() {
    let bad_model = ModelConfig {
        input_width: 0,
        ..config()
    };
    let bad_blocks = BlockConfig {
        drop_rate: 1.0,
        ..blocks(2, 8, true)
    };

    assert!(matches!(base::build(&bad_model), Err(ArchErr::InvalidDimension { .. })));
    assert!(matches!(
        normalized::build(&config(), &bad_blocks),
        Err(ArchErr::InvalidDropRate { .. })
    ));
    assert!(matches!(
        residual::build(&config(), &bad_blocks),
        Err(ArchErr::InvalidDropRate { .. })
    ));
}

#[test]
fn mismatched_identity_shortcut_is_only_caught_by_shape_inference() {
    use architecture::{GraphBuilder, blocks::residual_unit};

    // an identity shortcut over 3 input channels can't be added to 8 output channels
    let graph = GraphBuilder::new("mismatch", Shape::spatial(8, 8, 3))
        .push(LayerSpec::Residual(residual_unit(8, ActFn::Relu, 0.0, false)))
        .finish();

    let err = graph.output_shapes().unwrap_err();
    assert!(matches!(
        err,
        ArchErr::ShapeMismatch {
            layer: 0,
            expected: Shape::Spatial { channels: 8, .. },
            got: Shape::Spatial { channels: 3, .. },
        }
    ));
}
