#![cfg(test)]

use std::num::NonZeroUsize;

use architecture::{
    ActFn, Architecture, BlockConfig, GraphBuilder, LayerGraph, LayerSpec, ModelConfig, Shape,
    blocks::residual_unit,
};
use ndarray::{ArrayD, Axis, IxDyn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    MlErr,
    arch::{
        Mode, Sequential, compile,
        layers::{Activation, AvgPool, BatchNorm, Conv2d, Dense, Flatten, Layer, Residual},
    },
    dataset::Dataset,
    training::{Classifier, one_hot},
};

fn random_input<R: Rng>(shape: &[usize], rng: &mut R) -> ArrayD<f32> {
    ArrayD::from_shape_fn(IxDyn(shape), |_| rng.random_range(-1.0..1.0))
}

fn weighted_output(
    model: &mut Sequential,
    params: &[f32],
    state: &mut [f32],
    x: &ArrayD<f32>,
    w: &ArrayD<f32>,
) -> f32 {
    let y = model.forward(params, state, x.clone(), Mode::Train).unwrap();
    (y * w).sum()
}

/// Compares the back propagated gradient of `sum(model(x) * w)` against central differences,
/// for a random `w`.
fn check_gradient(mut model: Sequential, input: &[usize], seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut params = vec![0.; model.size()];
    let mut state = vec![0.; model.state_size()];
    model.init(&mut params, &mut state, &mut rng).unwrap();

    let x = random_input(input, &mut rng);
    let y = model
        .forward(&params, &mut state, x.clone(), Mode::Train)
        .unwrap();
    let w = random_input(y.shape(), &mut rng);

    let mut grad = vec![0.; params.len()];
    model.backward(&params, &mut grad, w.clone()).unwrap();

    let h = 1e-2;
    for i in 0..params.len() {
        let original = params[i];

        params[i] = original + h;
        let plus = weighted_output(&mut model, &params, &mut state, &x, &w);
        params[i] = original - h;
        let minus = weighted_output(&mut model, &params, &mut state, &x, &w);
        params[i] = original;

        let numeric = (plus - minus) / (2. * h);
        assert!(
            (numeric - grad[i]).abs() <= 1e-2 + 5e-2 * grad[i].abs(),
            "parameter {i}: numeric {numeric}, back propagated {}",
            grad[i]
        );
    }
}

#[test]
fn dense_gradient() {
    let model = Sequential::new([
        Layer::Dense(Dense::new((5, 4), ActFn::Sigmoid)),
        Layer::Dense(Dense::new((4, 3), ActFn::Softmax)),
    ]);

    check_gradient(model, &[3, 5], 1);
}

#[test]
fn conv_batch_norm_pool_gradient() {
    let model = Sequential::new([
        Layer::Conv2d(Conv2d::new((3, 3), 2, 3, Some(ActFn::Tanh))),
        Layer::BatchNorm(BatchNorm::new(3)),
        Layer::AvgPool(AvgPool::new((2, 2))),
        Layer::Flatten(Flatten::new()),
        Layer::Dense(Dense::new((12, 3), ActFn::Softmax)),
    ]);

    check_gradient(model, &[2, 4, 4, 2], 2);
}

#[test]
fn identity_residual_gradient() {
    let unit = Residual::new(
        1,
        vec![
            Layer::Conv2d(Conv2d::new((3, 3), 2, 2, None)),
            Layer::BatchNorm(BatchNorm::new(2)),
            Layer::Activation(Activation::new(ActFn::Tanh)),
            Layer::Conv2d(Conv2d::new((3, 3), 2, 2, None)),
            Layer::BatchNorm(BatchNorm::new(2)),
        ],
        None,
        vec![Layer::Activation(Activation::new(ActFn::Tanh))],
    );
    let model = Sequential::new([
        Layer::Conv2d(Conv2d::new((3, 3), 2, 2, Some(ActFn::Tanh))),
        Layer::Residual(unit),
        Layer::Flatten(Flatten::new()),
        Layer::Dense(Dense::new((32, 2), ActFn::Softmax)),
    ]);

    check_gradient(model, &[2, 4, 4, 2], 3);
}

#[test]
fn projected_residual_gradient() {
    let unit = Residual::new(
        0,
        vec![Layer::Conv2d(Conv2d::new((3, 3), 2, 4, Some(ActFn::Sigmoid)))],
        Some(Layer::Conv2d(Conv2d::new((1, 1), 2, 4, None))),
        vec![Layer::AvgPool(AvgPool::new((2, 2)))],
    );
    let model = Sequential::new([
        Layer::Residual(unit),
        Layer::Flatten(Flatten::new()),
        Layer::Dense(Dense::new((16, 2), ActFn::Softmax)),
    ]);

    check_gradient(model, &[2, 4, 4, 2], 4);
}

fn small_config() -> ModelConfig {
    ModelConfig {
        input_width: 8,
        input_height: 8,
        num_classes: 3,
        ..Default::default()
    }
}

fn small_architectures() -> [Architecture; 3] {
    let blocks = BlockConfig {
        num_blocks: 2,
        feature_maps: 4,
        ..Default::default()
    };

    [
        Architecture::Base,
        Architecture::Normalized(blocks),
        Architecture::Residual(blocks),
    ]
}

#[test]
fn compiled_models_match_their_parameter_counts() {
    let config = small_config();

    for architecture in small_architectures() {
        let graph = architecture.build(&config).unwrap();
        let model = compile(&graph, 0).unwrap();
        let (trainable, frozen) = graph.param_counts().unwrap();

        assert_eq!(model.size(), trainable, "{architecture:?}");
        assert_eq!(model.state_size(), frozen, "{architecture:?}");
        assert_eq!(model.layers().len(), graph.len());
    }
}

#[test]
fn every_architecture_predicts_probabilities() {
    let config = small_config();
    let mut rng = StdRng::seed_from_u64(5);
    let x = random_input(&[4, 8, 8, 3], &mut rng) * 255.;

    for architecture in small_architectures() {
        let graph = architecture.build(&config).unwrap();
        let mut classifier = Classifier::new(config.clone(), graph, 11).unwrap();

        let y = classifier.predict(x.clone()).unwrap();

        assert_eq!(y.dim(), (4, 3));
        for row in y.axis_iter(Axis(0)) {
            assert!((row.sum() - 1.).abs() < 1e-4, "{architecture:?}: {row}");
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }
}

#[test]
fn empty_batches_predict_no_rows() {
    let config = small_config();

    for architecture in small_architectures() {
        let graph = architecture.build(&config).unwrap();
        let mut classifier = Classifier::new(config.clone(), graph, 11).unwrap();

        let y = classifier
            .predict(ArrayD::zeros(IxDyn(&[0, 8, 8, 3])))
            .unwrap();

        assert_eq!(y.dim(), (0, 3), "{architecture:?}");
    }
}

#[test]
fn mismatched_identity_shortcut_fails_when_run() {
    let graph: LayerGraph = GraphBuilder::new("broken", Shape::spatial(8, 8, 3))
        .push(LayerSpec::Residual(residual_unit(8, ActFn::Relu, 0.0, false)))
        .push(LayerSpec::Flatten)
        .push(LayerSpec::dense(2, ActFn::Softmax))
        .finish();

    let mut model = compile(&graph, 0).unwrap();
    let params = vec![0.; model.size()];
    let mut state = vec![0.; model.state_size()];

    let err = model
        .forward(&params, &mut state, ArrayD::zeros(IxDyn(&[1, 8, 8, 3])), Mode::Infer)
        .unwrap_err();

    assert!(matches!(
        err,
        MlErr::ShapeMismatch { layer: 0, ref expected, ref got }
            if expected == &[1, 8, 8, 8] && got == &[1, 8, 8, 3]
    ));
}

#[test]
fn training_separates_bright_from_dark_images() {
    let mut rng = StdRng::seed_from_u64(7);
    let labels: Vec<usize> = (0..32).map(|i| i % 2).collect();
    let x = ArrayD::from_shape_fn(IxDyn(&[32, 4, 4, 1]), |idx| {
        let base = if labels[idx[0]] == 1 { 0.8 } else { -0.8 };
        base + rng.random_range(-0.2..0.2)
    });
    let data = Dataset::new(x, one_hot(&labels, 2).unwrap()).unwrap();

    let config = ModelConfig {
        name: "toy".to_string(),
        input_width: 4,
        input_height: 4,
        depth: 1,
        num_classes: 2,
        activation: ActFn::Tanh,
        learning_rate: 1e-2,
        batch_size: NonZeroUsize::new(8).unwrap(),
        verbose: false,
        ..Default::default()
    };
    let blocks = BlockConfig {
        num_blocks: 1,
        feature_maps: 2,
        batch_norm: false,
        drop_rate: 0.0,
        ..Default::default()
    };
    let graph = Architecture::Normalized(blocks).build(&config).unwrap();
    let mut classifier = Classifier::new(config, graph, 3).unwrap();

    let before = classifier.evaluate(data.x(), data.y()).unwrap();
    let history = classifier
        .fit(&data, None, NonZeroUsize::new(30))
        .unwrap();
    let after = classifier.evaluate(data.x(), data.y()).unwrap();

    assert_eq!(history.epochs(), 30);
    assert!(after.loss < before.loss, "{before} -> {after}");
    assert!(after.accuracy >= 0.9, "{after}");
}
