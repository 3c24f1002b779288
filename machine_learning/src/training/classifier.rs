use std::{num::NonZeroUsize, path::Path};

use architecture::{LayerGraph, ModelConfig};
use log::{Level, debug, info, log};
use ndarray::{Array2, ArrayD, ArrayView2, Axis, Ix2};
use rand::{SeedableRng, rngs::StdRng};

use super::{Evaluation, History, count_correct};
use crate::{
    MlErr, Result,
    arch::{
        Mode, Sequential, compile,
        loss::{CategoricalCrossEntropy, LossFn},
    },
    checkpoint,
    dataset::Dataset,
    optimization::{self, Optimizer},
};

/// A compiled model together with its parameters, ready to be trained, evaluated and used
/// for predictions.
///
/// The loss is always categorical cross-entropy, so labels must be one-hot encoded.
pub struct Classifier {
    config: ModelConfig,
    graph: LayerGraph,
    model: Sequential,
    params: Vec<f32>,
    grad: Vec<f32>,
    state: Vec<f32>,
    optimizer: Box<dyn Optimizer + Send>,
    loss_fn: CategoricalCrossEntropy,
    rng: StdRng,
}

impl Classifier {
    /// Creates a new `Classifier`, compiling `graph` and initializing its weights.
    ///
    /// # Arguments
    /// * `config` - The model configuration, its optimizer and learning rate are used for
    ///   training.
    /// * `graph` - The graph to compile.
    /// * `seed` - The seed for weight initialization, dropout and shuffling.
    ///
    /// # Returns
    /// The classifier or an error if the configuration is invalid or the graph can't be
    /// compiled.
    pub fn new(config: ModelConfig, graph: LayerGraph, seed: u64) -> Result<Self> {
        config.validate()?;

        let model = compile(&graph, seed)?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut params = vec![0.; model.size()];
        let mut state = vec![0.; model.state_size()];
        model.init(&mut params, &mut state, &mut rng)?;

        let optimizer = optimization::build(&config.optimizer_spec(), params.len());

        Ok(Self {
            grad: vec![0.; params.len()],
            config,
            graph,
            model,
            params,
            state,
            optimizer,
            loss_fn: CategoricalCrossEntropy::new(),
            rng,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn graph(&self) -> &LayerGraph {
        &self.graph
    }

    pub fn params(&self) -> &[f32] {
        &self.params
    }

    pub fn state(&self) -> &[f32] {
        &self.state
    }

    /// Renders the layer table of the model.
    pub fn summary(&self) -> Result<String> {
        Ok(self.graph.summary()?)
    }

    /// Trains the model.
    ///
    /// # Arguments
    /// * `train` - The training data, shuffled and split in batches of `batch_size` on
    ///   every epoch.
    /// * `validation` - Data evaluated at the end of every epoch.
    /// * `epochs` - Overrides the configured amount of epochs.
    ///
    /// # Returns
    /// The per epoch metrics.
    pub fn fit(
        &mut self,
        train: &Dataset,
        validation: Option<&Dataset>,
        epochs: Option<NonZeroUsize>,
    ) -> Result<History> {
        let epochs = epochs.unwrap_or(self.config.epochs).get();
        let batch_size = self.config.batch_size;
        let level = if self.config.verbose {
            Level::Info
        } else {
            Level::Debug
        };

        let mut history = History::default();
        for epoch in 1..=epochs {
            let mut total_loss = 0.;
            let mut correct = 0;

            for (x, y) in train.shuffled_batches(batch_size, &mut self.rng) {
                let (loss, batch_correct) = self.train_step(x, &y)?;
                total_loss += loss * y.nrows() as f32;
                correct += batch_correct;
            }

            let metrics = Evaluation {
                loss: total_loss / train.len() as f32,
                accuracy: correct as f32 / train.len() as f32,
            };

            let val_metrics = validation
                .map(|data| self.evaluate(data.x(), data.y()))
                .transpose()?;

            match val_metrics {
                Some(val) => log!(
                    level,
                    epoch = epoch,
                    epochs = epochs,
                    loss = metrics.loss,
                    accuracy = metrics.accuracy,
                    val_loss = val.loss,
                    val_accuracy = val.accuracy;
                    "finished epoch"
                ),
                None => log!(
                    level,
                    epoch = epoch,
                    epochs = epochs,
                    loss = metrics.loss,
                    accuracy = metrics.accuracy;
                    "finished epoch"
                ),
            }

            history.push(metrics, val_metrics);
        }

        Ok(history)
    }

    /// Runs a training pass over a single batch and updates the parameters.
    ///
    /// # Returns
    /// The batch loss and the amount of correctly classified samples.
    fn train_step(&mut self, x: ArrayD<f32>, y: &Array2<f32>) -> Result<(f32, usize)> {
        let y_pred = self
            .model
            .forward(&self.params, &mut self.state, x, Mode::Train)?
            .into_dimensionality::<Ix2>()?;
        check_labels(y_pred.view(), y.view())?;

        let loss = self.loss_fn.loss(y_pred.view(), y.view());
        let correct = count_correct(y_pred.view(), y.view());
        let d = self.loss_fn.loss_prime(y_pred.view(), y.view());

        self.model
            .backward(&self.params, &mut self.grad, d.into_dyn())?;
        self.optimizer.update_params(&self.grad, &mut self.params)?;

        Ok((loss, correct))
    }

    /// Computes the loss and accuracy of the model over some data, in batches of
    /// `batch_size`.
    ///
    /// # Arguments
    /// * `x` - The inputs, with the samples along the first axis.
    /// * `y` - The one-hot labels.
    pub fn evaluate(&mut self, x: &ArrayD<f32>, y: &Array2<f32>) -> Result<Evaluation> {
        let len = y.nrows();
        if len == 0 {
            return Err(MlErr::EmptyDataset);
        }

        let batch_size = self.config.batch_size.get();
        let mut total_loss = 0.;
        let mut correct = 0;

        for (x, y) in x
            .axis_chunks_iter(Axis(0), batch_size)
            .zip(y.axis_chunks_iter(Axis(0), batch_size))
        {
            let y_pred = self.predict(x.to_owned())?;
            check_labels(y_pred.view(), y)?;

            total_loss += self.loss_fn.loss(y_pred.view(), y) * y.nrows() as f32;
            correct += count_correct(y_pred.view(), y);
        }

        Ok(Evaluation {
            loss: total_loss / len as f32,
            accuracy: correct as f32 / len as f32,
        })
    }

    /// Evaluates the model and renders the result as `"loss: <v>\naccuracy: <v>"`, which is
    /// also logged.
    pub fn compute_accuracy(&mut self, x: &ArrayD<f32>, y: &Array2<f32>) -> Result<String> {
        let summary = self.evaluate(x, y)?.to_string();
        info!("{summary}");
        Ok(summary)
    }

    /// Computes the class probabilities of a batch of samples.
    ///
    /// # Arguments
    /// * `x` - The inputs, with the samples along the first axis.
    ///
    /// # Returns
    /// One row of `num_classes` probabilities per sample.
    pub fn predict(&mut self, x: ArrayD<f32>) -> Result<Array2<f32>> {
        let y_pred = self
            .model
            .forward(&self.params, &mut self.state, x, Mode::Infer)?
            .into_dimensionality::<Ix2>()?;

        Ok(y_pred)
    }

    /// Writes a checkpoint of this classifier into `dir`, creating it if needed.
    pub fn save<P: AsRef<Path>>(&self, dir: P) -> Result<()> {
        checkpoint::save(dir, &self.config, &self.graph, &self.params, &self.state)
    }

    /// Loads a classifier from a checkpoint written by `save`.
    ///
    /// # Returns
    /// The classifier or an error if the checkpoint is missing, malformed, or its weights
    /// don't fit its graph.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let checkpoint = checkpoint::load(dir)?;
        let mut classifier = Self::new(checkpoint.config, checkpoint.graph, 0)?;

        for (what, got, expected) in [
            ("checkpoint parameters", checkpoint.params.len(), classifier.params.len()),
            ("checkpoint state", checkpoint.state.len(), classifier.state.len()),
        ] {
            if got != expected {
                return Err(MlErr::SizeMismatch {
                    what,
                    got,
                    expected,
                });
            }
        }

        classifier.params = checkpoint.params;
        classifier.state = checkpoint.state;
        debug!(name = classifier.graph.name(); "loaded classifier");
        Ok(classifier)
    }
}

fn check_labels(y_pred: ArrayView2<f32>, y: ArrayView2<f32>) -> Result<()> {
    if y_pred.dim() != y.dim() {
        return Err(MlErr::SizeMismatch {
            what: "labels",
            got: y.len(),
            expected: y_pred.len(),
        });
    }

    Ok(())
}
