use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

/// The loss and accuracy of a model over some dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: f32,
}

impl Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "loss: {}\naccuracy: {}", self.loss, self.accuracy)
    }
}

/// The per epoch metrics of a `fit` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub loss: Vec<f32>,
    pub accuracy: Vec<f32>,
    /// Empty when no validation data was given.
    pub val_loss: Vec<f32>,
    pub val_accuracy: Vec<f32>,
}

impl History {
    pub fn epochs(&self) -> usize {
        self.loss.len()
    }

    pub(super) fn push(&mut self, train: Evaluation, validation: Option<Evaluation>) {
        self.loss.push(train.loss);
        self.accuracy.push(train.accuracy);

        if let Some(validation) = validation {
            self.val_loss.push(validation.loss);
            self.val_accuracy.push(validation.accuracy);
        }
    }
}
