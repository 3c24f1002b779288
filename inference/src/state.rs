use std::{fs, path::Path};

use log::{info, warn};
use machine_learning::training::{Classifier, argmax};
use parking_lot::Mutex;

use crate::{Result, ServiceErr, config::ServiceConfig, preprocess};

/// The answer to a prediction request.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub name: String,
    /// The sharpened image at its original size, as a base64 PNG.
    pub sharpened_png: String,
}

/// The process wide state shared by every handler.
///
/// The classifier sits behind a lock because its forward pass mutates the layer caches.
pub struct AppState {
    classifier: Mutex<Classifier>,
    names: Vec<String>,
    input: (usize, usize, usize),
}

impl AppState {
    /// Creates a new `AppState`.
    ///
    /// # Arguments
    /// * `classifier` - The model to predict with.
    /// * `names` - The label of every class, indexed by class.
    pub fn new(classifier: Classifier, names: Vec<String>) -> Self {
        let config = classifier.config();
        let input = (config.input_width, config.input_height, config.depth);

        Self {
            classifier: Mutex::new(classifier),
            names,
            input,
        }
    }

    /// Loads the checkpoint and the names file pointed to by `config`.
    pub fn load(config: &ServiceConfig) -> Result<Self> {
        let classifier = Classifier::load(&config.checkpoint_dir)?;
        let names = read_names(&config.names_path)?;

        if names.len() < classifier.config().num_classes {
            warn!(
                names = names.len(), classes = classifier.config().num_classes;
                "some classes have no name"
            );
        }

        info!(
            model = classifier.graph().name(), classes = names.len();
            "loaded inference state"
        );
        Ok(Self::new(classifier, names))
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Sharpens the base64 encoded image in `payload`, classifies it and names the most likely
    /// class.
    ///
    /// This blocks on the model, run it off the async workers.
    pub fn predict(&self, payload: &str) -> Result<Prediction> {
        let image = preprocess::decode(payload)?;
        let sharpened = preprocess::sharpen(&image);

        let (width, height, depth) = self.input;
        let input = preprocess::to_input(&sharpened, width, height, depth)?;

        let probabilities = self.classifier.lock().predict(input)?;
        let index = probabilities
            .rows()
            .into_iter()
            .next()
            .map(argmax)
            .unwrap_or_default();

        let name = self
            .names
            .get(index)
            .cloned()
            .ok_or(ServiceErr::UnknownClass {
                index,
                names: self.names.len(),
            })?;

        Ok(Prediction {
            name,
            sharpened_png: preprocess::encode_png(&sharpened)?,
        })
    }
}

/// Reads a label file: one name per line, the line index being the class index.
pub fn read_names<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(parse_names(&content))
}

fn parse_names(content: &str) -> Vec<String> {
    content.lines().map(|name| name.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_keep_their_line_index() {
        let names = parse_names("Ada Lovelace\r\n\nGrace Hopper  \n");
        assert_eq!(names, ["Ada Lovelace", "", "Grace Hopper"]);
    }
}
