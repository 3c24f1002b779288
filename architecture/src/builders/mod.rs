//! The three builders of the model family. Each one is a pure function from its configuration
//! to a `LayerGraph`.

pub mod base;
pub mod normalized;
pub mod residual;

use crate::{Architecture, LayerGraph, ModelConfig, Result};

impl Architecture {
    /// Builds the graph of this architecture.
    ///
    /// # Arguments
    /// * `config` - The model configuration.
    ///
    /// # Returns
    /// The graph or a configuration error.
    pub fn build(&self, config: &ModelConfig) -> Result<LayerGraph> {
        match self {
            Architecture::Base => base::build(config),
            Architecture::Normalized(blocks) => normalized::build(config, blocks),
            Architecture::Residual(blocks) => residual::build(config, blocks),
        }
    }
}
