use std::{fs, num::NonZeroUsize, path::Path};

use serde::{Deserialize, Serialize};

use crate::{
    ActFn, ArchErr, Result, Shape,
    optimizer::{OptimizerKind, OptimizerSpec},
};

const DEFAULT_BATCH_SIZE: NonZeroUsize = NonZeroUsize::new(32).unwrap();
const DEFAULT_EPOCHS: NonZeroUsize = NonZeroUsize::new(20).unwrap();

/// The configuration shared by every model of the family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ModelConfig {
    pub name: String,
    pub input_width: usize,
    pub input_height: usize,
    pub depth: usize,
    pub num_classes: usize,
    /// Applied on every hidden layer, the classification head always uses softmax.
    ///
    /// `validate` rejects softmax, which may not be used as a hidden activation.
    pub activation: ActFn,
    pub optimizer: OptimizerKind,
    pub batch_size: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub learning_rate: f32,
    pub verbose: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: "Base Model".to_string(),
            input_width: 64,
            input_height: 64,
            depth: 3,
            num_classes: 4,
            activation: ActFn::Relu,
            optimizer: OptimizerKind::Adam,
            batch_size: DEFAULT_BATCH_SIZE,
            epochs: DEFAULT_EPOCHS,
            learning_rate: 1e-4,
            verbose: true,
        }
    }
}

impl ModelConfig {
    /// Checks the invariants a graph builder relies on.
    ///
    /// # Returns
    /// An error describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        let dims = [
            ("input width", self.input_width),
            ("input height", self.input_height),
            ("input depth", self.depth),
            ("number of classes", self.num_classes),
        ];

        for (what, got) in dims {
            if got == 0 {
                return Err(ArchErr::InvalidDimension { what, got });
            }
        }

        if self.activation == ActFn::Softmax {
            return Err(ArchErr::ReservedActivation {
                name: ActFn::Softmax.name(),
            });
        }

        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ArchErr::InvalidLearningRate {
                got: self.learning_rate,
            });
        }

        Ok(())
    }

    /// Returns the shape of a single input sample.
    pub fn input_shape(&self) -> Shape {
        Shape::spatial(self.input_height, self.input_width, self.depth)
    }

    /// Returns the optimizer specification for this configuration.
    pub fn optimizer_spec(&self) -> OptimizerSpec {
        self.optimizer.spec(self.learning_rate)
    }
}

/// The extra configuration taken by the block based builders.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct BlockConfig {
    pub num_blocks: usize,
    /// The feature maps of the first block, doubled on every following one.
    pub feature_maps: usize,
    pub batch_norm: bool,
    pub drop_rate: f32,
    /// The residual units emitted per block-group, ignored outside the residual builder.
    pub residuals_per_group: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            num_blocks: 3,
            feature_maps: 32,
            batch_norm: true,
            drop_rate: 0.2,
            residuals_per_group: 1,
        }
    }
}

impl BlockConfig {
    /// Checks the block invariants.
    ///
    /// # Returns
    /// An error describing the first violated invariant.
    pub fn validate(&self) -> Result<()> {
        if self.num_blocks < 1 {
            return Err(ArchErr::InvalidBlockCount {
                what: "number of blocks",
                got: self.num_blocks,
            });
        }

        if self.residuals_per_group < 1 {
            return Err(ArchErr::InvalidBlockCount {
                what: "residuals per group",
                got: self.residuals_per_group,
            });
        }

        if self.feature_maps == 0 {
            return Err(ArchErr::InvalidDimension {
                what: "feature maps",
                got: 0,
            });
        }

        if !(0.0..1.0).contains(&self.drop_rate) {
            return Err(ArchErr::InvalidDropRate {
                got: self.drop_rate,
            });
        }

        Ok(())
    }
}

/// The architecture variant to build.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Architecture {
    #[default]
    Base,
    Normalized(BlockConfig),
    Residual(BlockConfig),
}

/// A model configuration together with the architecture it should be built with.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ExperimentConfig {
    pub model: ModelConfig,
    pub architecture: Architecture,
}

impl ExperimentConfig {
    /// Loads an `ExperimentConfig` from a JSON file.
    ///
    /// # Arguments
    /// * `path` - The path of the JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ModelConfig::default();
        config.validate().unwrap();
        assert_eq!(config.batch_size.get(), 32);
        assert_eq!(config.epochs.get(), 20);
        BlockConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_dimensions_are_rejected() {
        let config = ModelConfig {
            num_classes: 0,
            ..Default::default()
        };

        let err = config.validate().unwrap_err();
        assert!(err.is_config_error());
        assert!(matches!(
            err,
            ArchErr::InvalidDimension {
                what: "number of classes",
                got: 0
            }
        ));
    }

    #[test]
    fn drop_rate_must_be_below_one() {
        for drop_rate in [1.0, 1.5, -0.1, f32::NAN] {
            let blocks = BlockConfig {
                drop_rate,
                ..Default::default()
            };
            assert!(matches!(
                blocks.validate(),
                Err(ArchErr::InvalidDropRate { .. })
            ));
        }

        let blocks = BlockConfig {
            drop_rate: 0.0,
            ..Default::default()
        };
        blocks.validate().unwrap();
    }

    #[test]
    fn softmax_is_reserved_for_the_head() {
        let config = ModelConfig {
            activation: ActFn::Softmax,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ArchErr::ReservedActivation { .. })
        ));
    }

    #[test]
    fn experiment_config_parses_partial_json() {
        let json = r#"{
            "model": { "name": "occluded", "num_classes": 10, "optimizer": "sgd-momentum" },
            "architecture": { "kind": "residual", "num_blocks": 2, "drop_rate": 0.3 }
        }"#;

        let config: ExperimentConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.model.name, "occluded");
        assert_eq!(config.model.num_classes, 10);
        assert_eq!(config.model.input_width, 64);
        assert_eq!(config.model.optimizer, OptimizerKind::SgdMomentum);

        let Architecture::Residual(blocks) = config.architecture else {
            panic!("expected a residual architecture");
        };
        assert_eq!(blocks.num_blocks, 2);
        assert_eq!(blocks.feature_maps, 32);
        assert_eq!(blocks.drop_rate, 0.3);
    }

    #[test]
    fn unknown_optimizer_names_fail_to_parse() {
        let json = r#"{ "optimizer": "foo" }"#;
        assert!(serde_json::from_str::<ModelConfig>(json).is_err());
    }
}
