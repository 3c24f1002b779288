use std::{fmt, str::FromStr};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::ArchErr;

/// The momentum used by the `sgd-momentum` optimizer.
pub const SGD_MOMENTUM: f32 = 0.9;

const EPSILON: f32 = 1e-7;

/// The closed set of optimizers a model can be trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizerKind {
    #[default]
    Adam,
    Nadam,
    Adagrad,
    Rmsprop,
    Adadelta,
    #[serde(alias = "sgd")]
    SgdMomentum,
}

impl OptimizerKind {
    pub const ALL: [OptimizerKind; 6] = [
        OptimizerKind::Adam,
        OptimizerKind::Nadam,
        OptimizerKind::Adagrad,
        OptimizerKind::Rmsprop,
        OptimizerKind::Adadelta,
        OptimizerKind::SgdMomentum,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Adam => "adam",
            OptimizerKind::Nadam => "nadam",
            OptimizerKind::Adagrad => "adagrad",
            OptimizerKind::Rmsprop => "rmsprop",
            OptimizerKind::Adadelta => "adadelta",
            OptimizerKind::SgdMomentum => "sgd-momentum",
        }
    }

    /// Returns the specification of this optimizer with its default hyperparameters.
    ///
    /// # Arguments
    /// * `learning_rate` - The learning rate the optimizer will use, kept as is.
    pub fn spec(&self, learning_rate: f32) -> OptimizerSpec {
        match self {
            OptimizerKind::Adam => OptimizerSpec::Adam {
                learning_rate,
                beta1: 0.9,
                beta2: 0.999,
                epsilon: EPSILON,
            },
            OptimizerKind::Nadam => OptimizerSpec::Nadam {
                learning_rate,
                beta1: 0.9,
                beta2: 0.999,
                epsilon: EPSILON,
            },
            OptimizerKind::Adagrad => OptimizerSpec::Adagrad {
                learning_rate,
                initial_accumulator: 0.1,
                epsilon: EPSILON,
            },
            OptimizerKind::Rmsprop => OptimizerSpec::Rmsprop {
                learning_rate,
                rho: 0.9,
                epsilon: EPSILON,
            },
            OptimizerKind::Adadelta => OptimizerSpec::Adadelta {
                learning_rate,
                rho: 0.95,
                epsilon: EPSILON,
            },
            OptimizerKind::SgdMomentum => OptimizerSpec::SgdMomentum {
                learning_rate,
                momentum: SGD_MOMENTUM,
            },
        }
    }
}

impl fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for OptimizerKind {
    type Err = ArchErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s {
            "adam" => OptimizerKind::Adam,
            "nadam" => OptimizerKind::Nadam,
            "adagrad" => OptimizerKind::Adagrad,
            "rmsprop" => OptimizerKind::Rmsprop,
            "adadelta" => OptimizerKind::Adadelta,
            "sgd-momentum" | "sgd" => OptimizerKind::SgdMomentum,
            _ => {
                return Err(ArchErr::UnrecognizedOptimizer {
                    name: s.to_string(),
                });
            }
        };

        Ok(kind)
    }
}

/// The specification for the `Optimizer` trait, carrying every hyperparameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerSpec {
    Adam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Nadam {
        learning_rate: f32,
        beta1: f32,
        beta2: f32,
        epsilon: f32,
    },
    Adagrad {
        learning_rate: f32,
        initial_accumulator: f32,
        epsilon: f32,
    },
    Rmsprop {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
    Adadelta {
        learning_rate: f32,
        rho: f32,
        epsilon: f32,
    },
    SgdMomentum {
        learning_rate: f32,
        momentum: f32,
    },
}

impl OptimizerSpec {
    pub fn learning_rate(&self) -> f32 {
        match *self {
            OptimizerSpec::Adam { learning_rate, .. }
            | OptimizerSpec::Nadam { learning_rate, .. }
            | OptimizerSpec::Adagrad { learning_rate, .. }
            | OptimizerSpec::Rmsprop { learning_rate, .. }
            | OptimizerSpec::Adadelta { learning_rate, .. }
            | OptimizerSpec::SgdMomentum { learning_rate, .. } => learning_rate,
        }
    }

    pub fn kind(&self) -> OptimizerKind {
        match self {
            OptimizerSpec::Adam { .. } => OptimizerKind::Adam,
            OptimizerSpec::Nadam { .. } => OptimizerKind::Nadam,
            OptimizerSpec::Adagrad { .. } => OptimizerKind::Adagrad,
            OptimizerSpec::Rmsprop { .. } => OptimizerKind::Rmsprop,
            OptimizerSpec::Adadelta { .. } => OptimizerKind::Adadelta,
            OptimizerSpec::SgdMomentum { .. } => OptimizerKind::SgdMomentum,
        }
    }
}

/// Maps an optimizer name to its specification.
///
/// Names outside the known set fall back to `sgd-momentum` and a warning is logged. Use
/// `OptimizerKind::from_str` to reject them instead.
///
/// # Arguments
/// * `name` - The name of the optimizer.
/// * `learning_rate` - The learning rate to configure it with.
///
/// # Returns
/// The optimizer specification.
pub fn select(name: &str, learning_rate: f32) -> OptimizerSpec {
    let kind = name.parse().unwrap_or_else(|_| {
        warn!("unrecognized optimizer {name:?}, falling back to sgd-momentum");
        OptimizerKind::SgdMomentum
    });

    kind.spec(learning_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_keeps_learning_rate() {
        for kind in OptimizerKind::ALL {
            let spec = select(kind.name(), 0.0123);
            assert_eq!(spec.learning_rate(), 0.0123);
            assert_eq!(spec.kind(), kind);
        }
    }

    #[test]
    fn select_falls_back_to_sgd_momentum() {
        let spec = select("foo", 0.5);
        assert_eq!(spec, select("sgd-momentum", 0.5));
        assert_eq!(
            spec,
            OptimizerSpec::SgdMomentum {
                learning_rate: 0.5,
                momentum: 0.9
            }
        );
    }

    #[test]
    fn strict_parse_rejects_unknown_names() {
        let err = "foo".parse::<OptimizerKind>().unwrap_err();
        assert!(matches!(err, ArchErr::UnrecognizedOptimizer { name } if name == "foo"));
    }

    #[test]
    fn kinds_roundtrip_through_json_names() {
        for kind in OptimizerKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }
}
