use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::ArchErr;

/// The activation functions a layer can apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActFn {
    #[default]
    Relu,
    Sigmoid,
    Tanh,
    Elu,
    Linear,
    /// Only valid on the classification head.
    Softmax,
}

impl ActFn {
    pub fn name(&self) -> &'static str {
        match self {
            ActFn::Relu => "relu",
            ActFn::Sigmoid => "sigmoid",
            ActFn::Tanh => "tanh",
            ActFn::Elu => "elu",
            ActFn::Linear => "linear",
            ActFn::Softmax => "softmax",
        }
    }
}

impl fmt::Display for ActFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ActFn {
    type Err = ArchErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let act_fn = match s.trim().to_lowercase().as_str() {
            "relu" => ActFn::Relu,
            "sigmoid" => ActFn::Sigmoid,
            "tanh" => ActFn::Tanh,
            "elu" => ActFn::Elu,
            "linear" => ActFn::Linear,
            "softmax" => ActFn::Softmax,
            _ => {
                return Err(ArchErr::UnrecognizedActivation {
                    name: s.to_string(),
                });
            }
        };

        Ok(act_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("ReLU".parse::<ActFn>().unwrap(), ActFn::Relu);
        assert_eq!(" tanh ".parse::<ActFn>().unwrap(), ActFn::Tanh);
        assert!("swish".parse::<ActFn>().is_err());
    }

    #[test]
    fn serializes_as_snake_case() {
        let json = serde_json::to_string(&ActFn::Softmax).unwrap();
        assert_eq!(json, "\"softmax\"");
    }
}
