use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use crate::shape::Shape;

/// The result type used in the entire architecture module.
pub type Result<T> = std::result::Result<T, ArchErr>;

/// The architecture module's error type.
///
/// Everything but `ShapeMismatch`, `UnrecognizedOptimizer` and the I/O related variants is a
/// configuration error: it is raised while building a graph and no graph is returned.
#[derive(Debug)]
pub enum ArchErr {
    InvalidDimension {
        what: &'static str,
        got: usize,
    },
    InvalidDropRate {
        got: f32,
    },
    InvalidBlockCount {
        what: &'static str,
        got: usize,
    },
    FeatureMapOverflow {
        base: usize,
        block: usize,
    },
    ReservedActivation {
        name: &'static str,
    },
    InvalidLearningRate {
        got: f32,
    },
    UnrecognizedOptimizer {
        name: String,
    },
    UnrecognizedActivation {
        name: String,
    },
    ShapeMismatch {
        layer: usize,
        expected: Shape,
        got: Shape,
    },
    UnexpectedShape {
        layer: usize,
        what: &'static str,
        got: Shape,
    },
    Io(io::Error),
    Json(serde_json::Error),
    Fmt(fmt::Error),
}

impl ArchErr {
    /// Whether this error was caused by an invalid configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ArchErr::InvalidDimension { .. }
                | ArchErr::InvalidDropRate { .. }
                | ArchErr::InvalidBlockCount { .. }
                | ArchErr::FeatureMapOverflow { .. }
                | ArchErr::ReservedActivation { .. }
                | ArchErr::InvalidLearningRate { .. }
        )
    }
}

impl Display for ArchErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchErr::InvalidDimension { what, got } => {
                write!(f, "invalid config: {what} must be greater than 0, got {got}")
            }
            ArchErr::InvalidDropRate { got } => {
                write!(f, "invalid config: drop rate must be in [0, 1), got {got}")
            }
            ArchErr::InvalidBlockCount { what, got } => {
                write!(f, "invalid config: {what} must be at least 1, got {got}")
            }
            ArchErr::FeatureMapOverflow { base, block } => write!(
                f,
                "invalid config: {base} feature maps doubled {block} times overflows"
            ),
            ArchErr::ReservedActivation { name } => write!(
                f,
                "invalid config: {name} is reserved for the classification head"
            ),
            ArchErr::InvalidLearningRate { got } => write!(
                f,
                "invalid config: learning rate must be positive and finite, got {got}"
            ),
            ArchErr::UnrecognizedOptimizer { name } => write!(f, "unrecognized optimizer: {name}"),
            ArchErr::UnrecognizedActivation { name } => {
                write!(f, "unrecognized activation function: {name}")
            }
            ArchErr::ShapeMismatch {
                layer,
                expected,
                got,
            } => write!(
                f,
                "shape mismatch at layer {layer}: expected {expected}, got {got}"
            ),
            ArchErr::UnexpectedShape { layer, what, got } => write!(
                f,
                "layer {layer} expects a {what} input, got {got}"
            ),
            ArchErr::Io(e) => write!(f, "io error: {e}"),
            ArchErr::Json(e) => write!(f, "json error: {e}"),
            ArchErr::Fmt(e) => write!(f, "format error: {e}"),
        }
    }
}

impl Error for ArchErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ArchErr::Io(e) => Some(e),
            ArchErr::Json(e) => Some(e),
            ArchErr::Fmt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ArchErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ArchErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<fmt::Error> for ArchErr {
    fn from(value: fmt::Error) -> Self {
        Self::Fmt(value)
    }
}
