use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

use architecture::ArchErr;
use ndarray::ShapeError;
use rand_distr::uniform::Error as UniformError;
use safetensors::SafeTensorError;

/// The result type used in the entire machine learning module.
pub type Result<T> = std::result::Result<T, MlErr>;

/// The machine learning module's error type.
#[derive(Debug)]
pub enum MlErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        layer: usize,
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    MissingCache {
        layer: &'static str,
    },
    EmptyDataset,
    InvalidLabel {
        label: usize,
        num_classes: usize,
    },
    MissingTensor {
        name: &'static str,
    },
    Arch(ArchErr),
    Ndarray(ShapeError),
    WeightInit(String),
    Checkpoint(SafeTensorError),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for MlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MlErr::SizeMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "There's a size mismatch in {what}, got {got} and expected {expected}"
            ),
            MlErr::ShapeMismatch {
                layer,
                expected,
                got,
            } => write!(
                f,
                "Can't add the residual operands of layer {layer}, the main path has shape {expected:?} and the shortcut {got:?}"
            ),
            MlErr::MissingCache { layer } => write!(
                f,
                "Tried to run a backward pass on a {layer} layer without a training forward pass"
            ),
            MlErr::EmptyDataset => write!(f, "The dataset has no samples"),
            MlErr::InvalidLabel { label, num_classes } => write!(
                f,
                "Label {label} is out of range for {num_classes} classes"
            ),
            MlErr::MissingTensor { name } => {
                write!(f, "The checkpoint has no tensor named {name}")
            }
            MlErr::Arch(e) => write!(f, "{e}"),
            MlErr::Ndarray(e) => write!(f, "ndarray error: {e}"),
            MlErr::WeightInit(e) => write!(f, "Failed to initialize the weights: {e}"),
            MlErr::Checkpoint(e) => write!(f, "Checkpoint error: {e}"),
            MlErr::Io(e) => write!(f, "io error: {e}"),
            MlErr::Json(e) => write!(f, "json error: {e}"),
        }
    }
}

impl Error for MlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MlErr::Arch(e) => Some(e),
            MlErr::Ndarray(e) => Some(e),
            MlErr::Checkpoint(e) => Some(e),
            MlErr::Io(e) => Some(e),
            MlErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArchErr> for MlErr {
    fn from(value: ArchErr) -> Self {
        Self::Arch(value)
    }
}

impl From<ShapeError> for MlErr {
    fn from(value: ShapeError) -> Self {
        Self::Ndarray(value)
    }
}

impl From<UniformError> for MlErr {
    fn from(value: UniformError) -> Self {
        Self::WeightInit(value.to_string())
    }
}

impl From<SafeTensorError> for MlErr {
    fn from(value: SafeTensorError) -> Self {
        Self::Checkpoint(value)
    }
}

impl From<io::Error> for MlErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for MlErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
