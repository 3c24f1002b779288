//! The training and inference engine of the face recognition models: compiles the layer
//! graphs built by `architecture` into executable models and trains them.

pub mod arch;
pub mod checkpoint;
pub mod dataset;
pub mod error;
pub mod optimization;
mod test;
pub mod training;

pub use error::{MlErr, Result};
