//! Declarative construction of the CNN family used for occluded face recognition.
//!
//! A `ModelConfig` (plus a `BlockConfig` for the block based variants) is turned into an
//! immutable `LayerGraph` by one of the three builders in [`builders`]. Graphs carry no
//! weights, they are compiled and trained elsewhere.

mod act_fn;
pub mod blocks;
pub mod builders;
mod config;
pub mod error;
mod graph;
mod layer;
pub mod optimizer;
mod shape;
mod test;

pub use act_fn::ActFn;
pub use config::{Architecture, BlockConfig, ExperimentConfig, ModelConfig};
pub use error::{ArchErr, Result};
pub use graph::{GraphBuilder, LayerGraph};
pub use layer::{LayerSpec, Padding, ResidualBlockSpec};
pub use optimizer::{OptimizerKind, OptimizerSpec};
pub use shape::Shape;
