mod builder;
mod init;
pub mod layers;
pub mod loss;
mod sequential;

pub use builder::compile;
pub use init::RandWeightGen;
pub use sequential::Sequential;

/// Whether a forward pass is part of training (batch statistics, dropout, cached metadata for
/// the backward pass) or of inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Infer,
}
