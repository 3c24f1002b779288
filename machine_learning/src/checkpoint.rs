use std::{fs, path::Path};

use architecture::{LayerGraph, ModelConfig};
use log::info;
use safetensors::{Dtype, SafeTensorError, SafeTensors, tensor::TensorView};
use serde::{Deserialize, Serialize};

use crate::{MlErr, Result};

/// The file holding the configuration and the graph of a checkpoint.
pub const CONFIG_FILE: &str = "model.json";

/// The file holding the flat parameter and state buffers of a checkpoint.
pub const WEIGHTS_FILE: &str = "weights.safetensors";

const PARAMS_TENSOR: &str = "params";
const STATE_TENSOR: &str = "state";

#[derive(Serialize, Deserialize)]
struct ModelFile {
    config: ModelConfig,
    graph: LayerGraph,
}

/// Everything needed to rebuild a trained classifier.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub config: ModelConfig,
    pub graph: LayerGraph,
    pub params: Vec<f32>,
    pub state: Vec<f32>,
}

/// Writes a checkpoint into `dir`, creating it if needed.
///
/// # Arguments
/// * `dir` - The checkpoint directory.
/// * `config` - The configuration the model was built from.
/// * `graph` - The layer graph of the model.
/// * `params` - The trainable parameters.
/// * `state` - The non trainable buffers, such as the batch norm moving statistics.
pub fn save<P: AsRef<Path>>(
    dir: P,
    config: &ModelConfig,
    graph: &LayerGraph,
    params: &[f32],
    state: &[f32],
) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;

    let model = ModelFile {
        config: config.clone(),
        graph: graph.clone(),
    };
    fs::write(dir.join(CONFIG_FILE), serde_json::to_string_pretty(&model)?)?;

    let tensors = [
        (PARAMS_TENSOR, flat_view(params)?),
        (STATE_TENSOR, flat_view(state)?),
    ];
    safetensors::serialize_to_file(tensors, &None, &dir.join(WEIGHTS_FILE))?;

    info!(params = params.len(); "saved checkpoint to {}", dir.display());
    Ok(())
}

/// Reads a checkpoint written by `save`.
///
/// # Returns
/// The checkpoint or an error if a file is missing or malformed.
pub fn load<P: AsRef<Path>>(dir: P) -> Result<Checkpoint> {
    let dir = dir.as_ref();

    let model: ModelFile = serde_json::from_str(&fs::read_to_string(dir.join(CONFIG_FILE))?)?;
    let bytes = fs::read(dir.join(WEIGHTS_FILE))?;
    let tensors = SafeTensors::deserialize(&bytes)?;

    Ok(Checkpoint {
        config: model.config,
        graph: model.graph,
        params: read_flat(&tensors, PARAMS_TENSOR)?,
        state: read_flat(&tensors, STATE_TENSOR)?,
    })
}

fn flat_view(values: &[f32]) -> Result<TensorView<'_>> {
    let view = TensorView::new(Dtype::F32, vec![values.len()], bytemuck::cast_slice(values))?;
    Ok(view)
}

fn read_flat(tensors: &SafeTensors<'_>, name: &'static str) -> Result<Vec<f32>> {
    let view = match tensors.tensor(name) {
        Ok(view) => view,
        Err(SafeTensorError::TensorNotFound(_)) => return Err(MlErr::MissingTensor { name }),
        Err(e) => return Err(e.into()),
    };

    if view.dtype() != Dtype::F32 {
        return Err(MlErr::MissingTensor { name });
    }

    // The byte buffer carries no alignment guarantee.
    let values = view
        .data()
        .chunks_exact(size_of::<f32>())
        .map(bytemuck::pod_read_unaligned)
        .collect();

    Ok(values)
}
