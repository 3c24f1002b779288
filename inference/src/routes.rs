use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{AppState, Result, ServiceErr};

/// The body of a `/predict` request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PredictRequest {
    pub base64_bytes: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub sharpened_image: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NamesResponse {
    pub names: Vec<String>,
}

/// Builds the service router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/names", get(names))
        .with_state(state)
}

async fn predict(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>> {
    let prediction =
        tokio::task::spawn_blocking(move || state.predict(&request.base64_bytes))
            .await
            .map_err(|e| ServiceErr::Task(e.to_string()))??;

    debug!(prediction = prediction.name.as_str(); "answered prediction");
    Ok(Json(PredictResponse {
        prediction: prediction.name,
        sharpened_image: prediction.sharpened_png,
    }))
}

async fn names(State(state): State<Arc<AppState>>) -> Json<NamesResponse> {
    Json(NamesResponse {
        names: state.names().to_vec(),
    })
}
