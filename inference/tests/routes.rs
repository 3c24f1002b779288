use std::sync::Arc;

use architecture::{Architecture, ModelConfig};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use image::{Rgb, RgbImage};
use inference::{AppState, preprocess, router};
use machine_learning::training::Classifier;
use serde_json::{Value, json};
use tower::ServiceExt;

const NAMES: [&str; 3] = ["Ada Lovelace", "Grace Hopper", "Alan Turing"];

fn app() -> Router {
    let config = ModelConfig {
        name: "Base Model".to_string(),
        input_width: 8,
        input_height: 8,
        num_classes: NAMES.len(),
        ..Default::default()
    };
    let graph = Architecture::Base.build(&config).unwrap();
    let classifier = Classifier::new(config, graph, 42).unwrap();
    let names = NAMES.iter().map(|name| name.to_string()).collect();

    router(Arc::new(AppState::new(classifier, names)))
}

fn face() -> RgbImage {
    RgbImage::from_fn(20, 14, |x, y| Rgb([(x * 12) as u8, (y * 18) as u8, 128]))
}

async fn send(request: Request<Body>) -> (StatusCode, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .unwrap();

    (status, serde_json::from_slice(&body).unwrap())
}

async fn post_predict(body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap();

    send(request).await
}

#[tokio::test]
async fn predict_names_a_known_face() {
    let payload = preprocess::encode_png(&face()).unwrap();

    let (status, json) = post_predict(json!({ "base64_bytes": payload })).await;

    assert_eq!(status, StatusCode::OK);
    let prediction = json["prediction"].as_str().unwrap();
    assert!(NAMES.contains(&prediction), "{prediction}");

    let sharpened = STANDARD
        .decode(json["sharpened_image"].as_str().unwrap())
        .unwrap();
    let sharpened = image::load_from_memory(&sharpened).unwrap().to_rgb8();
    assert_eq!(sharpened, preprocess::sharpen(&face()));
}

#[tokio::test]
async fn empty_payload_is_452() {
    let (status, json) = post_predict(json!({ "base64_bytes": "" })).await;
    assert_eq!(status.as_u16(), 452);
    assert!(json["error"].is_string());

    let (status, _) = post_predict(json!({})).await;
    assert_eq!(status.as_u16(), 452);
}

#[tokio::test]
async fn undecodable_payload_is_453() {
    let (status, json) = post_predict(json!({ "base64_bytes": "%%%" })).await;
    assert_eq!(status.as_u16(), 453);
    assert!(json["error"].is_string());

    let text = STANDARD.encode(b"GIF89a but not really");
    let (status, _) = post_predict(json!({ "base64_bytes": text })).await;
    assert_eq!(status.as_u16(), 453);
}

#[tokio::test]
async fn names_lists_every_label() {
    let request = Request::builder().uri("/names").body(Body::empty()).unwrap();

    let (status, json) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({ "names": NAMES }));
}
