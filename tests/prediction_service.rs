mod common;

use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;

use serde_json::{json, Value};
use tempfile::TempDir;
use warp::http::StatusCode;

use aqi_predictor::inference::api::routes;
use aqi_predictor::training::trainer;
use aqi_predictor::error::{PredictError, ValidationError};
use aqi_predictor::{Dataset, FeatureVector, PredictionResult, Predictor};

use common::{config_in, observations, write_dataset, FEATURES};

async fn trained_service() -> (TempDir, Arc<Predictor>) {
    let dir = TempDir::new().unwrap();
    let config = config_in(dir.path(), &[]);
    write_dataset(&config.paths.dataset, 60);
    trainer::run(&config).await.unwrap();
    let predictor = Predictor::load(&config.paths).unwrap();
    (dir, Arc::new(predictor))
}

fn body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("GET")
        .path("/health")
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body(response.body()), json!({ "status": "ok" }));
}

#[tokio::test]
async fn predict_accepts_the_trained_feature_set() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .json(&json!({ "features": { "pm2_5": 12.3, "temperature": 28.5, "humidity": 55 } }))
        .reply(&routes(predictor.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let result: PredictionResult = serde_json::from_slice(response.body()).unwrap();
    assert!(result.prediction.is_finite());
    assert_eq!(result.model_version, predictor.metadata().version);
}

#[tokio::test]
async fn key_order_in_the_request_is_irrelevant() {
    let (_dir, predictor) = trained_service().await;
    let a = warp::test::request()
        .method("POST")
        .path("/predict")
        .header("content-type", "application/json")
        .body(r#"{"features":{"humidity":55,"pm2_5":12.3,"temperature":28.5}}"#)
        .reply(&routes(predictor.clone()))
        .await;
    let b = warp::test::request()
        .method("POST")
        .path("/predict")
        .header("content-type", "application/json")
        .body(r#"{"features":{"temperature":28.5,"pm2_5":12.3,"humidity":55}}"#)
        .reply(&routes(predictor))
        .await;
    assert_eq!(a.status(), StatusCode::OK);
    assert_eq!(body(a.body())["prediction"], body(b.body())["prediction"]);
}

#[tokio::test]
async fn missing_feature_is_unprocessable() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .json(&json!({ "features": { "pm2_5": 12.3, "temperature": 28.5 } }))
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body(response.body());
    assert_eq!(body["missing"], json!(["humidity"]));
    assert_eq!(body["unexpected"], json!([]));
}

#[tokio::test]
async fn unexpected_feature_is_unprocessable() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .json(&json!({ "features": {
            "pm2_5": 12.3, "temperature": 28.5, "humidity": 55, "wind_speed": 3.0
        } }))
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(response.body())["unexpected"], json!(["wind_speed"]));
}

#[tokio::test]
async fn non_numeric_feature_is_unprocessable() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .json(&json!({ "features": { "pm2_5": 12.3, "temperature": "warm", "humidity": 55 } }))
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body(response.body())["error"].as_str().unwrap().contains("temperature"));
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .header("content-type", "application/json")
        .body("{not json")
        .reply(&routes(predictor.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = warp::test::request()
        .method("POST")
        .path("/predict")
        .json(&json!({ "pm2_5": 12.3 }))
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn latest_matches_an_explicit_prediction_for_the_last_row() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("GET")
        .path("/predict/latest")
        .reply(&routes(predictor.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let latest: PredictionResult = serde_json::from_slice(response.body()).unwrap();

    let dataset = Dataset::read_csv(predictor.dataset_path()).unwrap();
    let last = dataset.last().unwrap();
    let features: BTreeMap<String, f64> = FEATURES
        .iter()
        .map(|name| (name.to_string(), last.get(name).unwrap()))
        .collect();
    let explicit = predictor.predict(&features).unwrap();

    assert!((latest.prediction - explicit.prediction).abs() < 1e-9);
    assert_eq!(latest.index, Some(dataset.len() - 1));
    assert_eq!(latest.timestamp.as_deref(), last.timestamp());
}

#[tokio::test]
async fn latest_without_a_dataset_is_not_found() {
    let (_dir, predictor) = trained_service().await;
    fs::remove_file(predictor.dataset_path()).unwrap();
    let response = warp::test::request()
        .method("GET")
        .path("/predict/latest")
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn latest_on_an_empty_dataset_is_a_bad_request() {
    let (_dir, predictor) = trained_service().await;
    fs::write(
        predictor.dataset_path(),
        "timestamp,pm2_5,temperature,humidity,aqi\n",
    )
    .unwrap();
    let response = warp::test::request()
        .method("GET")
        .path("/predict/latest")
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schema_lists_features_in_trained_order() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("GET")
        .path("/schema")
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body(response.body());
    assert_eq!(body["features"], json!(FEATURES));
    assert_eq!(body["model"]["target"], json!("aqi"));
}

#[tokio::test]
async fn raw_observations_are_engineered_before_predicting() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("POST")
        .path("/predict/raw")
        .json(&json!({ "observations": observations(8, true) }))
        .reply(&routes(predictor.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body(response.body())["timestamp"].is_string());

    // without weather the trained temperature and humidity are absent
    let response = warp::test::request()
        .method("POST")
        .path("/predict/raw")
        .json(&json!({ "observations": observations(8, false) }))
        .reply(&routes(predictor.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body(response.body())["missing"], json!(["temperature", "humidity"]));

    let response = warp::test::request()
        .method("POST")
        .path("/predict/raw")
        .json(&json!({ "observations": observations(3, true) }))
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (_dir, predictor) = trained_service().await;
    let response = warp::test::request()
        .method("GET")
        .path("/predict/tomorrow")
        .reply(&routes(predictor))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ordered_vectors_must_follow_trained_order() {
    let (_dir, predictor) = trained_service().await;
    let ordered: FeatureVector = vec![("pm2_5", 12.3), ("temperature", 28.5), ("humidity", 55.0)]
        .into_iter()
        .collect();
    let reordered: FeatureVector = vec![("humidity", 55.0), ("pm2_5", 12.3), ("temperature", 28.5)]
        .into_iter()
        .collect();
    let map: BTreeMap<String, f64> = ordered.iter().map(|(n, v)| (n.to_string(), v)).collect();

    let from_vector = predictor.predict_vector(&ordered).unwrap();
    assert_eq!(from_vector.prediction, predictor.predict(&map).unwrap().prediction);

    assert!(matches!(
        predictor.predict_vector(&reordered),
        Err(PredictError::Validation(ValidationError::OrderMismatch))
    ));

    let short: FeatureVector = vec![("pm2_5", 12.3), ("temperature", 28.5)].into_iter().collect();
    match predictor.predict_vector(&short) {
        Err(PredictError::Validation(ValidationError::KeyMismatch { missing, .. })) => {
            assert_eq!(missing, ["humidity"])
        }
        other => panic!("expected a key mismatch, got {other:?}"),
    }
}
