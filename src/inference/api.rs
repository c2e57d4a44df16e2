use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};
use warp::{Filter, Rejection, Reply};

use crate::data::observation::RawObservation;
use crate::error::{DatasetError, PredictError, ValidationError};
use crate::inference::predictor::{PredictionResult, Predictor};
use crate::model::trained::ModelMetadata;

const MAX_BODY_BYTES: u64 = 1024 * 1024;

/// `POST /predict` body. Values stay as raw JSON so that non-numbers are
/// reported instead of coerced.
#[derive(Debug, Deserialize, Serialize)]
pub struct PredictRequest {
    pub features: BTreeMap<String, Value>,
}

/// `POST /predict/raw` body.
#[derive(Debug, Deserialize, Serialize)]
pub struct RawPredictRequest {
    pub observations: Vec<RawObservation>,
}

#[derive(Debug, Serialize)]
pub struct SchemaResponse<'a> {
    pub features: &'a [String],
    pub model: &'a ModelMetadata,
}

pub fn routes(
    predictor: Arc<Predictor>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let with_predictor = warp::any().map(move || predictor.clone());

    let health = warp::path!("health")
        .and(warp::get())
        .map(|| warp::reply::json(&json!({ "status": "ok" })));

    let latest = warp::path!("predict" / "latest")
        .and(warp::get())
        .and(with_predictor.clone())
        .map(|predictor: Arc<Predictor>| respond(predictor.predict_latest()));

    let predict = warp::path!("predict")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_predictor.clone())
        .map(|request: PredictRequest, predictor: Arc<Predictor>| {
            respond(numeric(request.features).and_then(|features| predictor.predict(&features)))
        });

    let raw = warp::path!("predict" / "raw")
        .and(warp::post())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_predictor.clone())
        .map(|request: RawPredictRequest, predictor: Arc<Predictor>| {
            respond(predictor.predict_raw(&request.observations))
        });

    let schema = warp::path!("schema")
        .and(warp::get())
        .and(with_predictor)
        .map(|predictor: Arc<Predictor>| {
            warp::reply::json(&SchemaResponse {
                features: predictor.schema().names(),
                model: predictor.metadata(),
            })
        });

    health
        .or(latest)
        .or(predict)
        .or(raw)
        .or(schema)
        .recover(handle_rejection)
        .with(warp::log("aqi_predictor::api"))
}

/// Serves until Ctrl-C.
pub async fn serve(predictor: Arc<Predictor>, addr: SocketAddr) -> Result<(), warp::Error> {
    let (bound, server) = warp::serve(routes(predictor)).try_bind_with_graceful_shutdown(addr, async {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
        }
    })?;
    info!("AQI prediction service listening on http://{bound}");
    server.await;
    Ok(())
}

pub fn status_for(err: &PredictError) -> StatusCode {
    match err {
        PredictError::Validation(_) | PredictError::Features(_) => StatusCode::UNPROCESSABLE_ENTITY,
        PredictError::Dataset(DatasetError::NotFound(_)) => StatusCode::NOT_FOUND,
        PredictError::Dataset(DatasetError::Empty(_)) => StatusCode::BAD_REQUEST,
        PredictError::Dataset(_) | PredictError::Model(_) | PredictError::NonFinite => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn numeric(features: BTreeMap<String, Value>) -> Result<BTreeMap<String, f64>, PredictError> {
    features
        .into_iter()
        .map(|(name, value)| match value.as_f64().filter(|v| v.is_finite()) {
            Some(v) => Ok((name, v)),
            None => Err(ValidationError::NonNumeric { name }.into()),
        })
        .collect()
}

fn respond(result: Result<PredictionResult, PredictError>) -> WithStatus<Json> {
    match result {
        Ok(prediction) => warp::reply::with_status(warp::reply::json(&prediction), StatusCode::OK),
        Err(err) => {
            let status = status_for(&err);
            if status.is_server_error() {
                error!("Prediction failed: {err}");
            }
            let mut body = json!({ "error": err.to_string() });
            if let PredictError::Validation(ValidationError::KeyMismatch {
                missing,
                unexpected,
            }) = &err
            {
                body["missing"] = json!(missing);
                body["unexpected"] = json!(unexpected);
            }
            warp::reply::with_status(warp::reply::json(&body), status)
        }
    }
}

async fn handle_rejection(err: Rejection) -> Result<WithStatus<Json>, Infallible> {
    let (status, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not found".to_string())
    } else if let Some(e) = err.find::<warp::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, e.to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "request body too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/json".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "method not allowed".to_string())
    } else {
        error!("Unhandled rejection: {err:?}");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "error": message })),
        status,
    ))
}
