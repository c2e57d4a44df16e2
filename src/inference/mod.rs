pub mod api;
pub mod predictor;

pub use predictor::{PredictionResult, Predictor};
