//! Air-quality (AQI) prediction: feature engineering, random-forest
//! training, a small HTTP prediction service and two terminal frontends.
//!
//! The feature-order artifact written by training is the contract every
//! consumer validates against; see [`model::schema::FeatureSchema`].

pub mod config;
pub mod data;
pub mod error;
pub mod frontend;
pub mod inference;
pub mod model;
pub mod training;
pub mod utils;

pub use config::Config;
pub use data::dataset::Dataset;
pub use data::features::{engineer, FeatureVector};
pub use data::observation::RawObservation;
pub use inference::{PredictionResult, Predictor};
pub use model::{FeatureSchema, Forest, Task, TrainedModel};

/// `RUST_LOG` wins; otherwise `info`.
pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
