pub mod forest;
pub mod schema;
pub mod trained;

pub use forest::{Forest, ForestParams, Task};
pub use schema::FeatureSchema;
pub use trained::{ModelMetadata, TrainedModel};
