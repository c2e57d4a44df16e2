pub mod importance;
pub mod metrics;
pub mod split;
pub mod trainer;
