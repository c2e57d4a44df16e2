pub mod dataset;
pub mod features;
pub mod observation;
pub mod source;
pub mod weather;
