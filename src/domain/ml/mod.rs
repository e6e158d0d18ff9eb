pub mod dataset;
pub mod feature_registry;
pub mod prediction;

pub use dataset::{Dataset, Observation};
pub use prediction::{PredictionRecord, binarize};
