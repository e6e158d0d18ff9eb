pub mod classifier;
pub mod feature_builder;
pub mod random_forest;

pub use classifier::Classifier;
pub use feature_builder::{FeatureBuilder, FeatureSpec};
pub use random_forest::{RandomForestClassifier, RandomForestParams};
