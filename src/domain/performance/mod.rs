pub mod classification_metrics;

pub use classification_metrics::{ClassificationMetrics, accuracy_score, precision_score};
