// Raw daily price history
pub mod market;

// Datasets, predictions and the feature registry
pub mod ml;

// Prediction scoring
pub mod performance;

// Domain-specific error types
pub mod errors;
