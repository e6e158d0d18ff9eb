use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while assembling an ordered dataset
#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("Dates must be strictly ascending: {previous} is followed by {current}")]
    UnorderedDates {
        previous: NaiveDate,
        current: NaiveDate,
    },

    #[error("Duplicate date in dataset: {date}")]
    DuplicateDate { date: NaiveDate },

    #[error("Observation {date} has {actual} feature values, expected {expected}")]
    FeatureWidthMismatch {
        date: NaiveDate,
        expected: usize,
        actual: usize,
    },

    #[error("Observation {date} has a non-finite value for {feature}")]
    NonFiniteFeature { date: NaiveDate, feature: String },

    #[error("Invalid target label {label} on {date}. Must be 0 or 1")]
    InvalidTarget { date: NaiveDate, label: u8 },

    #[error("Unknown feature column: {name}")]
    UnknownFeature { name: String },

    #[error("Duplicate feature column: {name}")]
    DuplicateFeature { name: String },

    #[error("Invalid rolling window for {name}: {period}")]
    InvalidWindow { name: String, period: usize },

    #[error("Row range {start}..{end} is out of bounds for {len} observations")]
    OutOfBounds { start: usize, end: usize, len: usize },
}

/// Errors raised by classifier implementations
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model has not been fitted")]
    NotFitted,

    #[error("Invalid model input: {reason}")]
    InvalidInput { reason: String },

    #[error("Training failed: {reason}")]
    TrainingFailed { reason: String },

    #[error("Prediction failed: {reason}")]
    PredictionFailed { reason: String },
}

/// Errors raised by the walk-forward and holdout evaluators
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Dataset is empty")]
    EmptyDataset,

    #[error("Dataset has {len} observations, need more than {required} to evaluate")]
    InsufficientData { len: usize, required: usize },

    #[error("Invalid evaluation parameter: {field} = {value}")]
    InvalidParameter { field: String, value: String },

    #[error("Classifier returned {actual} probabilities for {expected} rows")]
    PredictionCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error("Classifier {model} failed at offset {offset}: {source}")]
    Model {
        model: String,
        offset: usize,
        #[source]
        source: ModelError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_error_formatting() {
        let error = DatasetError::FeatureWidthMismatch {
            date: NaiveDate::from_ymd_opt(2021, 3, 4).unwrap(),
            expected: 5,
            actual: 4,
        };

        let msg = error.to_string();
        assert!(msg.contains("2021-03-04"));
        assert!(msg.contains("expected 5"));
    }

    #[test]
    fn test_model_error_wrapped_with_offset() {
        let error = EvaluationError::Model {
            model: "RandomForest".to_string(),
            offset: 1010,
            source: ModelError::NotFitted,
        };

        let msg = error.to_string();
        assert!(msg.contains("RandomForest"));
        assert!(msg.contains("1010"));
        assert!(msg.contains("not been fitted"));
    }
}
