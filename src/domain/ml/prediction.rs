use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Out-of-sample outcome for a single evaluated day.
///
/// Field names follow the column layout of the predictions file:
/// `Date,Target,Predictions`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Target")]
    pub target: u8,
    #[serde(rename = "Predictions")]
    pub prediction: u8,
}

impl PredictionRecord {
    pub fn is_correct(&self) -> bool {
        self.target == self.prediction
    }
}

/// Converts a positive-class probability into a label.
/// Strictly greater than `threshold` is positive.
pub fn binarize(probability: f64, threshold: f64) -> u8 {
    if probability > threshold { 1 } else { 0 }
}
