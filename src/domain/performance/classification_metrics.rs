use crate::domain::ml::PredictionRecord;
use serde::{Deserialize, Serialize};

/// Scoring of a set of out-of-sample direction predictions
///
/// Positive means "predicted up" (label 1). Precision is the headline
/// metric: how often an up call was right.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationMetrics {
    pub total: usize,

    // Confusion matrix
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,

    pub precision: f64,
    pub accuracy: f64,

    // Distribution
    pub predicted_positive: usize,
    pub predicted_negative: usize,
    /// Share of days that actually closed up; the precision of always
    /// predicting up.
    pub baseline_precision: f64,
}

impl ClassificationMetrics {
    pub fn calculate(records: &[PredictionRecord]) -> Self {
        let mut metrics = Self {
            total: records.len(),
            ..Default::default()
        };

        for r in records {
            match (r.prediction, r.target) {
                (1, 1) => metrics.true_positives += 1,
                (1, _) => metrics.false_positives += 1,
                (_, 1) => metrics.false_negatives += 1,
                _ => metrics.true_negatives += 1,
            }
        }

        metrics.predicted_positive = metrics.true_positives + metrics.false_positives;
        metrics.predicted_negative = metrics.total - metrics.predicted_positive;
        metrics.precision = precision_score(records);
        metrics.accuracy = accuracy_score(records);

        if metrics.total > 0 {
            let actual_positive = metrics.true_positives + metrics.false_negatives;
            metrics.baseline_precision = actual_positive as f64 / metrics.total as f64;
        }

        metrics
    }

    /// Precision minus the always-up baseline.
    pub fn edge_over_baseline(&self) -> f64 {
        self.precision - self.baseline_precision
    }
}

/// TP / (TP + FP). Zero when nothing was predicted positive.
pub fn precision_score(records: &[PredictionRecord]) -> f64 {
    let predicted_positive = records.iter().filter(|r| r.prediction == 1).count();
    if predicted_positive == 0 {
        return 0.0;
    }
    let true_positive = records
        .iter()
        .filter(|r| r.prediction == 1 && r.target == 1)
        .count();
    true_positive as f64 / predicted_positive as f64
}

/// Correct / total. Zero for an empty set.
pub fn accuracy_score(records: &[PredictionRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let correct = records.iter().filter(|r| r.is_correct()).count();
    correct as f64 / records.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn records(pairs: &[(u8, u8)]) -> Vec<PredictionRecord> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        pairs
            .iter()
            .enumerate()
            .map(|(i, &(target, prediction))| PredictionRecord {
                date: start + Duration::days(i as i64),
                target,
                prediction,
            })
            .collect()
    }

    #[test]
    fn test_precision_all_positive_all_true() {
        let r = records(&[(1, 1), (1, 1), (1, 1)]);
        assert_eq!(precision_score(&r), 1.0);
        assert_eq!(accuracy_score(&r), 1.0);
    }

    #[test]
    fn test_precision_without_positive_predictions_is_zero() {
        let r = records(&[(1, 0), (0, 0)]);
        assert_eq!(precision_score(&r), 0.0);
        assert_eq!(accuracy_score(&r), 0.5);
    }

    #[test]
    fn test_empty_records() {
        let metrics = ClassificationMetrics::calculate(&[]);
        assert_eq!(metrics, ClassificationMetrics::default());
    }

    #[test]
    fn test_confusion_matrix() {
        // TP, FP, FP, TN, FN
        let r = records(&[(1, 1), (0, 1), (0, 1), (0, 0), (1, 0)]);
        let m = ClassificationMetrics::calculate(&r);

        assert_eq!(m.total, 5);
        assert_eq!(m.true_positives, 1);
        assert_eq!(m.false_positives, 2);
        assert_eq!(m.true_negatives, 1);
        assert_eq!(m.false_negatives, 1);
        assert_eq!(m.predicted_positive, 3);
        assert_eq!(m.predicted_negative, 2);
        assert!((m.precision - 1.0 / 3.0).abs() < 1e-12);
        assert!((m.accuracy - 0.4).abs() < 1e-12);
        assert!((m.baseline_precision - 0.4).abs() < 1e-12);
        assert!(m.edge_over_baseline() < 0.0);
    }
}
