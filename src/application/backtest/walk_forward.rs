//! Walk-forward evaluation of a direction classifier.
//!
//! The training window is anchored at the first observation and grows by
//! `step` rows per iteration; each iteration scores only the `step` rows that
//! immediately follow the window.

use crate::application::ml::classifier::Classifier;
use crate::domain::errors::EvaluationError;
use crate::domain::ml::{Dataset, PredictionRecord, binarize};
use crate::domain::performance::classification_metrics::ClassificationMetrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    /// Rows used as seed training data; never scored
    pub min_train_size: usize,
    /// Rows scored per iteration
    pub step: usize,
    /// Probabilities strictly above this are predicted as up
    pub threshold: f64,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            min_train_size: 1000,
            step: 10,
            threshold: 0.5,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), EvaluationError> {
        if self.min_train_size == 0 {
            return Err(invalid("min_train_size", self.min_train_size));
        }
        if self.step == 0 {
            return Err(invalid("step", self.step));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(invalid("threshold", self.threshold));
        }
        Ok(())
    }

    /// Number of fit/predict rounds for a dataset of `len` rows.
    pub fn expected_iterations(&self, len: usize) -> usize {
        if self.step == 0 {
            return 0;
        }
        len.saturating_sub(self.min_train_size).div_ceil(self.step)
    }
}

pub(crate) fn invalid(field: &str, value: impl ToString) -> EvaluationError {
    EvaluationError::InvalidParameter {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkForwardResult {
    pub model: String,
    pub config: WalkForwardConfig,
    pub predictors: Vec<String>,
    pub iterations: usize,
    pub predictions: Vec<PredictionRecord>,
}

impl WalkForwardResult {
    pub fn metrics(&self) -> ClassificationMetrics {
        ClassificationMetrics::calculate(&self.predictions)
    }
}

pub struct WalkForwardEvaluator {
    config: WalkForwardConfig,
}

impl WalkForwardEvaluator {
    pub fn new(config: WalkForwardConfig) -> Self {
        Self { config }
    }

    /// Runs the expanding-window backtest over `predictors` of `dataset`.
    ///
    /// Any classifier error aborts the run and is returned with the offset
    /// at which it happened.
    pub fn run<C, S>(
        &self,
        dataset: &Dataset,
        classifier: &mut C,
        predictors: &[S],
    ) -> Result<WalkForwardResult, EvaluationError>
    where
        C: Classifier + ?Sized,
        S: AsRef<str>,
    {
        if dataset.is_empty() {
            return Err(EvaluationError::EmptyDataset);
        }
        self.config.validate()?;

        let data = dataset.select(predictors)?;
        let n = data.len();
        let start = self.config.min_train_size;
        if n <= start {
            return Err(EvaluationError::InsufficientData {
                len: n,
                required: start,
            });
        }

        info!(
            "Walk-forward: {} rows, {} predictors, seed window {}, step {}, threshold {:.2}, model {}",
            n,
            data.feature_names().len(),
            start,
            self.config.step,
            self.config.threshold,
            classifier.name()
        );

        let mut predictions = Vec::with_capacity(n - start);
        let mut iterations = 0;
        let mut offset = start;

        while offset < n {
            let end = offset.saturating_add(self.config.step).min(n);

            let x_train = data.feature_matrix(0..offset)?;
            let y_train = data.labels(0..offset)?;
            classifier
                .fit(&x_train, &y_train)
                .map_err(|source| model_error(classifier.name(), offset, source))?;

            let x_test = data.feature_matrix(offset..end)?;
            let probabilities = classifier
                .predict_proba(&x_test)
                .map_err(|source| model_error(classifier.name(), offset, source))?;
            if probabilities.len() != x_test.len() {
                return Err(EvaluationError::PredictionCountMismatch {
                    expected: x_test.len(),
                    actual: probabilities.len(),
                });
            }

            for (obs, p) in data.slice(offset..end)?.iter().zip(probabilities) {
                predictions.push(PredictionRecord {
                    date: obs.date,
                    target: obs.target,
                    prediction: binarize(p, self.config.threshold),
                });
            }

            iterations += 1;
            debug!(
                "Iteration {}: train [0, {}), test [{}, {})",
                iterations, offset, offset, end
            );
            offset = end;
        }

        info!(
            "Walk-forward complete: {} iterations, {} predictions",
            iterations,
            predictions.len()
        );

        Ok(WalkForwardResult {
            model: classifier.name().to_string(),
            config: self.config.clone(),
            predictors: data.feature_names().to_vec(),
            iterations,
            predictions,
        })
    }
}

impl Default for WalkForwardEvaluator {
    fn default() -> Self {
        Self::new(WalkForwardConfig::default())
    }
}

pub(crate) fn model_error(
    model: &str,
    offset: usize,
    source: crate::domain::errors::ModelError,
) -> EvaluationError {
    EvaluationError::Model {
        model: model.to_string(),
        offset,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::ModelError;
    use crate::domain::ml::Observation;
    use chrono::{Duration, NaiveDate};

    /// Feature 0 is the row index, so training windows can be inspected.
    fn dataset(len: usize) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2000, 1, 3).unwrap();
        let observations = (0..len)
            .map(|i| Observation {
                date: start + Duration::days(i as i64),
                actual_close: 50.0 + i as f64,
                target: (i % 2) as u8,
                features: vec![i as f64, (i % 5) as f64],
            })
            .collect();
        Dataset::new(vec!["index".to_string(), "noise".to_string()], observations).unwrap()
    }

    /// Records each training window and answers with a fixed probability.
    struct Recorder {
        probability: f64,
        windows: Vec<(usize, f64)>,
        fitted_max: f64,
    }

    impl Recorder {
        fn new(probability: f64) -> Self {
            Self {
                probability,
                windows: Vec::new(),
                fitted_max: -1.0,
            }
        }
    }

    impl Classifier for Recorder {
        fn fit(&mut self, features: &[Vec<f64>], _labels: &[u8]) -> Result<(), ModelError> {
            let max = features.iter().map(|r| r[0]).fold(f64::MIN, f64::max);
            self.windows.push((features.len(), max));
            self.fitted_max = max;
            Ok(())
        }

        fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            assert!(features.iter().all(|r| r[0] > self.fitted_max));
            Ok(vec![self.probability; features.len()])
        }

        fn name(&self) -> &str {
            "Recorder"
        }
    }

    struct Failing;

    impl Classifier for Failing {
        fn fit(&mut self, _: &[Vec<f64>], _: &[u8]) -> Result<(), ModelError> {
            Err(ModelError::TrainingFailed {
                reason: "boom".to_string(),
            })
        }

        fn predict_proba(&self, _: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "Failing"
        }
    }

    struct ShortAnswer;

    impl Classifier for ShortAnswer {
        fn fit(&mut self, _: &[Vec<f64>], _: &[u8]) -> Result<(), ModelError> {
            Ok(())
        }

        fn predict_proba(&self, _: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
            Ok(vec![0.9])
        }

        fn name(&self) -> &str {
            "ShortAnswer"
        }
    }

    fn predictors() -> Vec<&'static str> {
        vec!["index", "noise"]
    }

    #[test]
    fn test_full_step_single_iteration() {
        let mut model = Recorder::new(0.7);
        let result = WalkForwardEvaluator::default()
            .run(&dataset(1010), &mut model, &predictors())
            .unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.predictions.len(), 10);
        assert_eq!(model.windows, vec![(1000, 999.0)]);
        assert!(result.predictions.iter().all(|p| p.prediction == 1));
    }

    #[test]
    fn test_partial_final_step() {
        let mut model = Recorder::new(0.7);
        let result = WalkForwardEvaluator::default()
            .run(&dataset(1005), &mut model, &predictors())
            .unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.predictions.len(), 5);
    }

    #[test]
    fn test_windows_expand_without_lookahead() {
        let config = WalkForwardConfig {
            min_train_size: 20,
            step: 7,
            threshold: 0.5,
        };
        let data = dataset(50);
        let mut model = Recorder::new(0.2);
        let result = WalkForwardEvaluator::new(config.clone())
            .run(&data, &mut model, &predictors())
            .unwrap();

        assert_eq!(result.iterations, config.expected_iterations(50));
        assert_eq!(result.predictions.len(), 30);
        assert_eq!(
            model.windows.iter().map(|w| w.0).collect::<Vec<_>>(),
            vec![20, 27, 34, 41, 48]
        );
        for (size, max_index) in &model.windows {
            assert_eq!(*max_index, (*size - 1) as f64);
        }

        // Chronological, one record per evaluated row
        let expected_dates: Vec<_> = data.observations()[20..].iter().map(|o| o.date).collect();
        let dates: Vec<_> = result.predictions.iter().map(|p| p.date).collect();
        assert_eq!(dates, expected_dates);
        assert!(result.predictions.iter().all(|p| p.prediction == 0));
    }

    #[test]
    fn test_probability_at_threshold_is_negative() {
        let config = WalkForwardConfig {
            min_train_size: 5,
            step: 3,
            threshold: 0.5,
        };
        let mut model = Recorder::new(0.5);
        let result = WalkForwardEvaluator::new(config)
            .run(&dataset(8), &mut model, &predictors())
            .unwrap();
        assert!(result.predictions.iter().all(|p| p.prediction == 0));
    }

    #[test]
    fn test_uses_selected_predictors_only() {
        let config = WalkForwardConfig {
            min_train_size: 5,
            step: 5,
            threshold: 0.5,
        };
        let mut model = Recorder::new(0.9);
        let result = WalkForwardEvaluator::new(config)
            .run(&dataset(10), &mut model, &["index"])
            .unwrap();
        assert_eq!(result.predictors, vec!["index"]);

        let err = WalkForwardEvaluator::default()
            .run(&dataset(1010), &mut Recorder::new(0.5), &["missing"])
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Dataset(_)));
    }

    #[test]
    fn test_invalid_inputs_fail_fast() {
        let empty = Dataset::new(vec!["index".to_string()], vec![]).unwrap();
        assert!(matches!(
            WalkForwardEvaluator::default().run(&empty, &mut Recorder::new(0.5), &["index"]),
            Err(EvaluationError::EmptyDataset)
        ));

        assert!(matches!(
            WalkForwardEvaluator::default().run(&dataset(1000), &mut Recorder::new(0.5), &predictors()),
            Err(EvaluationError::InsufficientData { len: 1000, required: 1000 })
        ));

        let zero_step = WalkForwardConfig {
            step: 0,
            ..Default::default()
        };
        assert!(matches!(
            WalkForwardEvaluator::new(zero_step).run(&dataset(1010), &mut Recorder::new(0.5), &predictors()),
            Err(EvaluationError::InvalidParameter { .. })
        ));

        let bad_threshold = WalkForwardConfig {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(bad_threshold.validate().is_err());
    }

    #[test]
    fn test_classifier_errors_propagate() {
        let err = WalkForwardEvaluator::default()
            .run(&dataset(1010), &mut Failing, &predictors())
            .unwrap_err();
        assert!(matches!(err, EvaluationError::Model { offset: 1000, .. }));

        let err = WalkForwardEvaluator::default()
            .run(&dataset(1010), &mut ShortAnswer, &predictors())
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::PredictionCountMismatch { expected: 10, actual: 1 }
        ));
    }

    #[test]
    fn test_step_larger_than_remaining_rows() {
        let config = WalkForwardConfig {
            min_train_size: 5,
            step: usize::MAX,
            threshold: 0.5,
        };
        let mut model = Recorder::new(0.9);
        let result = WalkForwardEvaluator::new(config.clone())
            .run(&dataset(8), &mut model, &predictors())
            .unwrap();

        assert_eq!(result.iterations, 1);
        assert_eq!(result.predictions.len(), 3);
        assert_eq!(model.windows, vec![(5, 4.0)]);
        assert_eq!(config.expected_iterations(8), 1);
    }

    #[test]
    fn test_expected_iterations() {
        let config = WalkForwardConfig::default();
        assert_eq!(config.expected_iterations(1010), 1);
        assert_eq!(config.expected_iterations(1005), 1);
        assert_eq!(config.expected_iterations(1011), 2);
        assert_eq!(config.expected_iterations(999), 0);
    }
}
