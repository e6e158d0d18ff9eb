use super::walk_forward::{invalid, model_error};
use crate::application::ml::classifier::Classifier;
use crate::domain::errors::EvaluationError;
use crate::domain::ml::{Dataset, PredictionRecord, binarize};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Single chronological split: train on everything except the last
/// `test_size` rows, score those rows once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutConfig {
    pub test_size: usize,
    pub threshold: f64,
}

impl Default for HoldoutConfig {
    fn default() -> Self {
        Self {
            test_size: 100,
            threshold: 0.5,
        }
    }
}

pub struct HoldoutEvaluator {
    config: HoldoutConfig,
}

impl HoldoutEvaluator {
    pub fn new(config: HoldoutConfig) -> Self {
        Self { config }
    }

    pub fn run<C, S>(
        &self,
        dataset: &Dataset,
        classifier: &mut C,
        predictors: &[S],
    ) -> Result<Vec<PredictionRecord>, EvaluationError>
    where
        C: Classifier + ?Sized,
        S: AsRef<str>,
    {
        let probabilities = self.probabilities(dataset, classifier, predictors)?;
        Ok(self.label(dataset, &probabilities, self.config.threshold))
    }

    /// Fits once and binarizes the same holdout probabilities at every
    /// threshold, for quick threshold tuning.
    pub fn sweep<C, S>(
        &self,
        dataset: &Dataset,
        classifier: &mut C,
        predictors: &[S],
        thresholds: &[f64],
    ) -> Result<Vec<(f64, Vec<PredictionRecord>)>, EvaluationError>
    where
        C: Classifier + ?Sized,
        S: AsRef<str>,
    {
        if let Some(t) = thresholds.iter().find(|t| !(0.0..=1.0).contains(*t)) {
            return Err(invalid("threshold", t));
        }
        let probabilities = self.probabilities(dataset, classifier, predictors)?;
        Ok(thresholds
            .iter()
            .map(|&t| (t, self.label(dataset, &probabilities, t)))
            .collect())
    }

    fn probabilities<C, S>(
        &self,
        dataset: &Dataset,
        classifier: &mut C,
        predictors: &[S],
    ) -> Result<Vec<f64>, EvaluationError>
    where
        C: Classifier + ?Sized,
        S: AsRef<str>,
    {
        if dataset.is_empty() {
            return Err(EvaluationError::EmptyDataset);
        }
        if self.config.test_size == 0 {
            return Err(invalid("test_size", self.config.test_size));
        }
        if !(0.0..=1.0).contains(&self.config.threshold) {
            return Err(invalid("threshold", self.config.threshold));
        }

        let data = dataset.select(predictors)?;
        let n = data.len();
        if n <= self.config.test_size {
            return Err(EvaluationError::InsufficientData {
                len: n,
                required: self.config.test_size,
            });
        }
        let split = n - self.config.test_size;

        info!(
            "Holdout: training {} on {} rows, testing last {}",
            classifier.name(),
            split,
            self.config.test_size
        );

        classifier
            .fit(&data.feature_matrix(0..split)?, &data.labels(0..split)?)
            .map_err(|source| model_error(classifier.name(), split, source))?;
        let probabilities = classifier
            .predict_proba(&data.feature_matrix(split..n)?)
            .map_err(|source| model_error(classifier.name(), split, source))?;

        if probabilities.len() != n - split {
            return Err(EvaluationError::PredictionCountMismatch {
                expected: n - split,
                actual: probabilities.len(),
            });
        }
        Ok(probabilities)
    }

    fn label(&self, dataset: &Dataset, probabilities: &[f64], threshold: f64) -> Vec<PredictionRecord> {
        let start = dataset.len() - probabilities.len();
        dataset.observations()[start..]
            .iter()
            .zip(probabilities)
            .map(|(obs, &p)| PredictionRecord {
                date: obs.date,
                target: obs.target,
                prediction: binarize(p, threshold),
            })
            .collect()
    }
}

impl Default for HoldoutEvaluator {
    fn default() -> Self {
        Self::new(HoldoutConfig::default())
    }
}
