//! Ordered, immutable table of daily observations.
//!
//! A `Dataset` is the only input the evaluators accept. Construction checks
//! the ordering and shape invariants once so that the backtest loop can slice
//! by position without re-validating.

use crate::domain::errors::DatasetError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::ops::Range;

/// One trading day: ground-truth close, direction label and the
/// previous-day predictors used to forecast it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub actual_close: f64,
    /// 1 if the close rose relative to the predictor day, else 0
    pub target: u8,
    pub features: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    feature_names: Vec<String>,
    observations: Vec<Observation>,
}

impl Dataset {
    /// Builds a dataset, rejecting repeated column names and rows that break
    /// date ordering or carry the wrong number of (finite) values.
    pub fn new(
        feature_names: Vec<String>,
        observations: Vec<Observation>,
    ) -> Result<Self, DatasetError> {
        let mut seen = HashSet::with_capacity(feature_names.len());
        if let Some(name) = feature_names.iter().find(|n| !seen.insert(n.as_str())) {
            return Err(DatasetError::DuplicateFeature { name: name.clone() });
        }

        let width = feature_names.len();
        let mut previous: Option<NaiveDate> = None;

        for obs in &observations {
            if !obs.actual_close.is_finite() {
                return Err(DatasetError::NonFiniteFeature {
                    date: obs.date,
                    feature: "actual_close".to_string(),
                });
            }

            if let Some(prev) = previous {
                match obs.date.cmp(&prev) {
                    Ordering::Greater => {}
                    Ordering::Equal => return Err(DatasetError::DuplicateDate { date: obs.date }),
                    Ordering::Less => {
                        return Err(DatasetError::UnorderedDates {
                            previous: prev,
                            current: obs.date,
                        });
                    }
                }
            }
            previous = Some(obs.date);

            if obs.features.len() != width {
                return Err(DatasetError::FeatureWidthMismatch {
                    date: obs.date,
                    expected: width,
                    actual: obs.features.len(),
                });
            }

            if obs.target > 1 {
                return Err(DatasetError::InvalidTarget {
                    date: obs.date,
                    label: obs.target,
                });
            }

            if let Some(idx) = obs.features.iter().position(|v| !v.is_finite()) {
                return Err(DatasetError::NonFiniteFeature {
                    date: obs.date,
                    feature: feature_names[idx].clone(),
                });
            }
        }

        Ok(Self {
            feature_names,
            observations,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn feature_index(&self, name: &str) -> Result<usize, DatasetError> {
        self.feature_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| DatasetError::UnknownFeature {
                name: name.to_string(),
            })
    }

    /// Projects the dataset onto `columns`, in the given order.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Dataset, DatasetError> {
        let indices = columns
            .iter()
            .map(|c| self.feature_index(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let observations = self
            .observations
            .iter()
            .map(|obs| Observation {
                date: obs.date,
                actual_close: obs.actual_close,
                target: obs.target,
                features: indices.iter().map(|&i| obs.features[i]).collect(),
            })
            .collect();

        Ok(Dataset {
            feature_names: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            observations,
        })
    }

    pub fn slice(&self, range: Range<usize>) -> Result<&[Observation], DatasetError> {
        if range.start > range.end || range.end > self.observations.len() {
            return Err(DatasetError::OutOfBounds {
                start: range.start,
                end: range.end,
                len: self.observations.len(),
            });
        }
        Ok(&self.observations[range])
    }

    /// Row-major feature matrix for the given positional range.
    pub fn feature_matrix(&self, range: Range<usize>) -> Result<Vec<Vec<f64>>, DatasetError> {
        Ok(self
            .slice(range)?
            .iter()
            .map(|obs| obs.features.clone())
            .collect())
    }

    pub fn labels(&self, range: Range<usize>) -> Result<Vec<u8>, DatasetError> {
        Ok(self.slice(range)?.iter().map(|obs| obs.target).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(day: u32, target: u8, features: Vec<f64>) -> Observation {
        Observation {
            date: NaiveDate::from_ymd_opt(2022, 1, day).unwrap(),
            actual_close: 100.0 + day as f64,
            target,
            features,
        }
    }

    fn names() -> Vec<String> {
        vec!["Close".to_string(), "Volume".to_string()]
    }

    #[test]
    fn test_rejects_duplicate_dates() {
        let rows = vec![obs(3, 1, vec![1.0, 2.0]), obs(3, 0, vec![1.0, 2.0])];
        let err = Dataset::new(names(), rows).unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateDate { .. }));
    }

    #[test]
    fn test_rejects_descending_dates() {
        let rows = vec![obs(4, 1, vec![1.0, 2.0]), obs(3, 0, vec![1.0, 2.0])];
        let err = Dataset::new(names(), rows).unwrap_err();
        assert!(matches!(err, DatasetError::UnorderedDates { .. }));
    }

    #[test]
    fn test_rejects_wrong_width_and_nan() {
        let rows = vec![obs(3, 1, vec![1.0])];
        assert!(matches!(
            Dataset::new(names(), rows).unwrap_err(),
            DatasetError::FeatureWidthMismatch { expected: 2, actual: 1, .. }
        ));

        let rows = vec![obs(3, 1, vec![1.0, f64::NAN])];
        assert_eq!(
            Dataset::new(names(), rows).unwrap_err(),
            DatasetError::NonFiniteFeature {
                date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                feature: "Volume".to_string(),
            }
        );
    }

    #[test]
    fn test_select_reorders_columns() {
        let rows = vec![obs(3, 1, vec![1.0, 2.0]), obs(4, 0, vec![3.0, 4.0])];
        let ds = Dataset::new(names(), rows).unwrap();

        let projected = ds.select(&["Volume", "Close"]).unwrap();
        assert_eq!(projected.feature_names(), &["Volume", "Close"]);
        assert_eq!(projected.observations()[1].features, vec![4.0, 3.0]);

        assert!(ds.select(&["Open"]).is_err());
    }

    #[test]
    fn test_positional_slicing() {
        let rows = (1..=5).map(|d| obs(d, (d % 2) as u8, vec![d as f64, 0.0])).collect();
        let ds = Dataset::new(names(), rows).unwrap();

        assert_eq!(ds.labels(1..3).unwrap(), vec![0, 1]);
        assert_eq!(ds.feature_matrix(4..5).unwrap(), vec![vec![5.0, 0.0]]);
        assert!(ds.slice(3..6).is_err());
        assert_eq!(ds.slice(2..5).unwrap().len(), 3);
    }

    #[test]
    fn test_rejects_non_finite_close() {
        let mut row = obs(3, 0, vec![1.0, 2.0]);
        row.actual_close = f64::NAN;
        assert_eq!(
            Dataset::new(names(), vec![row]).unwrap_err(),
            DatasetError::NonFiniteFeature {
                date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
                feature: "actual_close".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_duplicate_feature_names() {
        let columns = vec![
            "Close".to_string(),
            "weekly_mean".to_string(),
            "weekly_mean".to_string(),
        ];
        let err = Dataset::new(columns, vec![obs(3, 1, vec![1.0, 2.0, 3.0])]).unwrap_err();
        assert_eq!(
            err,
            DatasetError::DuplicateFeature {
                name: "weekly_mean".to_string()
            }
        );

        // Checked even before any row is seen
        let columns = vec!["Close".to_string(), "Close".to_string()];
        assert!(Dataset::new(columns, Vec::new()).is_err());
    }
}
