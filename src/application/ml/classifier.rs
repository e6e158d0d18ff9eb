use crate::domain::errors::ModelError;

/// Interface for trainable binary classifiers
///
/// The evaluators only see this trait, so any model that can be refit on a
/// growing window and score new rows can be backtested.
pub trait Classifier {
    /// Train (or retrain from scratch) on row-major `features` and 0/1 `labels`
    fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), ModelError>;

    /// Probability of class 1 (price up) for each row, in input order
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>, ModelError>;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Shared shape checks for `fit` implementations.
pub fn validate_training_input(features: &[Vec<f64>], labels: &[u8]) -> Result<(), ModelError> {
    if features.is_empty() {
        return Err(ModelError::InvalidInput {
            reason: "no training rows".to_string(),
        });
    }
    if features.len() != labels.len() {
        return Err(ModelError::InvalidInput {
            reason: format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            ),
        });
    }
    let width = features[0].len();
    if width == 0 {
        return Err(ModelError::InvalidInput {
            reason: "rows have no features".to_string(),
        });
    }
    if let Some(row) = features.iter().position(|r| r.len() != width) {
        return Err(ModelError::InvalidInput {
            reason: format!("row {} has {} features, expected {}", row, features[row].len(), width),
        });
    }
    if let Some(label) = labels.iter().find(|&&l| l > 1) {
        return Err(ModelError::InvalidInput {
            reason: format!("label {} is not binary", label),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_training_input() {
        let x = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(validate_training_input(&x, &[0, 1]).is_ok());
        assert!(validate_training_input(&x, &[0]).is_err());
        assert!(validate_training_input(&x, &[0, 2]).is_err());
        assert!(validate_training_input(&[], &[]).is_err());
        assert!(validate_training_input(&[vec![1.0], vec![1.0, 2.0]], &[0, 1]).is_err());
    }
}
