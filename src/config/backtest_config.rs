//! Backtest configuration parsing from environment variables and TOML files.
//!
//! Precedence is CLI flags > TOML file > environment > defaults; the binary
//! applies the CLI layer on top of what this module produces.

use crate::application::backtest::{HoldoutConfig, WalkForwardConfig};
use crate::application::ml::feature_builder::FeatureSpec;
use crate::application::ml::random_forest::RandomForestParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use thiserror::Error;

/// Error type for BacktestConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum BacktestConfigError {
    #[error("Invalid size: {field} = {value}. Must be > 0")]
    InvalidSize { field: String, value: usize },

    #[error("Invalid threshold: {value}. Must be within [0, 1]")]
    InvalidThreshold { value: f64 },

    #[error("Invalid max_depth: 0")]
    InvalidDepth,

    #[error("Empty predictor list")]
    EmptyPredictors,
}

/// Backtest configuration value object
///
/// # Invariants
///
/// - `min_train_size`, `step`, `holdout_size`, `n_trees`, `min_samples_split` > 0
/// - `threshold` within [0, 1]
/// - `predictors`, when set, is not empty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    // Walk-forward
    pub min_train_size: usize,
    pub step: usize,
    pub threshold: f64,

    // Holdout
    pub holdout_size: usize,

    // Random forest
    pub n_trees: usize,
    pub min_samples_split: usize,
    pub max_depth: Option<u16>,
    pub max_features: Option<usize>,
    pub seed: u64,

    // Features
    pub use_derived_features: bool,
    /// Subset of dataset columns to train on; `None` uses every column
    pub predictors: Option<Vec<String>>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        let walk_forward = WalkForwardConfig::default();
        let forest = RandomForestParams::default();
        Self {
            min_train_size: walk_forward.min_train_size,
            step: walk_forward.step,
            threshold: walk_forward.threshold,
            holdout_size: HoldoutConfig::default().test_size,
            n_trees: forest.n_trees,
            min_samples_split: forest.min_samples_split,
            max_depth: forest.max_depth,
            max_features: forest.max_features,
            seed: forest.seed,
            use_derived_features: true,
            predictors: None,
        }
    }
}

/// Partial configuration as found in a TOML file; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BacktestConfigFile {
    pub min_train_size: Option<usize>,
    pub step: Option<usize>,
    pub threshold: Option<f64>,
    pub holdout_size: Option<usize>,
    pub n_trees: Option<usize>,
    pub min_samples_split: Option<usize>,
    pub max_depth: Option<u16>,
    pub max_features: Option<usize>,
    pub seed: Option<u64>,
    pub use_derived_features: Option<bool>,
    pub predictors: Option<Vec<String>>,
}

impl BacktestConfigFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read backtest config file: {:?}", path))?;
        toml::from_str(&content)
            .context(format!("Failed to parse backtest config TOML: {:?}", path))
    }
}

impl BacktestConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Reads settings through `lookup`; unset or unparsable values keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            min_train_size: get("MIN_TRAIN_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_train_size),
            step: get("STEP_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.step),
            threshold: get("PROBABILITY_THRESHOLD")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.threshold),
            holdout_size: get("HOLDOUT_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.holdout_size),
            n_trees: get("N_TREES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.n_trees),
            min_samples_split: get("MIN_SAMPLES_SPLIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.min_samples_split),
            max_depth: get("MAX_DEPTH").and_then(|v| v.parse().ok()),
            max_features: get("MAX_FEATURES").and_then(|v| v.parse().ok()),
            seed: get("RANDOM_SEED")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.seed),
            use_derived_features: get("USE_DERIVED_FEATURES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.use_derived_features),
            predictors: get("PREDICTORS")
                .map(|v| crate::domain::ml::feature_registry::parse_predictor_list(&v)),
        }
    }

    /// Overlays every key present in `file`.
    pub fn merge_file(mut self, file: BacktestConfigFile) -> Self {
        if let Some(v) = file.min_train_size {
            self.min_train_size = v;
        }
        if let Some(v) = file.step {
            self.step = v;
        }
        if let Some(v) = file.threshold {
            self.threshold = v;
        }
        if let Some(v) = file.holdout_size {
            self.holdout_size = v;
        }
        if let Some(v) = file.n_trees {
            self.n_trees = v;
        }
        if let Some(v) = file.min_samples_split {
            self.min_samples_split = v;
        }
        if file.max_depth.is_some() {
            self.max_depth = file.max_depth;
        }
        if file.max_features.is_some() {
            self.max_features = file.max_features;
        }
        if let Some(v) = file.seed {
            self.seed = v;
        }
        if let Some(v) = file.use_derived_features {
            self.use_derived_features = v;
        }
        if file.predictors.is_some() {
            self.predictors = file.predictors;
        }
        self
    }

    pub fn validate(&self) -> Result<(), BacktestConfigError> {
        let sizes = [
            ("min_train_size", self.min_train_size),
            ("step", self.step),
            ("holdout_size", self.holdout_size),
            ("n_trees", self.n_trees),
            ("min_samples_split", self.min_samples_split),
        ];
        if let Some((field, value)) = sizes.iter().find(|(_, v)| *v == 0) {
            return Err(BacktestConfigError::InvalidSize {
                field: field.to_string(),
                value: *value,
            });
        }
        if self.max_features == Some(0) {
            return Err(BacktestConfigError::InvalidSize {
                field: "max_features".to_string(),
                value: 0,
            });
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(BacktestConfigError::InvalidThreshold {
                value: self.threshold,
            });
        }
        if self.max_depth == Some(0) {
            return Err(BacktestConfigError::InvalidDepth);
        }
        if self.predictors.as_ref().is_some_and(|p| p.is_empty()) {
            return Err(BacktestConfigError::EmptyPredictors);
        }
        Ok(())
    }

    pub fn walk_forward(&self) -> WalkForwardConfig {
        WalkForwardConfig {
            min_train_size: self.min_train_size,
            step: self.step,
            threshold: self.threshold,
        }
    }

    pub fn holdout(&self) -> HoldoutConfig {
        HoldoutConfig {
            test_size: self.holdout_size,
            threshold: self.threshold,
        }
    }

    pub fn forest(&self) -> RandomForestParams {
        RandomForestParams::default()
            .with_n_trees(self.n_trees)
            .with_min_samples_split(self.min_samples_split)
            .with_max_depth(self.max_depth)
            .with_max_features(self.max_features)
            .with_seed(self.seed)
    }

    pub fn feature_spec(&self) -> FeatureSpec {
        FeatureSpec {
            use_derived: self.use_derived_features,
            ..Default::default()
        }
    }
}
