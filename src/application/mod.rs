// Walk-forward and holdout evaluation
pub mod backtest;

// Feature engineering and classifiers
pub mod ml;
