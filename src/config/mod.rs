//! Configuration module for rustpredict.
//!
//! Run parameters are loaded from environment variables, optionally
//! overridden by a TOML file, and validated before any data is touched.

mod backtest_config;

pub use backtest_config::{BacktestConfig, BacktestConfigError, BacktestConfigFile};
