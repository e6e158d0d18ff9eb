//! Reporting utilities for backtest results.
//!
//! Provides formatted console output and JSON export capabilities.

use super::walk_forward::WalkForwardResult;
use crate::domain::performance::classification_metrics::ClassificationMetrics;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

/// JSON summary of a walk-forward run, without the per-day records.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub model: &'a str,
    pub predictors: &'a [String],
    pub min_train_size: usize,
    pub step: usize,
    pub threshold: f64,
    pub iterations: usize,
    pub first_date: Option<String>,
    pub last_date: Option<String>,
    pub metrics: ClassificationMetrics,
}

impl<'a> RunSummary<'a> {
    pub fn from_result(result: &'a WalkForwardResult) -> Self {
        Self {
            model: &result.model,
            predictors: &result.predictors,
            min_train_size: result.config.min_train_size,
            step: result.config.step,
            threshold: result.config.threshold,
            iterations: result.iterations,
            first_date: result.predictions.first().map(|p| p.date.to_string()),
            last_date: result.predictions.last().map(|p| p.date.to_string()),
            metrics: result.metrics(),
        }
    }
}

/// Reporter for backtest results output.
#[derive(Default)]
pub struct BacktestReporter;

impl BacktestReporter {
    /// Prints the header banner for the run.
    pub fn print_header(&self, title: &str, input: &Path, rows: usize, predictors: &[String]) {
        println!("{}", "=".repeat(80));
        println!("📈 {}", title);
        println!("{}", "=".repeat(80));
        println!("Input:        {}", input.display());
        println!("Rows:         {}", rows);
        println!("Predictors:   {}", predictors.join(", "));
        println!("{}", "=".repeat(80));
    }

    /// Prints the confusion matrix and headline scores.
    pub fn print_metrics(&self, metrics: &ClassificationMetrics) {
        println!("\n📊 Prediction Scores (n={}):", metrics.total);
        println!("  Precision:        {:.4}", metrics.precision);
        println!("  Accuracy:         {:.4}", metrics.accuracy);
        println!(
            "  Baseline (up %):  {:.4}  (edge {:+.4})",
            metrics.baseline_precision,
            metrics.edge_over_baseline()
        );

        println!("\n  Predictions:");
        println!(
            "    Up:    {:>7} ({:.1}%)",
            metrics.predicted_positive,
            pct(metrics.predicted_positive, metrics.total)
        );
        println!(
            "    Down:  {:>7} ({:.1}%)",
            metrics.predicted_negative,
            pct(metrics.predicted_negative, metrics.total)
        );

        println!("\n  Confusion Matrix:");
        println!("    {:<14} {:>9} {:>9}", "", "Actual Up", "Actual Dn");
        println!(
            "    {:<14} {:>9} {:>9}",
            "Predicted Up", metrics.true_positives, metrics.false_positives
        );
        println!(
            "    {:<14} {:>9} {:>9}",
            "Predicted Dn", metrics.false_negatives, metrics.true_negatives
        );
        println!("{}\n", "=".repeat(80));
    }

    /// Prints one line per threshold of a holdout sweep.
    pub fn print_threshold_table(&self, rows: &[(f64, ClassificationMetrics)]) {
        println!(
            "\n{:>9} | {:>9} | {:>9} | {:>7}",
            "Threshold", "Precision", "Accuracy", "Up"
        );
        println!("{}", "-".repeat(44));
        for (threshold, m) in rows {
            println!(
                "{:>9.2} | {:>9.4} | {:>9.4} | {:>7}",
                threshold, m.precision, m.accuracy, m.predicted_positive
            );
        }
        println!();
    }

    /// Exports a run summary to a JSON file.
    pub fn export_json(&self, summary: &RunSummary<'_>, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }

        let json_output =
            serde_json::to_string_pretty(summary).context("Failed to serialize summary to JSON")?;

        std::fs::write(path, json_output)
            .context(format!("Failed to write summary to {}", path.display()))?;

        println!("💾 Summary saved to: {}", path.display());
        Ok(())
    }
}

fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::backtest::walk_forward::WalkForwardConfig;
    use crate::domain::ml::PredictionRecord;
    use chrono::NaiveDate;

    #[test]
    fn test_summary_json_export() {
        let result = WalkForwardResult {
            model: "Stub".to_string(),
            config: WalkForwardConfig::default(),
            predictors: vec!["Close".to_string()],
            iterations: 1,
            predictions: vec![PredictionRecord {
                date: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
                target: 1,
                prediction: 1,
            }],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("summary.json");
        BacktestReporter
            .export_json(&RunSummary::from_result(&result), &path)
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["model"], "Stub");
        assert_eq!(value["iterations"], 1);
        assert_eq!(value["first_date"], "2024-02-01");
        assert_eq!(value["metrics"]["precision"], 1.0);
    }

    #[test]
    fn test_pct_handles_zero_total() {
        assert_eq!(pct(3, 0), 0.0);
        assert_eq!(pct(1, 4), 25.0);
    }
}
