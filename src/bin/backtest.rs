//! Walk-forward backtest of a next-day direction classifier.
//!
//! # Usage
//! ```sh
//! cargo run --bin backtest -- walk-forward --input data/prices.csv --output data/predictions.csv
//! cargo run --bin backtest -- holdout --input data/prices.csv --thresholds 0.5,0.55,0.6
//! ```
//!
//! Parameters come from environment variables (see `BacktestConfig::from_env`),
//! an optional TOML file (`--config`), then command-line flags.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rustpredict::application::backtest::reporting::{BacktestReporter, RunSummary};
use rustpredict::application::backtest::{HoldoutEvaluator, WalkForwardEvaluator};
use rustpredict::application::ml::{FeatureBuilder, RandomForestClassifier};
use rustpredict::config::{BacktestConfig, BacktestConfigFile};
use rustpredict::domain::ml::Dataset;
use rustpredict::domain::ml::feature_registry::parse_predictor_list;
use rustpredict::domain::performance::ClassificationMetrics;
use rustpredict::infrastructure::persistence::{PriceCsvLoader, write_predictions};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Next-day direction backtester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Expanding-window walk-forward evaluation
    WalkForward {
        #[command(flatten)]
        common: CommonArgs,

        /// Path to the predictions CSV (Date,Target,Predictions)
        #[arg(short, long, default_value = "data/predictions.csv")]
        output: PathBuf,

        /// Optional JSON summary of the run
        #[arg(long)]
        report: Option<PathBuf>,

        /// Rows used as the initial training window
        #[arg(long)]
        min_train_size: Option<usize>,

        /// Rows predicted per iteration
        #[arg(long)]
        step: Option<usize>,
    },
    /// Single train/test split on the most recent rows
    Holdout {
        #[command(flatten)]
        common: CommonArgs,

        /// Number of most recent rows held out for testing
        #[arg(long)]
        test_size: Option<usize>,

        /// Comma separated thresholds to compare (e.g. 0.5,0.55,0.6)
        #[arg(long, conflicts_with = "output")]
        thresholds: Option<String>,

        /// Optional predictions CSV for the configured threshold
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Daily price CSV (Date,Open,High,Low,Close,Volume[,indicators...])
    #[arg(short, long, default_value = "data/prices.csv")]
    input: PathBuf,

    /// TOML file with backtest parameters
    #[arg(long)]
    config: Option<PathBuf>,

    /// Probability above which a day is predicted up
    #[arg(long)]
    threshold: Option<f64>,

    /// Number of trees in the random forest
    #[arg(long)]
    n_trees: Option<usize>,

    /// Minimum samples required to split an internal node
    #[arg(long)]
    min_split: Option<usize>,

    /// Maximum depth of trees
    #[arg(long)]
    max_depth: Option<u16>,

    /// Random seed for bootstrap and feature sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Comma separated predictor columns (default: all)
    #[arg(long)]
    predictors: Option<String>,

    /// Only use the raw previous-day OHLCV (+ indicator) columns
    #[arg(long)]
    no_derived: bool,
}

impl CommonArgs {
    fn resolve(&self) -> Result<BacktestConfig> {
        let mut config = BacktestConfig::from_env();
        if let Some(path) = &self.config {
            info!("Loading backtest config from: {:?}", path);
            config = config.merge_file(BacktestConfigFile::load(path)?);
        }

        if let Some(v) = self.threshold {
            config.threshold = v;
        }
        if let Some(v) = self.n_trees {
            config.n_trees = v;
        }
        if let Some(v) = self.min_split {
            config.min_samples_split = v;
        }
        if self.max_depth.is_some() {
            config.max_depth = self.max_depth;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        if let Some(raw) = &self.predictors {
            config.predictors = Some(parse_predictor_list(raw));
        }
        if self.no_derived {
            config.use_derived_features = false;
        }
        Ok(config)
    }
}

fn load_dataset(input: &Path, config: &BacktestConfig) -> Result<(Dataset, Vec<String>)> {
    let history = PriceCsvLoader::load(input)?;
    let dataset = FeatureBuilder::new(config.feature_spec())
        .build(&history)
        .context("Failed to build dataset")?;
    let predictors = config
        .predictors
        .clone()
        .unwrap_or_else(|| dataset.feature_names().to_vec());
    Ok((dataset, predictors))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let reporter = BacktestReporter;

    match cli.command {
        Commands::WalkForward {
            common,
            output,
            report,
            min_train_size,
            step,
        } => {
            let mut config = common.resolve()?;
            if let Some(v) = min_train_size {
                config.min_train_size = v;
            }
            if let Some(v) = step {
                config.step = v;
            }
            config.validate()?;

            let (dataset, predictors) = load_dataset(&common.input, &config)?;
            reporter.print_header("WALK-FORWARD BACKTEST", &common.input, dataset.len(), &predictors);

            let mut model = RandomForestClassifier::new(config.forest());
            let result = WalkForwardEvaluator::new(config.walk_forward())
                .run(&dataset, &mut model, &predictors)?;

            write_predictions(&output, &result.predictions)?;
            reporter.print_metrics(&result.metrics());

            if let Some(path) = report {
                reporter.export_json(&RunSummary::from_result(&result), &path)?;
            }
            println!("✅ Walk-forward complete! Predictions written to {}\n", output.display());
        }
        Commands::Holdout {
            common,
            test_size,
            thresholds,
            output,
        } => {
            let mut config = common.resolve()?;
            if let Some(v) = test_size {
                config.holdout_size = v;
            }
            config.validate()?;

            let (dataset, predictors) = load_dataset(&common.input, &config)?;
            reporter.print_header("HOLDOUT EVALUATION", &common.input, dataset.len(), &predictors);

            let evaluator = HoldoutEvaluator::new(config.holdout());
            let mut model = RandomForestClassifier::new(config.forest());

            match thresholds {
                Some(raw) => {
                    let values = raw
                        .split(',')
                        .map(|s| s.trim().parse::<f64>())
                        .collect::<Result<Vec<_>, _>>()
                        .context(format!("Invalid threshold list: {}", raw))?;
                    let sweep = evaluator.sweep(&dataset, &mut model, &predictors, &values)?;
                    let rows: Vec<_> = sweep
                        .iter()
                        .map(|(t, records)| (*t, ClassificationMetrics::calculate(records)))
                        .collect();
                    reporter.print_threshold_table(&rows);
                }
                None => {
                    let records = evaluator.run(&dataset, &mut model, &predictors)?;
                    reporter.print_metrics(&ClassificationMetrics::calculate(&records));
                    if let Some(path) = output {
                        write_predictions(&path, &records)?;
                    }
                }
            }
        }
    }

    Ok(())
}
