//! Turns raw daily bars into a leakage-free `Dataset`.
//!
//! Every predictor is computed on the predictor day and then moved one row
//! forward, so the row for date `t` only ever sees information available at
//! the close of `t-1`. The label of row `t` is whether `close_t > close_{t-1}`.

use crate::domain::errors::DatasetError;
use crate::domain::market::price_history::{PriceBar, PriceHistory};
use crate::domain::ml::feature_registry::predictor_names;
use crate::domain::ml::{Dataset, Observation};
use serde::{Deserialize, Serialize};
use ta::Next;
use ta::indicators::SimpleMovingAverage;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Append rolling-ratio predictors after the base columns
    pub use_derived: bool,
    pub weekly_window: usize,
    pub quarterly_window: usize,
    pub annual_window: usize,
}

impl Default for FeatureSpec {
    fn default() -> Self {
        Self {
            use_derived: true,
            weekly_window: 7,
            quarterly_window: 90,
            annual_window: 365,
        }
    }
}

impl FeatureSpec {
    pub fn base_only() -> Self {
        Self {
            use_derived: false,
            ..Default::default()
        }
    }
}

pub struct FeatureBuilder {
    spec: FeatureSpec,
}

impl FeatureBuilder {
    pub fn new(spec: FeatureSpec) -> Self {
        Self { spec }
    }

    pub fn build(&self, history: &PriceHistory) -> Result<Dataset, DatasetError> {
        let bars = history.bars();
        let names = predictor_names(self.spec.use_derived, history.indicator_names());

        let indicators = forward_fill(bars, history.indicator_names().len());
        let up_days = up_days(bars);
        let derived = if self.spec.use_derived {
            Some(self.derived_columns(bars, &up_days)?)
        } else {
            None
        };

        let mut observations = Vec::with_capacity(bars.len().saturating_sub(1));
        let mut dropped = 0usize;

        for t in 1..bars.len() {
            let day = t - 1;
            let prev = &bars[day];

            let mut row: Vec<Option<f64>> = vec![
                Some(prev.close),
                Some(prev.volume),
                Some(prev.open),
                Some(prev.high),
                Some(prev.low),
            ];
            if let Some(columns) = &derived {
                row.extend(columns.iter().map(|col| col[day]));
            }
            row.extend(indicators[day].iter().copied());

            let features: Option<Vec<f64>> = row
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect();

            match features {
                Some(features) => observations.push(Observation {
                    date: bars[t].date,
                    actual_close: bars[t].close,
                    target: up_days[t].unwrap_or(0),
                    features,
                }),
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            warn!(
                "Dropped {} rows with undefined predictors (rolling warm-up or leading gaps)",
                dropped
            );
        }
        info!(
            "Built dataset: {} observations x {} predictors from {} bars",
            observations.len(),
            names.len(),
            bars.len()
        );

        Dataset::new(names, observations)
    }

    /// Derived predictors per calendar row, in `DERIVED_PREDICTORS` order.
    fn derived_columns(
        &self,
        bars: &[PriceBar],
        up_days: &[Option<u8>],
    ) -> Result<Vec<Vec<Option<f64>>>, DatasetError> {
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let weekly = rolling_mean(&closes, self.spec.weekly_window, "weekly_mean")?;
        let quarterly = rolling_mean(&closes, self.spec.quarterly_window, "quarterly_mean")?;
        let annual = rolling_mean(&closes, self.spec.annual_window, "annual_mean")?;
        let trend = rolling_mean_opt(up_days, self.spec.weekly_window, "weekly_trend")?;

        let ratio = |num: Option<f64>, den: Option<f64>| match (num, den) {
            (Some(n), Some(d)) if d != 0.0 => Some(n / d),
            _ => None,
        };

        let mut columns = vec![Vec::with_capacity(bars.len()); 9];
        for (i, bar) in bars.iter().enumerate() {
            let weekly_mean = ratio(weekly[i], Some(bar.close));
            let quarterly_mean = ratio(quarterly[i], Some(bar.close));
            let annual_mean = ratio(annual[i], Some(bar.close));

            columns[0].push(weekly_mean);
            columns[1].push(quarterly_mean);
            columns[2].push(annual_mean);
            columns[3].push(ratio(annual_mean, weekly_mean));
            columns[4].push(ratio(annual_mean, quarterly_mean));
            columns[5].push(trend[i]);
            columns[6].push(ratio(Some(bar.open), Some(bar.close)));
            columns[7].push(ratio(Some(bar.high), Some(bar.close)));
            columns[8].push(ratio(Some(bar.low), Some(bar.close)));
        }
        Ok(columns)
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new(FeatureSpec::default())
    }
}

/// Carries the last valid value of every indicator column forward.
/// Leading gaps stay `None`.
pub fn forward_fill(bars: &[PriceBar], width: usize) -> Vec<Vec<Option<f64>>> {
    let mut last: Vec<Option<f64>> = vec![None; width];
    bars.iter()
        .map(|bar| {
            for (slot, value) in last.iter_mut().zip(&bar.indicators) {
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    *slot = Some(v);
                }
            }
            last.clone()
        })
        .collect()
}

/// `Some(1)` when the close rose versus the previous row, `None` for row 0.
fn up_days(bars: &[PriceBar]) -> Vec<Option<u8>> {
    std::iter::once(None)
        .chain(
            bars.windows(2)
                .map(|w| Some(if w[1].close > w[0].close { 1 } else { 0 })),
        )
        .collect()
}

/// Simple moving average, undefined until `period` values have been seen.
pub fn rolling_mean(
    values: &[f64],
    period: usize,
    name: &str,
) -> Result<Vec<Option<f64>>, DatasetError> {
    let mut sma = SimpleMovingAverage::new(period).map_err(|_| DatasetError::InvalidWindow {
        name: name.to_string(),
        period,
    })?;
    Ok(values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let mean = sma.next(v);
            (i + 1 >= period).then_some(mean)
        })
        .collect())
}

/// Rolling mean over 0/1 flags; a window touching an undefined flag is
/// undefined.
fn rolling_mean_opt(
    flags: &[Option<u8>],
    period: usize,
    name: &str,
) -> Result<Vec<Option<f64>>, DatasetError> {
    let first_defined = flags.iter().position(Option::is_some).unwrap_or(flags.len());
    let values: Vec<f64> = flags
        .iter()
        .skip(first_defined)
        .map(|f| f.map(f64::from).unwrap_or(0.0))
        .collect();
    let means = rolling_mean(&values, period, name)?;
    Ok(std::iter::repeat_n(None, first_defined)
        .chain(means)
        .collect())
}
