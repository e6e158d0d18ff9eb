use crate::domain::errors::DatasetError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily bar as read from the input file.
///
/// `indicators` follows the column order of `PriceHistory::indicator_names`;
/// `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub indicators: Vec<Option<f64>>,
}

/// Daily bars sorted by date, plus the names of any precomputed
/// indicator columns carried alongside OHLCV.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    indicator_names: Vec<String>,
    bars: Vec<PriceBar>,
}

impl PriceHistory {
    pub fn new(indicator_names: Vec<String>, bars: Vec<PriceBar>) -> Result<Self, DatasetError> {
        for pair in bars.windows(2) {
            if pair[1].date == pair[0].date {
                return Err(DatasetError::DuplicateDate { date: pair[1].date });
            }
            if pair[1].date < pair[0].date {
                return Err(DatasetError::UnorderedDates {
                    previous: pair[0].date,
                    current: pair[1].date,
                });
            }
        }

        if let Some(bar) = bars
            .iter()
            .find(|b| b.indicators.len() != indicator_names.len())
        {
            return Err(DatasetError::FeatureWidthMismatch {
                date: bar.date,
                expected: indicator_names.len(),
                actual: bar.indicators.len(),
            });
        }

        Ok(Self {
            indicator_names,
            bars,
        })
    }

    pub fn indicator_names(&self) -> &[String] {
        &self.indicator_names
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }
}
