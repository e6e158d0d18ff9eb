//! Daily OHLCV + indicator CSV loader.
//!
//! Required columns (case-insensitive): Date, Open, High, Low, Close, Volume.
//! Adjusted close and corporate-action columns are ignored; every other named
//! column is treated as a precomputed numeric indicator.

use crate::domain::market::price_history::{PriceBar, PriceHistory};
use anyhow::{Context, Result, anyhow, bail};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::info;

const IGNORED_COLUMNS: &[&str] = &["adj close", "adj_close", "dividends", "stock splits"];

struct Layout {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    indicators: Vec<(usize, String)>,
}

impl Layout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| anyhow!("Missing required column: {}", name))
        };

        let mut layout = Self {
            date: find("date")?,
            open: find("open")?,
            high: find("high")?,
            low: find("low")?,
            close: find("close")?,
            volume: find("volume")?,
            indicators: Vec::new(),
        };

        let reserved = [
            layout.date,
            layout.open,
            layout.high,
            layout.low,
            layout.close,
            layout.volume,
        ];
        layout.indicators = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| !reserved.contains(i))
            .map(|(i, h)| (i, h.trim().to_string()))
            .filter(|(_, h)| {
                !h.is_empty() && !IGNORED_COLUMNS.contains(&h.to_ascii_lowercase().as_str())
            })
            .collect();

        Ok(layout)
    }
}

pub struct PriceCsvLoader;

impl PriceCsvLoader {
    pub fn load(path: &Path) -> Result<PriceHistory> {
        let file = File::open(path).context(format!("Failed to open price file: {:?}", path))?;
        let history = Self::from_reader(BufReader::new(file))
            .context(format!("Failed to load price file: {:?}", path))?;

        info!(
            "Loaded {} daily bars ({:?} to {:?}) with {} indicator columns from {:?}",
            history.len(),
            history.first_date(),
            history.last_date(),
            history.indicator_names().len(),
            path
        );
        Ok(history)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<PriceHistory> {
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let layout = Layout::from_headers(rdr.headers()?)?;

        let mut bars = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let row = line + 2;
            let field = |idx: usize| record.get(idx).unwrap_or("");
            let number = |idx: usize, name: &str| -> Result<f64> {
                let value = field(idx)
                    .parse::<f64>()
                    .context(format!("Row {}: invalid {} value {:?}", row, name, field(idx)))?;
                if !value.is_finite() {
                    bail!("Row {}: non-finite {} value {:?}", row, name, field(idx));
                }
                Ok(value)
            };

            let indicators = layout
                .indicators
                .iter()
                .map(|(idx, name)| {
                    parse_optional(field(*idx))
                        .context(format!("Row {}: invalid {} value {:?}", row, name, field(*idx)))
                })
                .collect::<Result<Vec<_>>>()?;

            bars.push(PriceBar {
                date: parse_date(field(layout.date)).context(format!("Row {}", row))?,
                open: number(layout.open, "Open")?,
                high: number(layout.high, "High")?,
                low: number(layout.low, "Low")?,
                close: number(layout.close, "Close")?,
                volume: number(layout.volume, "Volume")?,
                indicators,
            });
        }

        bars.sort_by_key(|b| b.date);
        let names = layout.indicators.into_iter().map(|(_, n)| n).collect();
        Ok(PriceHistory::new(names, bars)?)
    }
}

/// Accepts `YYYY-MM-DD` optionally followed by a time and zone.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let day = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").context(format!("Invalid date: {:?}", raw))
}

fn parse_optional(raw: &str) -> Result<Option<f64>> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value: f64 = raw.parse()?;
    if !value.is_finite() {
        bail!("non-finite value");
    }
    Ok(Some(value))
}
