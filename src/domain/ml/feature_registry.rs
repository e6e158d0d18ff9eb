/// Raw previous-day columns used as predictors.
/// Order here is the column order of the default dataset.
pub const BASE_PREDICTORS: &[&str] = &["Close", "Volume", "Open", "High", "Low"];

/// Rolling-ratio predictors appended when derived features are enabled.
pub const DERIVED_PREDICTORS: &[&str] = &[
    "weekly_mean",
    "quarterly_mean",
    "annual_mean",
    "annual_weekly_mean",
    "annual_quarterly_mean",
    "weekly_trend",
    "open_close_ratio",
    "high_close_ratio",
    "low_close_ratio",
];

/// Full predictor list for a dataset: base columns, optional derived
/// columns, then any precomputed indicator columns from the input file.
pub fn predictor_names(use_derived: bool, indicator_names: &[String]) -> Vec<String> {
    let mut names: Vec<String> = BASE_PREDICTORS.iter().map(|s| s.to_string()).collect();
    if use_derived {
        names.extend(DERIVED_PREDICTORS.iter().map(|s| s.to_string()));
    }
    names.extend(indicator_names.iter().cloned());
    names
}

/// Splits a comma separated list of column names, dropping blanks.
pub fn parse_predictor_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}
