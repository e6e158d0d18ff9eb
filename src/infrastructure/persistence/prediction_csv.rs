use crate::domain::ml::PredictionRecord;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Writes records as `Date,Target,Predictions`, replacing any existing file.
pub fn write_predictions(path: &Path, records: &[PredictionRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .context(format!("Failed to create directory: {:?}", parent))?;
    }

    let file = File::create(path).context(format!("Failed to create {:?}", path))?;
    let mut wtr = csv::WriterBuilder::new().has_headers(true).from_writer(file);
    for record in records {
        wtr.serialize(record)
            .context("Failed to serialize prediction record")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;

    info!("Wrote {} predictions to {:?}", records.len(), path);
    Ok(())
}

pub fn read_predictions(path: &Path) -> Result<Vec<PredictionRecord>> {
    let file = File::open(path).context(format!("Failed to open {:?}", path))?;
    let mut rdr = csv::Reader::from_reader(BufReader::new(file));

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: PredictionRecord = result.context(format!("Malformed row in {:?}", path))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_round_trip_preserves_order() {
        let start = NaiveDate::from_ymd_opt(2019, 7, 1).unwrap();
        let records: Vec<PredictionRecord> = (0..6)
            .map(|i| PredictionRecord {
                date: start + Duration::days(i),
                target: (i % 2) as u8,
                prediction: (i % 3 == 0) as u8,
            })
            .collect();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("predictions.csv");
        write_predictions(&path, &records).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("Date,Target,Predictions\n2019-07-01,0,1\n"));

        assert_eq!(read_predictions(&path).unwrap(), records);
    }

    #[test]
    fn test_read_rejects_non_binary_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Date,Target,Predictions\n2019-07-01,x,1\n").unwrap();
        assert!(read_predictions(&path).is_err());
    }
}
