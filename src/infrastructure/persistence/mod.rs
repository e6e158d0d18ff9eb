pub mod prediction_csv;
pub mod price_csv;

pub use prediction_csv::{read_predictions, write_predictions};
pub use price_csv::PriceCsvLoader;
