//! Price file adapter: JSON series files with a CSV fallback.
//!
//! Files live at `<base>/<prefix>_<SYMBOL>.json` (intraday) and
//! `<base>/<prefix>_<SYMBOL>_daily.json` (daily). When the JSON file is
//! absent a `.csv` file with the same stem is read instead.

use crate::domain::asset::AssetClass;
use crate::domain::error::TraderError;
use crate::domain::ohlcv::{OhlcvBar, PriceGranularity};
use crate::ports::price_port::{PricePort, RawSeries};
use serde::Deserialize;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::debug;

pub struct PriceFileAdapter {
    base_path: PathBuf,
    asset: AssetClass,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default)]
    volume: Option<f64>,
}

impl PriceFileAdapter {
    pub fn new(base_path: PathBuf, asset: AssetClass) -> Self {
        Self { base_path, asset }
    }

    fn stem(&self, symbol: &str, granularity: PriceGranularity) -> String {
        let prefix = self.asset.price_file_prefix();
        match granularity {
            PriceGranularity::Intraday => format!("{prefix}_{symbol}"),
            PriceGranularity::Daily => format!("{prefix}_{symbol}_daily"),
        }
    }

    fn read_optional(path: &PathBuf) -> Result<Option<String>, TraderError> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(TraderError::Io(e)),
        }
    }

    fn parse_json(symbol: &str, content: &str) -> Result<RawSeries, TraderError> {
        serde_json::from_str(content).map_err(|e| TraderError::PriceData {
            symbol: symbol.to_string(),
            reason: format!("JSON parse error: {e}"),
        })
    }

    fn parse_csv(symbol: &str, content: &str) -> Result<RawSeries, TraderError> {
        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut series = RawSeries::new();

        for result in rdr.deserialize::<CsvRow>() {
            let row = result.map_err(|e| TraderError::PriceData {
                symbol: symbol.to_string(),
                reason: format!("CSV parse error: {e}"),
            })?;
            series.insert(
                row.timestamp,
                OhlcvBar {
                    open: row.open,
                    high: row.high,
                    low: row.low,
                    close: row.close,
                    volume: row.volume,
                },
            );
        }

        Ok(series)
    }
}

impl PricePort for PriceFileAdapter {
    fn load_series(
        &self,
        symbol: &str,
        granularity: PriceGranularity,
    ) -> Result<Option<RawSeries>, TraderError> {
        let stem = self.stem(symbol, granularity);

        let json_path = self.base_path.join(format!("{stem}.json"));
        if let Some(content) = Self::read_optional(&json_path)? {
            debug!(path = %json_path.display(), "reading price file");
            return Self::parse_json(symbol, &content).map(Some);
        }

        let csv_path = self.base_path.join(format!("{stem}.csv"));
        if let Some(content) = Self::read_optional(&csv_path)? {
            debug!(path = %csv_path.display(), "reading price file");
            return Self::parse_csv(symbol, &content).map(Some);
        }

        Ok(None)
    }
}
