#![allow(dead_code)]

use chrono::NaiveDate;
pub use papertrader::domain::ohlcv::OhlcvBar;
use papertrader::domain::ohlcv::PriceGranularity;
use papertrader::domain::error::TraderError;
use papertrader::domain::position::Registration;
use papertrader::adapters::jsonl_ledger::{JsonlLedger, JsonlNoTradeLog};
use papertrader::ports::price_port::{PricePort, RawSeries};
use std::collections::HashMap;
use std::path::Path;

pub struct MockPricePort {
    pub data: HashMap<String, RawSeries>,
    pub errors: HashMap<String, String>,
}

impl MockPricePort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bar(mut self, symbol: &str, timestamp: &str, bar: OhlcvBar) -> Self {
        self.data
            .entry(symbol.to_string())
            .or_default()
            .insert(timestamp.to_string(), bar);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl PricePort for MockPricePort {
    fn load_series(
        &self,
        symbol: &str,
        _granularity: PriceGranularity,
    ) -> Result<Option<RawSeries>, TraderError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TraderError::PriceData {
                symbol: symbol.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self.data.get(symbol).cloned())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn flat_bar(price: f64) -> OhlcvBar {
    OhlcvBar {
        open: price,
        high: price,
        low: price,
        close: price,
        volume: None,
    }
}

pub fn bar(open: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        open,
        high: open.max(close),
        low: open.min(close),
        close,
        volume: Some(1_000.0),
    }
}

pub fn registration(symbols: &[&str], cash: f64, init_date: NaiveDate) -> Registration {
    Registration {
        symbols: symbols.iter().map(|s| s.to_string()).collect(),
        initial_cash: cash,
        init_date,
    }
}

pub fn open_ledger(
    dir: &Path,
    signature: &str,
    registration: Registration,
) -> (JsonlLedger, JsonlNoTradeLog) {
    (
        JsonlLedger::new(dir, signature, registration),
        JsonlNoTradeLog::new(dir, signature),
    )
}

/// Write a daily JSON price file the way the price file adapter expects it.
pub fn write_daily_prices(dir: &Path, prefix: &str, symbol: &str, bars: &[(&str, OhlcvBar)]) {
    let series: RawSeries = bars
        .iter()
        .map(|(ts, bar)| (ts.to_string(), *bar))
        .collect();
    let path = dir.join(format!("{prefix}_{symbol}_daily.json"));
    std::fs::write(path, serde_json::to_string_pretty(&series).unwrap()).unwrap();
}

pub fn write_ini(dir: &Path, content: &str) -> std::path::PathBuf {
    let path = dir.join("agent.ini");
    std::fs::write(&path, content).unwrap();
    path
}
