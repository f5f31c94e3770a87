//! Read-only price lookup over pre-loaded series.
//!
//! Two selection policies are offered: [`PriceOracle::price_on_date`] takes
//! the latest bar of a date, [`PriceOracle::price_at_time`] takes the exact or
//! nearest bar to a time of day. Neither rounds.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{parse_timestamp, OhlcvBar, PriceField, PriceGranularity};
use crate::ports::price_port::PricePort;

pub type PriceSeries = BTreeMap<NaiveDateTime, OhlcvBar>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PriceLookupError {
    #[error("No price series for {symbol}")]
    UnknownSymbol { symbol: String },

    #[error("Price for {symbol} not available on {date}")]
    NotFound { symbol: String, date: NaiveDate },
}

#[derive(Debug, Clone, Default)]
pub struct PriceOracle {
    series: HashMap<String, PriceSeries>,
}

impl PriceOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, symbol: impl Into<String>, series: PriceSeries) {
        self.series.insert(symbol.into(), series);
    }

    /// Load every symbol's series from `source`. Symbols without a stored
    /// series stay unknown. An unparseable timestamp, or two keys naming the
    /// same instant (`2025-10-14` and `2025-10-14 00:00:00`), aborts the load.
    pub fn load(
        source: &dyn PricePort,
        symbols: &[String],
        granularity: PriceGranularity,
    ) -> Result<Self, TraderError> {
        let mut oracle = PriceOracle::new();
        for symbol in symbols {
            let Some(raw) = source.load_series(symbol, granularity)? else {
                debug!(%symbol, "no price series stored");
                continue;
            };
            let mut series = PriceSeries::new();
            for (key, bar) in raw {
                let ts = parse_timestamp(&key).ok_or_else(|| TraderError::PriceData {
                    symbol: symbol.clone(),
                    reason: format!("unparseable timestamp '{key}'"),
                })?;
                if series.insert(ts, bar).is_some() {
                    return Err(TraderError::PriceData {
                        symbol: symbol.clone(),
                        reason: format!("timestamp '{key}' duplicates an earlier key ({ts})"),
                    });
                }
            }
            debug!(%symbol, bars = series.len(), "loaded price series");
            oracle.insert(symbol.clone(), series);
        }
        Ok(oracle)
    }

    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.series.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }

    pub fn has_symbol(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    fn series(&self, symbol: &str) -> Result<&PriceSeries, PriceLookupError> {
        self.series
            .get(symbol)
            .ok_or_else(|| PriceLookupError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    fn day_range(
        series: &PriceSeries,
        date: NaiveDate,
    ) -> impl DoubleEndedIterator<Item = (&NaiveDateTime, &OhlcvBar)> {
        let start = date.and_time(NaiveTime::MIN);
        let end = date
            .succ_opt()
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX);
        series.range(start..end)
    }

    /// The latest bar on `date`.
    pub fn quote(&self, symbol: &str, date: NaiveDate) -> Result<OhlcvBar, PriceLookupError> {
        let series = self.series(symbol)?;
        Self::day_range(series, date)
            .next_back()
            .map(|(_, bar)| *bar)
            .ok_or_else(|| PriceLookupError::NotFound {
                symbol: symbol.to_string(),
                date,
            })
    }

    pub fn price_on_date(
        &self,
        symbol: &str,
        date: NaiveDate,
        field: PriceField,
    ) -> Result<f64, PriceLookupError> {
        let price = self.quote(symbol, date)?.field(field);
        debug!(%symbol, %date, %field, price, "price on date");
        Ok(price)
    }

    /// Exact timestamp match, else the bar on `date` closest to `time`.
    /// Equidistant candidates resolve to the earlier one.
    pub fn price_at_time(
        &self,
        symbol: &str,
        date: NaiveDate,
        time: NaiveTime,
        field: PriceField,
    ) -> Result<f64, PriceLookupError> {
        let series = self.series(symbol)?;
        let target = date.and_time(time);
        if let Some(bar) = series.get(&target) {
            return Ok(bar.field(field));
        }

        let mut best: Option<(i64, &OhlcvBar)> = None;
        for (ts, bar) in Self::day_range(series, date) {
            let diff = (*ts - target).num_seconds().abs();
            if best.is_none_or(|(d, _)| diff < d) {
                best = Some((diff, bar));
            }
        }

        best.map(|(_, bar)| bar.field(field))
            .ok_or_else(|| PriceLookupError::NotFound {
                symbol: symbol.to_string(),
                date,
            })
    }

    /// Every bar on `date` in ascending timestamp order.
    pub fn bars_on_date(
        &self,
        symbol: &str,
        date: NaiveDate,
    ) -> Result<Vec<(NaiveDateTime, OhlcvBar)>, PriceLookupError> {
        let series = self.series(symbol)?;
        Ok(Self::day_range(series, date)
            .map(|(ts, bar)| (*ts, *bar))
            .collect())
    }

    /// Close-of-day price for each symbol that has one on `date`.
    pub fn close_prices(&self, symbols: &[&str], date: NaiveDate) -> HashMap<String, f64> {
        symbols
            .iter()
            .filter_map(|s| {
                self.price_on_date(s, date, PriceField::Close)
                    .ok()
                    .map(|p| (s.to_string(), p))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
        d.and_hms_opt(h, m, 0).unwrap()
    }

    fn bar(open: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: None,
        }
    }

    fn intraday_oracle() -> PriceOracle {
        let d = date(2025, 10, 14);
        let mut series = PriceSeries::new();
        series.insert(at(d, 9, 0), bar(100.0, 101.0));
        series.insert(at(d, 10, 0), bar(101.0, 102.0));
        series.insert(at(d, 12, 0), bar(103.0, 104.0));
        series.insert(at(date(2025, 10, 15), 0, 0), bar(110.0, 111.0));
        let mut oracle = PriceOracle::new();
        oracle.insert("NQ1", series);
        oracle
    }

    #[test]
    fn on_date_takes_latest_bar() {
        let oracle = intraday_oracle();
        let open = oracle
            .price_on_date("NQ1", date(2025, 10, 14), PriceField::Open)
            .unwrap();
        assert_eq!(open, 103.0);
    }

    #[test]
    fn on_date_matches_date_only_keys() {
        let oracle = intraday_oracle();
        let close = oracle
            .price_on_date("NQ1", date(2025, 10, 15), PriceField::Close)
            .unwrap();
        assert_eq!(close, 111.0);
    }

    #[test]
    fn on_date_missing_is_not_found() {
        let oracle = intraday_oracle();
        let err = oracle
            .price_on_date("NQ1", date(2025, 10, 16), PriceField::Open)
            .unwrap_err();
        assert_eq!(
            err,
            PriceLookupError::NotFound {
                symbol: "NQ1".into(),
                date: date(2025, 10, 16)
            }
        );
        assert_eq!(err.to_string(), "Price for NQ1 not available on 2025-10-16");
    }

    #[test]
    fn unknown_symbol_checked_first() {
        let oracle = intraday_oracle();
        let err = oracle
            .price_on_date("ES", date(2025, 10, 16), PriceField::Open)
            .unwrap_err();
        assert!(matches!(err, PriceLookupError::UnknownSymbol { .. }));
    }

    #[test]
    fn at_time_exact_match() {
        let oracle = intraday_oracle();
        let t = NaiveTime::from_hms_opt(10, 0, 0).unwrap();
        let p = oracle
            .price_at_time("NQ1", date(2025, 10, 14), t, PriceField::Open)
            .unwrap();
        assert_eq!(p, 101.0);
    }

    #[test]
    fn at_time_nearest_bar() {
        let oracle = intraday_oracle();
        let t = NaiveTime::from_hms_opt(11, 45, 0).unwrap();
        let p = oracle
            .price_at_time("NQ1", date(2025, 10, 14), t, PriceField::Open)
            .unwrap();
        assert_eq!(p, 103.0);
    }

    #[test]
    fn at_time_tie_goes_to_earlier_bar() {
        let oracle = intraday_oracle();
        // 11:00 is one hour from both 10:00 and 12:00
        let t = NaiveTime::from_hms_opt(11, 0, 0).unwrap();
        let p = oracle
            .price_at_time("NQ1", date(2025, 10, 14), t, PriceField::Open)
            .unwrap();
        assert_eq!(p, 101.0);
    }

    #[test]
    fn at_time_ignores_other_dates() {
        let oracle = intraday_oracle();
        let t = NaiveTime::from_hms_opt(23, 59, 0).unwrap();
        let p = oracle
            .price_at_time("NQ1", date(2025, 10, 14), t, PriceField::Close)
            .unwrap();
        assert_eq!(p, 104.0);
        assert!(oracle
            .price_at_time("NQ1", date(2025, 10, 20), t, PriceField::Close)
            .is_err());
    }

    #[test]
    fn bars_on_date_are_ascending() {
        let oracle = intraday_oracle();
        let bars = oracle.bars_on_date("NQ1", date(2025, 10, 14)).unwrap();
        let hours: Vec<_> = bars.iter().map(|(ts, _)| ts.format("%H").to_string()).collect();
        assert_eq!(hours, vec!["09", "10", "12"]);
        assert!(oracle.bars_on_date("NQ1", date(2025, 10, 20)).unwrap().is_empty());
    }

    #[test]
    fn close_prices_skip_missing() {
        let oracle = intraday_oracle();
        let prices = oracle.close_prices(&["NQ1", "ES"], date(2025, 10, 14));
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["NQ1"], 104.0);
    }
}
