//! Asset classes and their trading rules.
//!
//! Each agent trades a single asset class. The class decides which symbols
//! are tradeable, the contract multiplier applied to notional values, the
//! trading calendar, and where price files live.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const SUPPORTED_CRYPTOS: &[&str] = &["BTC", "ETH"];

pub const SUPPORTED_FUTURES: &[&str] = &[
    "NQ1", "ES", "MES", "MNQ", "YM", "GC", "CL", "ZB", "ZS", "ZC", "ZW",
];

/// Dollar value of one point of a futures contract.
pub const FUTURES_CONTRACT_MULTIPLIER: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
    Futures,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown asset type '{0}' (expected stock, crypto or futures)")]
pub struct ParseAssetClassError(pub String);

impl AssetClass {
    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Crypto => "crypto",
            AssetClass::Futures => "futures",
        }
    }

    /// Crypto and futures sessions run every calendar day.
    pub fn trades_every_day(self) -> bool {
        matches!(self, AssetClass::Crypto | AssetClass::Futures)
    }

    pub fn is_trading_day(self, date: NaiveDate) -> bool {
        self.trades_every_day() || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    pub fn contract_multiplier(self) -> f64 {
        match self {
            AssetClass::Futures => FUTURES_CONTRACT_MULTIPLIER,
            AssetClass::Stock | AssetClass::Crypto => 1.0,
        }
    }

    /// Closed universe for the class, `None` when any priced symbol is allowed.
    pub fn supported_symbols(self) -> Option<&'static [&'static str]> {
        match self {
            AssetClass::Stock => None,
            AssetClass::Crypto => Some(SUPPORTED_CRYPTOS),
            AssetClass::Futures => Some(SUPPORTED_FUTURES),
        }
    }

    pub fn supports(self, symbol: &str) -> bool {
        match self.supported_symbols() {
            Some(list) => list.contains(&symbol),
            None => true,
        }
    }

    pub fn price_file_prefix(self) -> &'static str {
        match self {
            AssetClass::Stock => "stock_prices",
            AssetClass::Crypto => "crypto_prices",
            AssetClass::Futures => "future_prices",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = ParseAssetClassError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stock" | "stocks" | "equity" => Ok(AssetClass::Stock),
            "crypto" => Ok(AssetClass::Crypto),
            "futures" | "future" => Ok(AssetClass::Futures),
            other => Err(ParseAssetClassError(other.to_string())),
        }
    }
}
