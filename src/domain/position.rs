//! Ledger snapshots and the trade actions recorded in them.
//!
//! A snapshot serializes to one line of the position ledger:
//!
//! ```json
//! {"date":"2025-10-14","id":1,"this_action":{"action":"buy","symbol":"AAPL","amount":5.0},"positions":{"AAPL":5.0,"CASH":9250.0}}
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::portfolio::Holdings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSide {
    #[serde(rename = "buy", alias = "buy_crypto", alias = "buy_futures")]
    Buy,
    #[serde(rename = "sell", alias = "sell_crypto", alias = "sell_futures")]
    Sell,
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSide::Buy => f.write_str("buy"),
            TradeSide::Sell => f.write_str("sell"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAction {
    #[serde(rename = "action")]
    pub side: TradeSide,
    pub symbol: String,
    #[serde(rename = "amount")]
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub date: NaiveDate,
    #[serde(rename = "id")]
    pub action_id: u64,
    #[serde(
        rename = "this_action",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub action: Option<TradeAction>,
    #[serde(rename = "positions")]
    pub holdings: Holdings,
}

impl PositionSnapshot {
    pub fn genesis(registration: &Registration) -> Self {
        PositionSnapshot {
            date: registration.init_date,
            action_id: 0,
            action: None,
            holdings: Holdings::genesis(&registration.symbols, registration.initial_cash),
        }
    }
}

/// Parameters of the genesis snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Registration {
    pub symbols: Vec<String>,
    pub initial_cash: f64,
    pub init_date: NaiveDate,
}

/// Position summary reported at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerSummary {
    pub signature: String,
    pub latest_date: NaiveDate,
    pub latest_id: u64,
    pub holdings: Holdings,
    pub total_records: usize,
}

impl LedgerSummary {
    pub fn from_snapshots(signature: &str, snapshots: &[PositionSnapshot]) -> Option<Self> {
        let latest = snapshots.iter().max_by_key(|s| s.action_id)?;
        Some(LedgerSummary {
            signature: signature.to_string(),
            latest_date: latest.date,
            latest_id: latest.action_id,
            holdings: latest.holdings.clone(),
            total_records: snapshots.len(),
        })
    }
}
