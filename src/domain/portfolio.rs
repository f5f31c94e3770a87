//! Holdings: symbol and cash quantities of one snapshot, plus valuation.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Holdings key that carries the cash balance.
pub const CASH: &str = "CASH";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Holdings(BTreeMap<String, f64>);

impl Holdings {
    /// Zero quantity for every symbol plus the starting cash.
    pub fn genesis(symbols: &[String], initial_cash: f64) -> Self {
        let mut map: BTreeMap<String, f64> =
            symbols.iter().map(|s| (s.clone(), 0.0)).collect();
        map.insert(CASH.to_string(), initial_cash);
        Holdings(map)
    }

    pub fn cash(&self) -> f64 {
        self.0.get(CASH).copied().unwrap_or(0.0)
    }

    pub fn set_cash(&mut self, cash: f64) {
        self.0.insert(CASH.to_string(), cash);
    }

    pub fn quantity(&self, symbol: &str) -> Option<f64> {
        if symbol == CASH {
            return None;
        }
        self.0.get(symbol).copied()
    }

    pub fn set_quantity(&mut self, symbol: &str, quantity: f64) {
        self.0.insert(symbol.to_string(), quantity);
    }

    /// Non-cash entries, zero quantities included.
    pub fn positions(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0
            .iter()
            .filter(|(k, _)| k.as_str() != CASH)
            .map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when cash and every quantity are non-negative.
    pub fn is_solvent(&self) -> bool {
        self.0.values().all(|v| *v >= 0.0)
    }

    /// Cash plus quantity * price * multiplier for every priced position.
    pub fn total_equity(&self, price_map: &HashMap<String, f64>, multiplier: f64) -> f64 {
        let position_value: f64 = self
            .positions()
            .filter_map(|(symbol, qty)| price_map.get(symbol).map(|&p| qty * p * multiplier))
            .sum();
        self.cash() + position_value
    }
}

/// Mark-to-market view of a holdings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub cash: f64,
    pub positions_value: f64,
    pub total_equity: f64,
    /// Held symbols with a non-zero quantity but no price.
    pub unpriced: Vec<String>,
}

pub fn value_holdings(
    holdings: &Holdings,
    price_map: &HashMap<String, f64>,
    multiplier: f64,
) -> Valuation {
    let total_equity = holdings.total_equity(price_map, multiplier);
    let unpriced = holdings
        .positions()
        .filter(|(symbol, qty)| *qty != 0.0 && !price_map.contains_key(*symbol))
        .map(|(symbol, _)| symbol.to_string())
        .collect();
    Valuation {
        cash: holdings.cash(),
        positions_value: total_equity - holdings.cash(),
        total_equity,
        unpriced,
    }
}
