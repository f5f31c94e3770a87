//! Trading universe: parses symbol lists from configuration and checks them
//! against the asset class's supported symbols.

use crate::domain::asset::AssetClass;
use std::collections::HashSet;

/// Default stock universe (NASDAQ-100 constituents).
pub const NASDAQ_100: &[&str] = &[
    "NVDA", "MSFT", "AAPL", "GOOG", "GOOGL", "AMZN", "META", "AVGO", "TSLA", "NFLX", "PLTR",
    "COST", "ASML", "AMD", "CSCO", "AZN", "TMUS", "MU", "LIN", "PEP", "SHOP", "APP", "INTU",
    "AMAT", "LRCX", "PDD", "QCOM", "ARM", "INTC", "BKNG", "AMGN", "TXN", "ISRG", "GILD", "KLAC",
    "PANW", "ADBE", "HON", "CRWD", "CEG", "ADI", "ADP", "DASH", "CMCSA", "VRTX", "MELI", "SBUX",
    "CDNS", "ORLY", "SNPS", "MSTR", "MDLZ", "ABNB", "MRVL", "CTAS", "TRI", "MAR", "MNST", "CSX",
    "ADSK", "PYPL", "FTNT", "AEP", "WDAY", "REGN", "ROP", "NXPI", "DDOG", "AXON", "ROST", "IDXX",
    "EA", "PCAR", "FAST", "EXC", "TTWO", "XEL", "ZS", "PAYX", "WBD", "BKR", "CPRT", "CCEP",
    "FANG", "TEAM", "CHTR", "KDP", "MCHP", "GEHC", "VRSK", "CTSH", "CSGP", "KHC", "ODFL", "DXCM",
    "TTD", "ON", "BIIB", "LULU", "CDW", "GFS",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Universe {
    pub asset: AssetClass,
    pub symbols: Vec<String>,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.symbols.len()
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.iter().any(|s| s == symbol)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("{symbol} is not a supported {asset} symbol")]
    UnsupportedSymbol { symbol: String, asset: AssetClass },
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

pub fn default_symbols(asset: AssetClass) -> Vec<String> {
    let list = asset.supported_symbols().unwrap_or(NASDAQ_100);
    list.iter().map(|s| s.to_string()).collect()
}

/// Build the universe from an optional configured list, falling back to the
/// asset class default.
pub fn resolve_universe(
    asset: AssetClass,
    configured: Option<&str>,
) -> Result<Universe, UniverseError> {
    let symbols = match configured {
        Some(list) => parse_symbols(list)?,
        None => default_symbols(asset),
    };

    if let Some(bad) = symbols.iter().find(|s| !asset.supports(s)) {
        return Err(UniverseError::UnsupportedSymbol {
            symbol: bad.clone(),
            asset,
        });
    }

    Ok(Universe { asset, symbols })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols_basic() {
        let result = parse_symbols("AAPL,MSFT,NVDA").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_symbols_with_whitespace_and_case() {
        let result = parse_symbols("  aapl , Msft ,nvda").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "NVDA"]);
    }

    #[test]
    fn test_parse_symbols_empty_token() {
        let result = parse_symbols("AAPL,,MSFT");
        assert!(matches!(result, Err(UniverseError::EmptyToken)));
    }

    #[test]
    fn test_parse_symbols_duplicate() {
        let result = parse_symbols("BTC,ETH,btc");
        assert!(matches!(result, Err(UniverseError::DuplicateSymbol(s)) if s == "BTC"));
    }

    #[test]
    fn test_default_stock_universe_is_nasdaq_100() {
        let symbols = default_symbols(AssetClass::Stock);
        assert_eq!(symbols.len(), NASDAQ_100.len());
        assert!(symbols.contains(&"AAPL".to_string()));
    }

    #[test]
    fn test_default_crypto_and_futures_universes() {
        assert_eq!(default_symbols(AssetClass::Crypto), vec!["BTC", "ETH"]);
        assert_eq!(default_symbols(AssetClass::Futures).len(), 11);
    }

    #[test]
    fn test_resolve_rejects_unsupported_crypto() {
        let err = resolve_universe(AssetClass::Crypto, Some("BTC,DOGE")).unwrap_err();
        assert_eq!(
            err,
            UniverseError::UnsupportedSymbol {
                symbol: "DOGE".into(),
                asset: AssetClass::Crypto
            }
        );
        assert_eq!(err.to_string(), "DOGE is not a supported crypto symbol");
    }

    #[test]
    fn test_resolve_configured_list() {
        let universe = resolve_universe(AssetClass::Futures, Some("nq1, es")).unwrap();
        assert_eq!(universe.count(), 2);
        assert!(universe.contains("NQ1"));
        assert!(!universe.contains("GC"));
    }
}
