//! Trade validation and execution against the position ledger.
//!
//! [`TradeExecutor::execute`] prices an intent at the date's open, checks it
//! against the latest snapshot and appends the resulting holdings. Business
//! rule violations come back as [`TradeOutcome::Rejected`] and never touch
//! the ledger; only persistence and context failures are errors.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::asset::AssetClass;
use super::error::TraderError;
use super::ohlcv::PriceField;
use super::portfolio::Holdings;
use super::position::{TradeAction, TradeSide};
use super::price_oracle::{PriceLookupError, PriceOracle};
use crate::ports::ledger_port::LedgerPort;

/// Signature and trading date every trade is executed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub signature: String,
    pub date: NaiveDate,
}

impl SessionContext {
    pub fn new(signature: impl Into<String>, date: NaiveDate) -> Self {
        SessionContext {
            signature: signature.into(),
            date,
        }
    }

    /// Both halves must be present; an unresolved context is fatal.
    pub fn resolve(
        signature: Option<&str>,
        date: Option<NaiveDate>,
    ) -> Result<Self, TraderError> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TraderError::Session {
                reason: "signature is not set".to_string(),
            })?;
        let date = date.ok_or_else(|| TraderError::Session {
            reason: "trading date is not set".to_string(),
        })?;
        Ok(SessionContext::new(signature, date))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeIntent {
    pub side: TradeSide,
    pub symbol: String,
    pub quantity: f64,
}

impl TradeIntent {
    pub fn buy(symbol: impl Into<String>, quantity: f64) -> Self {
        TradeIntent {
            side: TradeSide::Buy,
            symbol: symbol.into(),
            quantity,
        }
    }

    pub fn sell(symbol: impl Into<String>, quantity: f64) -> Self {
        TradeIntent {
            side: TradeSide::Sell,
            symbol: symbol.into(),
            quantity,
        }
    }
}

/// A trade that was applied and persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub holdings: Holdings,
    pub action_id: u64,
    pub price: f64,
    pub multiplier: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TradeRejection {
    #[error("Invalid quantity {quantity} for {symbol}! Quantity must be a positive number.")]
    InvalidQuantity {
        symbol: String,
        date: NaiveDate,
        quantity: f64,
    },

    #[error("Unsupported {asset} symbol: {symbol}. This action will not be allowed.")]
    UnsupportedSymbol {
        symbol: String,
        date: NaiveDate,
        asset: AssetClass,
    },

    #[error("Symbol {symbol} not found! This action will not be allowed.")]
    UnknownSymbol { symbol: String, date: NaiveDate },

    #[error("Price for {symbol} not available on {date}! This action will not be allowed.")]
    PriceUnavailable { symbol: String, date: NaiveDate },

    #[error("Insufficient cash! This action will not be allowed.")]
    InsufficientCash {
        symbol: String,
        date: NaiveDate,
        required_cash: f64,
        cash_available: f64,
    },

    #[error("No position for {symbol}! This action will not be allowed.")]
    NoPosition { symbol: String, date: NaiveDate },

    #[error("Insufficient shares! This action will not be allowed.")]
    InsufficientShares {
        symbol: String,
        date: NaiveDate,
        have: f64,
        want_to_sell: f64,
    },
}

impl TradeRejection {
    pub fn kind(&self) -> &'static str {
        match self {
            TradeRejection::InvalidQuantity { .. } => "invalid_quantity",
            TradeRejection::UnsupportedSymbol { .. } => "unsupported_symbol",
            TradeRejection::UnknownSymbol { .. } => "unknown_symbol",
            TradeRejection::PriceUnavailable { .. } => "price_unavailable",
            TradeRejection::InsufficientCash { .. } => "insufficient_cash",
            TradeRejection::NoPosition { .. } => "no_position",
            TradeRejection::InsufficientShares { .. } => "insufficient_shares",
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            TradeRejection::InvalidQuantity { symbol, .. }
            | TradeRejection::UnsupportedSymbol { symbol, .. }
            | TradeRejection::UnknownSymbol { symbol, .. }
            | TradeRejection::PriceUnavailable { symbol, .. }
            | TradeRejection::InsufficientCash { symbol, .. }
            | TradeRejection::NoPosition { symbol, .. }
            | TradeRejection::InsufficientShares { symbol, .. } => symbol,
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            TradeRejection::InvalidQuantity { date, .. }
            | TradeRejection::UnsupportedSymbol { date, .. }
            | TradeRejection::UnknownSymbol { date, .. }
            | TradeRejection::PriceUnavailable { date, .. }
            | TradeRejection::InsufficientCash { date, .. }
            | TradeRejection::NoPosition { date, .. }
            | TradeRejection::InsufficientShares { date, .. } => *date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    Filled(Fill),
    Rejected(TradeRejection),
}

impl TradeOutcome {
    pub fn is_filled(&self) -> bool {
        matches!(self, TradeOutcome::Filled(_))
    }
}

pub struct TradeExecutor<'a> {
    ledger: &'a dyn LedgerPort,
    oracle: &'a PriceOracle,
    asset: AssetClass,
}

impl<'a> TradeExecutor<'a> {
    pub fn new(ledger: &'a dyn LedgerPort, oracle: &'a PriceOracle, asset: AssetClass) -> Self {
        TradeExecutor {
            ledger,
            oracle,
            asset,
        }
    }

    pub fn asset(&self) -> AssetClass {
        self.asset
    }

    pub fn ledger(&self) -> &'a dyn LedgerPort {
        self.ledger
    }

    pub fn oracle(&self) -> &'a PriceOracle {
        self.oracle
    }

    pub fn buy(
        &self,
        symbol: &str,
        quantity: f64,
        ctx: &SessionContext,
    ) -> Result<TradeOutcome, TraderError> {
        self.execute(&TradeIntent::buy(symbol, quantity), ctx)
    }

    pub fn sell(
        &self,
        symbol: &str,
        quantity: f64,
        ctx: &SessionContext,
    ) -> Result<TradeOutcome, TraderError> {
        self.execute(&TradeIntent::sell(symbol, quantity), ctx)
    }

    pub fn execute(
        &self,
        intent: &TradeIntent,
        ctx: &SessionContext,
    ) -> Result<TradeOutcome, TraderError> {
        let symbol = intent.symbol.as_str();
        let date = ctx.date;

        if !intent.quantity.is_finite() || intent.quantity <= 0.0 {
            return Ok(self.reject(TradeRejection::InvalidQuantity {
                symbol: symbol.to_string(),
                date,
                quantity: intent.quantity,
            }));
        }

        if ctx.signature != self.ledger.signature() {
            return Err(TraderError::Session {
                reason: format!(
                    "session signature '{}' does not own ledger '{}'",
                    ctx.signature,
                    self.ledger.signature()
                ),
            });
        }

        let latest = self.ledger.latest(date)?;
        if date < latest.date {
            return Err(TraderError::Session {
                reason: format!(
                    "session date {date} is before the latest ledger snapshot ({}, id {})",
                    latest.date, latest.action_id
                ),
            });
        }
        let price = match self.open_price(symbol, date) {
            Ok(price) => price,
            Err(rejection) => return Ok(self.reject(rejection)),
        };

        let multiplier = self.asset.contract_multiplier();
        let notional = price * multiplier * intent.quantity;
        let mut holdings = latest.holdings;
        let cash = holdings.cash();

        match intent.side {
            TradeSide::Buy => {
                if cash - notional < 0.0 {
                    return Ok(self.reject(TradeRejection::InsufficientCash {
                        symbol: symbol.to_string(),
                        date,
                        required_cash: notional,
                        cash_available: cash,
                    }));
                }
                let held = holdings.quantity(symbol).unwrap_or(0.0);
                holdings.set_cash(cash - notional);
                holdings.set_quantity(symbol, held + intent.quantity);
            }
            TradeSide::Sell => {
                let Some(held) = holdings.quantity(symbol) else {
                    return Ok(self.reject(TradeRejection::NoPosition {
                        symbol: symbol.to_string(),
                        date,
                    }));
                };
                if held < intent.quantity {
                    return Ok(self.reject(TradeRejection::InsufficientShares {
                        symbol: symbol.to_string(),
                        date,
                        have: held,
                        want_to_sell: intent.quantity,
                    }));
                }
                holdings.set_cash(cash + notional);
                holdings.set_quantity(symbol, held - intent.quantity);
            }
        }

        let action = TradeAction {
            side: intent.side,
            symbol: symbol.to_string(),
            quantity: intent.quantity,
        };
        let snapshot = self.ledger.append(date, Some(action), holdings)?;

        info!(
            signature = %ctx.signature,
            %date,
            side = %intent.side,
            %symbol,
            quantity = intent.quantity,
            price,
            notional,
            action_id = snapshot.action_id,
            "trade filled"
        );

        Ok(TradeOutcome::Filled(Fill {
            holdings: snapshot.holdings,
            action_id: snapshot.action_id,
            price,
            multiplier,
            notional,
        }))
    }

    fn open_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, TradeRejection> {
        if !self.asset.supports(symbol) {
            return Err(TradeRejection::UnsupportedSymbol {
                symbol: symbol.to_string(),
                date,
                asset: self.asset,
            });
        }
        self.oracle
            .price_on_date(symbol, date, PriceField::Open)
            .map_err(|e| match e {
                PriceLookupError::UnknownSymbol { symbol } => {
                    TradeRejection::UnknownSymbol { symbol, date }
                }
                PriceLookupError::NotFound { symbol, date } => {
                    TradeRejection::PriceUnavailable { symbol, date }
                }
            })
    }

    fn reject(&self, rejection: TradeRejection) -> TradeOutcome {
        debug!(kind = rejection.kind(), symbol = rejection.symbol(), "trade rejected: {rejection}");
        TradeOutcome::Rejected(rejection)
    }
}
