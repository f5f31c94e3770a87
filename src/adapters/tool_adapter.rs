//! Named tool-call surface over a trading [`Session`].
//!
//! A tool call is `{"tool": <name>, "arguments": {...}}`. Trade tools are
//! named per asset class (`buy`/`sell`, `buy_crypto`/`sell_crypto`,
//! `buy_futures`/`sell_futures`) and take the symbol under `symbol`,
//! `crypto_symbol` or `futures_symbol` and the size under `amount` or
//! `contracts`. `get_price_local` takes `symbol` and `date`.
//!
//! Results are JSON: the new holdings on a fill, or an object with an
//! `error` message and context fields otherwise.

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::domain::asset::AssetClass;
use crate::domain::error::TraderError;
use crate::domain::execution::{TradeExecutor, TradeIntent, TradeOutcome, TradeRejection};
use crate::domain::position::TradeSide;
use crate::domain::price_oracle::PriceLookupError;
use crate::domain::session::Session;

pub const GET_PRICE_TOOL: &str = "get_price_local";

const SYMBOL_KEYS: &[&str] = &["symbol", "crypto_symbol", "futures_symbol"];
const AMOUNT_KEYS: &[&str] = &["amount", "contracts"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    Trade(TradeIntent),
    GetPrice { symbol: String, date: NaiveDate },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool {tool} is not available to {asset} agents")]
    WrongAssetTool { tool: String, asset: AssetClass },

    #[error("Missing argument '{argument}' for {tool}")]
    MissingArgument { tool: String, argument: String },

    #[error("Invalid argument '{argument}' for {tool}: {reason}")]
    InvalidArgument {
        tool: String,
        argument: String,
        reason: String,
    },
}

/// Trade tool names for an asset class, buy first.
pub fn trade_tool_names(asset: AssetClass) -> [&'static str; 2] {
    match asset {
        AssetClass::Stock => ["buy", "sell"],
        AssetClass::Crypto => ["buy_crypto", "sell_crypto"],
        AssetClass::Futures => ["buy_futures", "sell_futures"],
    }
}

fn trade_tool(name: &str) -> Option<(TradeSide, AssetClass)> {
    let parsed = match name {
        "buy" => (TradeSide::Buy, AssetClass::Stock),
        "sell" => (TradeSide::Sell, AssetClass::Stock),
        "buy_crypto" => (TradeSide::Buy, AssetClass::Crypto),
        "sell_crypto" => (TradeSide::Sell, AssetClass::Crypto),
        "buy_futures" => (TradeSide::Buy, AssetClass::Futures),
        "sell_futures" => (TradeSide::Sell, AssetClass::Futures),
        _ => return None,
    };
    Some(parsed)
}

fn string_arg(call: &ToolCall, keys: &[&str]) -> Result<String, ToolCallError> {
    let (key, value) = keys
        .iter()
        .find_map(|k| call.arguments.get(*k).map(|v| (*k, v)))
        .ok_or_else(|| ToolCallError::MissingArgument {
            tool: call.tool.clone(),
            argument: keys[0].to_string(),
        })?;
    value
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolCallError::InvalidArgument {
            tool: call.tool.clone(),
            argument: key.to_string(),
            reason: "expected a non-empty string".to_string(),
        })
}

fn amount_arg(call: &ToolCall) -> Result<f64, ToolCallError> {
    let (key, value) = AMOUNT_KEYS
        .iter()
        .find_map(|k| call.arguments.get(*k).map(|v| (*k, v)))
        .ok_or_else(|| ToolCallError::MissingArgument {
            tool: call.tool.clone(),
            argument: AMOUNT_KEYS[0].to_string(),
        })?;
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ToolCallError::InvalidArgument {
        tool: call.tool.clone(),
        argument: key.to_string(),
        reason: format!("expected a number, got {value}"),
    })
}

pub fn parse_tool_call(call: &ToolCall, asset: AssetClass) -> Result<ToolRequest, ToolCallError> {
    if call.tool == GET_PRICE_TOOL {
        let symbol = string_arg(call, SYMBOL_KEYS)?;
        let raw_date = string_arg(call, &["date"])?;
        let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d").map_err(|_| {
            ToolCallError::InvalidArgument {
                tool: call.tool.clone(),
                argument: "date".to_string(),
                reason: "date must be in YYYY-MM-DD format".to_string(),
            }
        })?;
        return Ok(ToolRequest::GetPrice { symbol, date });
    }

    let (side, tool_asset) =
        trade_tool(&call.tool).ok_or_else(|| ToolCallError::UnknownTool(call.tool.clone()))?;
    if tool_asset != asset {
        return Err(ToolCallError::WrongAssetTool {
            tool: call.tool.clone(),
            asset,
        });
    }

    Ok(ToolRequest::Trade(TradeIntent {
        side,
        symbol: string_arg(call, SYMBOL_KEYS)?.to_uppercase(),
        quantity: amount_arg(call)?,
    }))
}

pub fn rejection_payload(rejection: &TradeRejection) -> Value {
    let mut payload = json!({
        "error": rejection.to_string(),
        "kind": rejection.kind(),
        "symbol": rejection.symbol(),
        "date": rejection.date().to_string(),
    });
    let extra = match rejection {
        TradeRejection::InsufficientCash {
            required_cash,
            cash_available,
            ..
        } => json!({"required_cash": required_cash, "cash_available": cash_available}),
        TradeRejection::InsufficientShares {
            have, want_to_sell, ..
        } => json!({"have": have, "want_to_sell": want_to_sell}),
        TradeRejection::InvalidQuantity { quantity, .. } if quantity.is_finite() => {
            json!({"quantity": quantity})
        }
        _ => json!({}),
    };
    if let (Some(target), Value::Object(fields)) = (payload.as_object_mut(), extra) {
        target.extend(fields);
    }
    payload
}

fn tool_error_payload(call: &ToolCall, err: &ToolCallError) -> Value {
    json!({"error": err.to_string(), "tool": call.tool})
}

/// Execute one tool call inside `session`. Bad calls and rejected trades
/// become error payloads; only fatal errors are returned as `Err`.
pub fn dispatch(
    session: &mut Session,
    executor: &TradeExecutor<'_>,
    call: &ToolCall,
) -> Result<Value, TraderError> {
    let request = match parse_tool_call(call, executor.asset()) {
        Ok(request) => request,
        Err(e) => return Ok(tool_error_payload(call, &e)),
    };

    match request {
        ToolRequest::Trade(intent) => match session.execute(executor, &intent)? {
            TradeOutcome::Filled(fill) => serde_json::to_value(&fill.holdings).map_err(|e| {
                TraderError::Session {
                    reason: format!("cannot encode holdings: {e}"),
                }
            }),
            TradeOutcome::Rejected(rejection) => Ok(rejection_payload(&rejection)),
        },
        ToolRequest::GetPrice { symbol, date } => {
            Ok(price_payload(executor, &symbol, date))
        }
    }
}

fn price_payload(executor: &TradeExecutor<'_>, symbol: &str, date: NaiveDate) -> Value {
    match executor.oracle().quote(symbol, date) {
        Ok(bar) => json!({
            "symbol": symbol,
            "date": date.to_string(),
            "ohlcv": bar,
        }),
        Err(e @ PriceLookupError::UnknownSymbol { .. }) => json!({
            "error": format!("No records found for {symbol} in local data"),
            "detail": e.to_string(),
            "symbol": symbol,
            "date": date.to_string(),
        }),
        Err(e @ PriceLookupError::NotFound { .. }) => json!({
            "error": e.to_string(),
            "symbol": symbol,
            "date": date.to_string(),
        }),
    }
}
