//! Agent configuration: validation and construction from a [`ConfigPort`].

use crate::domain::asset::AssetClass;
use crate::domain::error::TraderError;
use crate::domain::ohlcv::PriceGranularity;
use crate::domain::position::Registration;
use crate::domain::scheduler::{
    SessionGranularity, SessionScheduler, DEFAULT_END_HOUR, DEFAULT_START_HOUR,
};
use crate::domain::universe::{resolve_universe, Universe};
use crate::ports::config_port::ConfigPort;
use chrono::{Days, NaiveDate};
use std::path::PathBuf;

pub const DEFAULT_INITIAL_CASH: f64 = 10_000.0;
pub const DEFAULT_PRICE_DIR: &str = "./data";
pub const DEFAULT_LEDGER_DIR: &str = "./data/agent_data";
pub const DEFAULT_LISTEN: &str = "127.0.0.1:8002";

#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub signature: String,
    pub initial_cash: f64,
    pub universe: Universe,
    pub init_date: NaiveDate,
    pub end_date: NaiveDate,
    pub session_granularity: SessionGranularity,
    pub price_dir: PathBuf,
    pub ledger_dir: PathBuf,
    pub price_granularity: PriceGranularity,
    pub listen: String,
}

impl AgentConfig {
    pub fn asset(&self) -> AssetClass {
        self.universe.asset
    }

    pub fn registration(&self) -> Registration {
        Registration {
            symbols: self.universe.symbols.clone(),
            initial_cash: self.initial_cash,
            init_date: self.init_date,
        }
    }

    pub fn scheduler(&self) -> SessionScheduler {
        SessionScheduler {
            init_date: self.init_date,
            end_date: self.end_date,
            asset: self.asset(),
            granularity: self.session_granularity,
        }
    }
}

/// Validate every section and build the agent configuration. `today`
/// anchors `TODAY` and `TODAY-N` dates.
pub fn build_agent_config(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<AgentConfig, TraderError> {
    let signature = validate_signature(config)?;
    let initial_cash = validate_initial_cash(config)?;
    let asset = validate_asset_type(config)?;
    let universe = resolve_universe(asset, config.get_trimmed("agent", "symbols").as_deref())?;
    let (init_date, end_date) = validate_dates(config, today)?;
    let session_granularity = validate_session(config)?;
    let price_granularity = validate_price_granularity(config)?;

    Ok(AgentConfig {
        signature,
        initial_cash,
        universe,
        init_date,
        end_date,
        session_granularity,
        price_dir: config
            .get_trimmed("data", "price_dir")
            .unwrap_or_else(|| DEFAULT_PRICE_DIR.to_string())
            .into(),
        ledger_dir: config
            .get_trimmed("data", "ledger_dir")
            .unwrap_or_else(|| DEFAULT_LEDGER_DIR.to_string())
            .into(),
        price_granularity,
        listen: config
            .get_trimmed("web", "listen")
            .unwrap_or_else(|| DEFAULT_LISTEN.to_string()),
    })
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TraderError {
    TraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_signature(config: &dyn ConfigPort) -> Result<String, TraderError> {
    let signature = config
        .get_trimmed("agent", "signature")
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "agent".to_string(),
            key: "signature".to_string(),
        })?;
    if signature.contains(['/', '\\']) || signature == "." || signature == ".." {
        return Err(invalid(
            "agent",
            "signature",
            "signature must be usable as a directory name",
        ));
    }
    Ok(signature)
}

fn validate_initial_cash(config: &dyn ConfigPort) -> Result<f64, TraderError> {
    let Some(raw) = config.get_trimmed("agent", "initial_cash") else {
        return Ok(DEFAULT_INITIAL_CASH);
    };
    let value: f64 = raw
        .parse()
        .map_err(|_| invalid("agent", "initial_cash", format!("'{raw}' is not a number")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "agent",
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(value)
}

fn validate_asset_type(config: &dyn ConfigPort) -> Result<AssetClass, TraderError> {
    match config.get_trimmed("agent", "asset_type") {
        None => Ok(AssetClass::Stock),
        Some(raw) => raw
            .parse()
            .map_err(|e: crate::domain::asset::ParseAssetClassError| {
                invalid("agent", "asset_type", e.to_string())
            }),
    }
}

fn validate_dates(
    config: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<(NaiveDate, NaiveDate), TraderError> {
    let init_date = parse_date_key(config, "init_date", today)?;
    let end_date = parse_date_key(config, "end_date", today)?;
    if init_date > end_date {
        return Err(invalid(
            "date_range",
            "init_date",
            "init_date must not be after end_date",
        ));
    }
    Ok((init_date, end_date))
}

fn parse_date_key(
    config: &dyn ConfigPort,
    key: &str,
    today: NaiveDate,
) -> Result<NaiveDate, TraderError> {
    let raw = config
        .get_trimmed("date_range", key)
        .ok_or_else(|| TraderError::ConfigMissing {
            section: "date_range".to_string(),
            key: key.to_string(),
        })?;
    parse_dynamic_date(&raw, today).ok_or_else(|| {
        invalid(
            "date_range",
            key,
            format!("invalid {key} '{raw}', expected YYYY-MM-DD, TODAY or TODAY-N"),
        )
    })
}

/// `YYYY-MM-DD`, `TODAY`, or `TODAY-N` for N days before `today`.
pub fn parse_dynamic_date(raw: &str, today: NaiveDate) -> Option<NaiveDate> {
    let raw = raw.trim();
    match raw.strip_prefix("TODAY") {
        Some("") => Some(today),
        Some(offset) => {
            let days: u64 = offset.strip_prefix('-')?.trim().parse().ok()?;
            today.checked_sub_days(Days::new(days))
        }
        None => NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok(),
    }
}

fn validate_session(config: &dyn ConfigPort) -> Result<SessionGranularity, TraderError> {
    let granularity = config
        .get_trimmed("session", "granularity")
        .unwrap_or_else(|| "daily".to_string());
    match granularity.to_lowercase().as_str() {
        "daily" => Ok(SessionGranularity::Daily),
        "hourly" => {
            let start_hour = parse_hour(config, "start_hour", DEFAULT_START_HOUR)?;
            let end_hour = parse_hour(config, "end_hour", DEFAULT_END_HOUR)?;
            if start_hour > 23 {
                return Err(invalid("session", "start_hour", "start_hour must be 0..23"));
            }
            if end_hour <= start_hour || end_hour > 24 {
                return Err(invalid(
                    "session",
                    "end_hour",
                    "end_hour must be after start_hour and at most 24",
                ));
            }
            Ok(SessionGranularity::Hourly {
                start_hour,
                end_hour,
            })
        }
        other => Err(invalid(
            "session",
            "granularity",
            format!("unknown granularity '{other}', expected daily or hourly"),
        )),
    }
}

fn parse_hour(config: &dyn ConfigPort, key: &str, default: u32) -> Result<u32, TraderError> {
    match config.get_trimmed("session", key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| invalid("session", key, format!("'{raw}' is not an hour"))),
    }
}

fn validate_price_granularity(config: &dyn ConfigPort) -> Result<PriceGranularity, TraderError> {
    match config.get_trimmed("data", "price_granularity") {
        None => Ok(PriceGranularity::Daily),
        Some(raw) => raw
            .parse()
            .map_err(|e: String| invalid("data", "price_granularity", e)),
    }
}
