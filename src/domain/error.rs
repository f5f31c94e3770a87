//! Domain error types.
//!
//! [`TraderError`] covers everything that aborts a session: bad configuration,
//! an unresolved session context, persistence failures and malformed price
//! data. Trade rejections an agent can react to are plain values, see
//! [`crate::domain::execution::TradeRejection`].

use crate::domain::universe::UniverseError;

/// Top-level error type for papertrader.
#[derive(Debug, thiserror::Error)]
pub enum TraderError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("session context unresolved: {reason}")]
    Session { reason: String },

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("ledger error at {path}: {reason}")]
    Ledger { path: String, reason: String },

    #[error("malformed price data for {symbol}: {reason}")]
    PriceData { symbol: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TraderError {
    pub fn ledger(path: &std::path::Path, reason: impl std::fmt::Display) -> Self {
        TraderError::Ledger {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<&TraderError> for std::process::ExitCode {
    fn from(err: &TraderError) -> Self {
        let code: u8 = match err {
            TraderError::Io(_) => 1,
            TraderError::ConfigParse { .. }
            | TraderError::ConfigMissing { .. }
            | TraderError::ConfigInvalid { .. }
            | TraderError::Session { .. }
            | TraderError::Universe(_) => 2,
            TraderError::Ledger { .. } => 3,
            TraderError::PriceData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
