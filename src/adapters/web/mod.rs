//! HTTP tool server.
//!
//! Serves the trading tools of a single agent signature over JSON. All
//! requests go through one [`TradingDesk`] behind a mutex, so tool calls are
//! applied strictly one after another.

mod error;
mod handlers;

pub use error::WebError;
pub use handlers::*;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::{Arc, Mutex};

use crate::domain::asset::AssetClass;
use crate::domain::price_oracle::PriceOracle;
use crate::domain::scheduler::SessionGranularity;
use crate::domain::session::Session;
use crate::ports::audit_port::AuditPort;
use crate::ports::ledger_port::LedgerPort;

/// Everything the tool server needs to execute trades for one signature.
pub struct TradingDesk {
    pub signature: String,
    pub asset: AssetClass,
    pub ledger: Box<dyn LedgerPort + Send>,
    pub audit: Box<dyn AuditPort + Send>,
    pub oracle: PriceOracle,
    pub granularity: SessionGranularity,
    pub session: Option<Session>,
}

impl TradingDesk {
    pub fn new(
        signature: impl Into<String>,
        asset: AssetClass,
        ledger: Box<dyn LedgerPort + Send>,
        audit: Box<dyn AuditPort + Send>,
        oracle: PriceOracle,
    ) -> Self {
        TradingDesk {
            signature: signature.into(),
            asset,
            ledger,
            audit,
            oracle,
            granularity: SessionGranularity::Daily,
            session: None,
        }
    }

    /// Sessions opened on this desk must fit `granularity`.
    pub fn with_granularity(mut self, granularity: SessionGranularity) -> Self {
        self.granularity = granularity;
        self
    }
}

pub struct AppState {
    pub desk: Mutex<TradingDesk>,
}

impl AppState {
    pub fn new(desk: TradingDesk) -> Self {
        AppState {
            desk: Mutex::new(desk),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/session/begin", post(handlers::begin_session))
        .route("/session/end", post(handlers::end_session))
        .route("/tools", get(handlers::list_tools))
        .route("/tools/{name}", post(handlers::call_tool))
        .route("/positions", get(handlers::positions))
        .fallback(handlers::not_found)
        .with_state(Arc::new(state))
}
