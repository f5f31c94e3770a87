//! HTTP request handlers for the tool server.

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::{Arc, MutexGuard};

use crate::adapters::tool_adapter::{self, GET_PRICE_TOOL, ToolCall};
use crate::domain::error::TraderError;
use crate::domain::execution::TradeExecutor;
use crate::domain::position::PositionSnapshot;
use crate::domain::scheduler::SessionSlot;
use crate::domain::session::{Session, SessionReport};

use super::{AppState, TradingDesk, WebError};

fn lock(state: &AppState) -> Result<MutexGuard<'_, TradingDesk>, WebError> {
    state
        .desk
        .lock()
        .map_err(|_| WebError::internal("trading desk lock poisoned"))
}

pub async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct BeginSession {
    pub date: String,
    #[serde(default)]
    pub hour: Option<u32>,
}

pub async fn begin_session(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BeginSession>,
) -> Result<Json<Value>, WebError> {
    let date = NaiveDate::parse_from_str(body.date.trim(), "%Y-%m-%d")
        .map_err(|_| WebError::bad_request("date must be in YYYY-MM-DD format"))?;
    let slot = SessionSlot {
        date,
        hour: body.hour,
    };

    let mut desk = lock(&state)?;
    desk.granularity
        .check_slot(slot)
        .map_err(|e| WebError::bad_request(e.to_string()))?;
    if let Some(open) = &desk.session {
        return Err(WebError::conflict(format!(
            "session {} is still open",
            open.slot()
        )));
    }
    let session = Session::begin(desk.signature.clone(), slot);
    desk.session = Some(session);
    Ok(Json(json!({"signature": desk.signature, "session": slot})))
}

pub async fn end_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SessionReport>, WebError> {
    let mut desk = lock(&state)?;
    let session = desk.session.take().ok_or_else(no_session)?;
    Ok(Json(session.finish(&*desk.audit)?))
}

fn no_session() -> TraderError {
    TraderError::Session {
        reason: "no session is open; POST /session/begin first".to_string(),
    }
}

pub async fn list_tools(State(state): State<Arc<AppState>>) -> Result<Json<Value>, WebError> {
    let desk = lock(&state)?;
    let [buy, sell] = tool_adapter::trade_tool_names(desk.asset);
    Ok(Json(json!({"tools": [buy, sell, GET_PRICE_TOOL]})))
}

pub async fn call_tool(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(arguments): Json<Map<String, Value>>,
) -> Result<Json<Value>, WebError> {
    let mut guard = lock(&state)?;
    let TradingDesk {
        asset,
        ledger,
        oracle,
        session,
        ..
    } = &mut *guard;
    let session = session.as_mut().ok_or_else(no_session)?;
    let executor = TradeExecutor::new(&**ledger, oracle, *asset);
    let call = ToolCall {
        tool: name,
        arguments,
    };
    Ok(Json(tool_adapter::dispatch(session, &executor, &call)?))
}

pub async fn positions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PositionSnapshot>, WebError> {
    let desk = lock(&state)?;
    let as_of = desk
        .session
        .as_ref()
        .map(|s| s.slot().date)
        .unwrap_or_else(|| chrono::Local::now().date_naive());
    Ok(Json(desk.ledger.latest(as_of)?))
}

pub async fn not_found() -> impl IntoResponse {
    WebError::not_found("Page not found")
}
