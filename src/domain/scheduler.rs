//! Trading-session scheduling.
//!
//! Works out which dates (and hours) of a configured range still need a
//! session, given the last date the agent has already processed.

use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::fmt;
use tracing::info;

use super::asset::AssetClass;
use super::error::TraderError;
use crate::ports::audit_port::AuditPort;
use crate::ports::ledger_port::LedgerPort;

pub const DEFAULT_START_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionGranularity {
    #[default]
    Daily,
    /// Hours `start_hour..end_hour`, end exclusive.
    Hourly { start_hour: u32, end_hour: u32 },
}

impl SessionGranularity {
    /// Reject a slot the schedule would never produce: an hour under daily
    /// sessions, a missing hour under hourly ones, or an hour outside
    /// `start_hour..end_hour`.
    pub fn check_slot(self, slot: SessionSlot) -> Result<(), TraderError> {
        let reason = match (self, slot.hour) {
            (SessionGranularity::Daily, None) => return Ok(()),
            (SessionGranularity::Daily, Some(hour)) => {
                format!("hour {hour} given but sessions are daily")
            }
            (SessionGranularity::Hourly { .. }, None) => {
                "sessions are hourly, an hour is required".to_string()
            }
            (
                SessionGranularity::Hourly {
                    start_hour,
                    end_hour,
                },
                Some(hour),
            ) => {
                if (start_hour..end_hour).contains(&hour) {
                    return Ok(());
                }
                format!("hour {hour} is outside the session window {start_hour}..{end_hour}")
            }
        };
        Err(TraderError::Session { reason })
    }
}

/// One unit of scheduled trading: a date, or an hour within a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct SessionSlot {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
}

impl SessionSlot {
    pub fn daily(date: NaiveDate) -> Self {
        SessionSlot { date, hour: None }
    }

    pub fn hourly(date: NaiveDate, hour: u32) -> Self {
        SessionSlot {
            date,
            hour: Some(hour),
        }
    }
}

impl fmt::Display for SessionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.hour {
            Some(h) => write!(f, "{} {:02}:00", self.date, h),
            None => write!(f, "{}", self.date),
        }
    }
}

/// Trading dates after `max(last_processed, init_date)` up to `end_date`
/// inclusive, filtered by the asset's calendar.
pub fn pending_dates(
    init_date: NaiveDate,
    end_date: NaiveDate,
    asset: AssetClass,
    last_processed: NaiveDate,
) -> Vec<NaiveDate> {
    let mut dates = Vec::new();
    let start = last_processed.max(init_date);
    if end_date <= start {
        return dates;
    }

    let mut day = start;
    while let Some(next) = day.checked_add_days(Days::new(1)) {
        if next > end_date {
            break;
        }
        if asset.is_trading_day(next) {
            dates.push(next);
        }
        day = next;
    }
    dates
}

pub fn expand_sessions(dates: &[NaiveDate], granularity: SessionGranularity) -> Vec<SessionSlot> {
    match granularity {
        SessionGranularity::Daily => dates.iter().copied().map(SessionSlot::daily).collect(),
        SessionGranularity::Hourly {
            start_hour,
            end_hour,
        } => dates
            .iter()
            .flat_map(|&d| (start_hour..end_hour).map(move |h| SessionSlot::hourly(d, h)))
            .collect(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionScheduler {
    pub init_date: NaiveDate,
    pub end_date: NaiveDate,
    pub asset: AssetClass,
    pub granularity: SessionGranularity,
}

impl SessionScheduler {
    /// The later of the ledger's last snapshot date and the last no-trade
    /// marker, registering the ledger first if it has never been created.
    pub fn last_processed(
        &self,
        ledger: &dyn LedgerPort,
        audit: &dyn AuditPort,
    ) -> Result<NaiveDate, TraderError> {
        if !ledger.exists() {
            ledger.register()?;
            return Ok(self.init_date);
        }
        let ledger_last = ledger.last_date()?.unwrap_or(self.init_date);
        let marker_last = audit.last_date()?;
        Ok(marker_last.map_or(ledger_last, |m| m.max(ledger_last)))
    }

    pub fn pending(
        &self,
        ledger: &dyn LedgerPort,
        audit: &dyn AuditPort,
    ) -> Result<Vec<SessionSlot>, TraderError> {
        let last = self.last_processed(ledger, audit)?;
        let dates = pending_dates(self.init_date, self.end_date, self.asset, last);
        let slots = expand_sessions(&dates, self.granularity);
        info!(
            signature = ledger.signature(),
            %last,
            dates = dates.len(),
            sessions = slots.len(),
            "pending sessions computed"
        );
        Ok(slots)
    }
}
