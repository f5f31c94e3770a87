//! Per-session trading state.
//!
//! A [`Session`] owns the context one trading slot runs under and records
//! whether anything filled. Finishing a session without a fill writes a
//! no-trade marker through the [`AuditPort`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::error::TraderError;
use super::execution::{SessionContext, TradeExecutor, TradeIntent, TradeOutcome};
use super::scheduler::SessionSlot;
use crate::ports::audit_port::AuditPort;

/// Audit record for a session that ended without a trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoTradeMarker {
    pub date: NaiveDate,
    pub signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub signature: String,
    pub slot: SessionSlot,
    pub fills: usize,
    pub rejections: usize,
    pub traded: bool,
}

#[derive(Debug)]
pub struct Session {
    context: SessionContext,
    slot: SessionSlot,
    fills: usize,
    rejections: usize,
}

impl Session {
    pub fn begin(signature: impl Into<String>, slot: SessionSlot) -> Self {
        let context = SessionContext::new(signature, slot.date);
        info!(signature = %context.signature, %slot, "session started");
        Session {
            context,
            slot,
            fills: 0,
            rejections: 0,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn slot(&self) -> SessionSlot {
        self.slot
    }

    pub fn traded(&self) -> bool {
        self.fills > 0
    }

    pub fn execute(
        &mut self,
        executor: &TradeExecutor<'_>,
        intent: &TradeIntent,
    ) -> Result<TradeOutcome, TraderError> {
        let outcome = executor.execute(intent, &self.context)?;
        match outcome {
            TradeOutcome::Filled(_) => self.fills += 1,
            TradeOutcome::Rejected(_) => self.rejections += 1,
        }
        Ok(outcome)
    }

    pub fn finish(self, audit: &dyn AuditPort) -> Result<SessionReport, TraderError> {
        let traded = self.traded();
        if !traded {
            audit.record_no_trade(&NoTradeMarker {
                date: self.slot.date,
                signature: self.context.signature.clone(),
                hour: self.slot.hour,
            })?;
        }
        info!(
            signature = %self.context.signature,
            slot = %self.slot,
            fills = self.fills,
            rejections = self.rejections,
            "session finished"
        );
        Ok(SessionReport {
            signature: self.context.signature,
            slot: self.slot,
            fills: self.fills,
            rejections: self.rejections,
            traded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryAudit {
        markers: RefCell<Vec<NoTradeMarker>>,
    }

    impl AuditPort for MemoryAudit {
        fn record_no_trade(&self, marker: &NoTradeMarker) -> Result<(), TraderError> {
            self.markers.borrow_mut().push(marker.clone());
            Ok(())
        }

        fn markers(&self) -> Result<Vec<NoTradeMarker>, TraderError> {
            Ok(self.markers.borrow().clone())
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn idle_session_writes_marker() {
        let audit = MemoryAudit::default();
        let session = Session::begin("agent", SessionSlot::hourly(date(2025, 10, 14), 10));
        let report = session.finish(&audit).unwrap();

        assert!(!report.traded);
        let markers = audit.markers().unwrap();
        assert_eq!(
            markers,
            vec![NoTradeMarker {
                date: date(2025, 10, 14),
                signature: "agent".into(),
                hour: Some(10),
            }]
        );
        assert_eq!(audit.last_date().unwrap(), Some(date(2025, 10, 14)));
    }

    #[test]
    fn marker_line_format() {
        let daily = NoTradeMarker {
            date: date(2025, 10, 14),
            signature: "agent".into(),
            hour: None,
        };
        assert_eq!(
            serde_json::to_string(&daily).unwrap(),
            r#"{"date":"2025-10-14","signature":"agent"}"#
        );
    }

    #[test]
    fn context_follows_slot() {
        let session = Session::begin("agent", SessionSlot::daily(date(2025, 10, 15)));
        assert_eq!(session.context().date, date(2025, 10, 15));
        assert_eq!(session.context().signature, "agent");
        assert!(!session.traded());
    }
}
