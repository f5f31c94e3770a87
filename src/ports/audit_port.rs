//! Session audit port for no-trade markers.

use chrono::NaiveDate;

use crate::domain::error::TraderError;
use crate::domain::session::NoTradeMarker;

pub trait AuditPort {
    fn record_no_trade(&self, marker: &NoTradeMarker) -> Result<(), TraderError>;

    fn markers(&self) -> Result<Vec<NoTradeMarker>, TraderError>;

    fn last_date(&self) -> Result<Option<NaiveDate>, TraderError> {
        Ok(self.markers()?.iter().map(|m| m.date).max())
    }
}
