//! Position ledger persistence port.

use chrono::NaiveDate;

use crate::domain::error::TraderError;
use crate::domain::portfolio::Holdings;
use crate::domain::position::{LedgerSummary, PositionSnapshot, TradeAction};

/// Append-only store of position snapshots for a single agent signature.
pub trait LedgerPort {
    fn signature(&self) -> &str;

    fn exists(&self) -> bool;

    /// Write the genesis snapshot. Returns `false` without touching anything
    /// when the ledger already exists.
    fn register(&self) -> Result<bool, TraderError>;

    /// The snapshot with the highest action id. `as_of` is informational and
    /// does not filter. Registers the ledger first when it does not exist.
    fn latest(&self, as_of: NaiveDate) -> Result<PositionSnapshot, TraderError>;

    /// Append a snapshot with id `latest + 1` and return it once durable.
    fn append(
        &self,
        date: NaiveDate,
        action: Option<TradeAction>,
        holdings: Holdings,
    ) -> Result<PositionSnapshot, TraderError>;

    /// Every valid snapshot in file order.
    fn snapshots(&self) -> Result<Vec<PositionSnapshot>, TraderError>;

    fn last_date(&self) -> Result<Option<NaiveDate>, TraderError> {
        Ok(self.snapshots()?.iter().map(|s| s.date).max())
    }

    fn summary(&self) -> Result<Option<LedgerSummary>, TraderError> {
        let snapshots = self.snapshots()?;
        Ok(LedgerSummary::from_snapshots(self.signature(), &snapshots))
    }
}
