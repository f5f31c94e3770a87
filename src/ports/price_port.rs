//! Price data access port.

use crate::domain::error::TraderError;
use crate::domain::ohlcv::{OhlcvBar, PriceGranularity};
use std::collections::BTreeMap;

/// A price series as stored: raw timestamp keys mapped to bars.
pub type RawSeries = BTreeMap<String, OhlcvBar>;

pub trait PricePort {
    /// Load one symbol's whole series. `Ok(None)` means no series is stored
    /// for the symbol, which is not an error.
    fn load_series(
        &self,
        symbol: &str,
        granularity: PriceGranularity,
    ) -> Result<Option<RawSeries>, TraderError>;
}
