//! Line-delimited JSON persistence for the position ledger and the
//! no-trade log.
//!
//! Layout under the ledger directory:
//!
//! ```text
//! <ledger_dir>/<signature>/position/position.jsonl
//! <ledger_dir>/<signature>/position/no_trade.jsonl
//! ```
//!
//! Every append is one `write_all` of a complete line followed by
//! `sync_data`. Readers work on raw bytes and skip blank and unparseable
//! lines, so a line torn by a crash (even mid UTF-8 sequence) is never taken
//! as a snapshot. If the file does not end in a newline the next append
//! starts with one.
//!
//! The genesis snapshot is written to a temporary file in the same directory
//! and moved into place, so `position.jsonl` never exists without it. A
//! ledger file holding no valid snapshot is treated as unregistered.

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use tempfile::NamedTempFile;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::domain::error::TraderError;
use crate::domain::portfolio::Holdings;
use crate::domain::position::{PositionSnapshot, Registration, TradeAction};
use crate::domain::session::NoTradeMarker;
use crate::ports::audit_port::AuditPort;
use crate::ports::ledger_port::LedgerPort;

pub const POSITION_FILE: &str = "position.jsonl";
pub const NO_TRADE_FILE: &str = "no_trade.jsonl";

pub fn position_dir(ledger_dir: &Path, signature: &str) -> PathBuf {
    ledger_dir.join(signature).join("position")
}

/// Parsed lines plus whether the file ends cleanly on a newline.
struct JsonlContents<T> {
    records: Vec<T>,
    clean_tail: bool,
}

fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Option<JsonlContents<T>>, TraderError> {
    let content = match fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(TraderError::ledger(path, e)),
    };

    let mut records = Vec::new();
    for (idx, line) in content.split(|b| *b == b'\n').enumerate() {
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_slice(line) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                path = %path.display(),
                line = idx + 1,
                error = %e,
                "skipping unparseable ledger line"
            ),
        }
    }

    Ok(Some(JsonlContents {
        records,
        clean_tail: content.last().is_none_or(|b| *b == b'\n'),
    }))
}

fn encode_line<T: Serialize>(path: &Path, record: &T, torn_tail: bool) -> Result<Vec<u8>, TraderError> {
    let mut buf = Vec::new();
    if torn_tail {
        buf.push(b'\n');
    }
    serde_json::to_writer(&mut buf, record).map_err(|e| TraderError::ledger(path, e))?;
    buf.push(b'\n');
    Ok(buf)
}

fn write_durably(mut file: File, path: &Path, bytes: &[u8]) -> Result<(), TraderError> {
    file.write_all(bytes)
        .and_then(|_| file.sync_data())
        .map_err(|e| TraderError::ledger(path, e))
}

fn append_line<T: Serialize>(path: &Path, record: &T, torn_tail: bool) -> Result<(), TraderError> {
    let bytes = encode_line(path, record, torn_tail)?;
    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .map_err(|e| TraderError::ledger(path, e))?;
    write_durably(file, path, &bytes)
}

fn ensure_parent(path: &Path) -> Result<(), TraderError> {
    match path.parent() {
        Some(dir) => fs::create_dir_all(dir).map_err(|e| TraderError::ledger(path, e)),
        None => Ok(()),
    }
}

pub struct JsonlLedger {
    path: PathBuf,
    signature: String,
    registration: Registration,
}

impl JsonlLedger {
    pub fn new(ledger_dir: &Path, signature: impl Into<String>, registration: Registration) -> Self {
        let signature = signature.into();
        JsonlLedger {
            path: position_dir(ledger_dir, &signature).join(POSITION_FILE),
            signature,
            registration,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the genesis line to a temp file beside the ledger and move it
    /// into place. Without `replace` an existing file wins and `false` is
    /// returned.
    fn persist_genesis(&self, genesis: &PositionSnapshot, replace: bool) -> Result<bool, TraderError> {
        let dir = self
            .path
            .parent()
            .ok_or_else(|| TraderError::ledger(&self.path, "ledger path has no parent directory"))?;
        let bytes = encode_line(&self.path, genesis, false)?;
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| TraderError::ledger(&self.path, e))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_data())
            .map_err(|e| TraderError::ledger(&self.path, e))?;

        let persisted = if replace {
            tmp.persist(&self.path).map(|_| ())
        } else {
            tmp.persist_noclobber(&self.path).map(|_| ())
        };
        match persisted {
            Ok(()) => Ok(true),
            Err(e) if !replace && e.error.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(TraderError::ledger(&self.path, e.error)),
        }
    }

    /// Ledger contents, registering first when the file is missing or holds
    /// no valid snapshot.
    fn registered_contents(&self) -> Result<JsonlContents<PositionSnapshot>, TraderError> {
        if let Some(contents) = read_jsonl::<PositionSnapshot>(&self.path)? {
            if !contents.records.is_empty() {
                return Ok(contents);
            }
        }
        self.register()?;
        read_jsonl(&self.path)?
            .ok_or_else(|| TraderError::ledger(&self.path, "ledger missing after registration"))
    }

    fn latest_of(&self, records: Vec<PositionSnapshot>) -> Result<PositionSnapshot, TraderError> {
        records
            .into_iter()
            .max_by_key(|s| s.action_id)
            .ok_or_else(|| TraderError::ledger(&self.path, "ledger contains no valid snapshot"))
    }
}

impl LedgerPort for JsonlLedger {
    fn signature(&self) -> &str {
        &self.signature
    }

    fn exists(&self) -> bool {
        self.path.exists()
    }

    fn register(&self) -> Result<bool, TraderError> {
        ensure_parent(&self.path)?;
        let replace = match read_jsonl::<PositionSnapshot>(&self.path)? {
            None => false,
            Some(contents) if contents.records.is_empty() => {
                warn!(
                    signature = %self.signature,
                    path = %self.path.display(),
                    "ledger holds no valid snapshot, writing genesis again"
                );
                true
            }
            Some(_) => {
                warn!(
                    signature = %self.signature,
                    path = %self.path.display(),
                    "ledger already registered, leaving it untouched"
                );
                return Ok(false);
            }
        };

        let genesis = PositionSnapshot::genesis(&self.registration);
        if !self.persist_genesis(&genesis, replace)? {
            warn!(
                signature = %self.signature,
                path = %self.path.display(),
                "ledger registered concurrently, leaving it untouched"
            );
            return Ok(false);
        }
        info!(
            signature = %self.signature,
            init_date = %genesis.date,
            cash = genesis.holdings.cash(),
            symbols = self.registration.symbols.len(),
            "ledger registered"
        );
        Ok(true)
    }

    fn latest(&self, _as_of: NaiveDate) -> Result<PositionSnapshot, TraderError> {
        let contents = self.registered_contents()?;
        self.latest_of(contents.records)
    }

    fn append(
        &self,
        date: NaiveDate,
        action: Option<TradeAction>,
        holdings: Holdings,
    ) -> Result<PositionSnapshot, TraderError> {
        if !holdings.is_solvent() {
            return Err(TraderError::ledger(
                &self.path,
                "refusing to append holdings with negative cash or quantity",
            ));
        }

        let contents = self.registered_contents()?;
        let previous = self.latest_of(contents.records)?;

        let snapshot = PositionSnapshot {
            date,
            action_id: previous.action_id + 1,
            action,
            holdings,
        };
        if !contents.clean_tail {
            warn!(path = %self.path.display(), "ledger ends with a torn line, isolating it");
        }
        append_line(&self.path, &snapshot, !contents.clean_tail)?;
        Ok(snapshot)
    }

    fn snapshots(&self) -> Result<Vec<PositionSnapshot>, TraderError> {
        Ok(read_jsonl(&self.path)?
            .map(|c| c.records)
            .unwrap_or_default())
    }
}

/// Append-only log of sessions that ended without a trade.
pub struct JsonlNoTradeLog {
    path: PathBuf,
}

impl JsonlNoTradeLog {
    pub fn new(ledger_dir: &Path, signature: &str) -> Self {
        JsonlNoTradeLog {
            path: position_dir(ledger_dir, signature).join(NO_TRADE_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditPort for JsonlNoTradeLog {
    fn record_no_trade(&self, marker: &NoTradeMarker) -> Result<(), TraderError> {
        ensure_parent(&self.path)?;
        let clean_tail = read_jsonl::<NoTradeMarker>(&self.path)?.is_none_or(|c| c.clean_tail);
        append_line(&self.path, marker, !clean_tail)?;
        info!(signature = %marker.signature, date = %marker.date, hour = ?marker.hour, "no-trade marker recorded");
        Ok(())
    }

    fn markers(&self) -> Result<Vec<NoTradeMarker>, TraderError> {
        Ok(read_jsonl(&self.path)?
            .map(|c| c.records)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::TradeSide;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ledger(dir: &TempDir) -> JsonlLedger {
        JsonlLedger::new(
            dir.path(),
            "test-agent",
            Registration {
                symbols: vec!["AAPL".into()],
                initial_cash: 10_000.0,
                init_date: date(2025, 10, 13),
            },
        )
    }

    fn buy(symbol: &str, quantity: f64) -> Option<TradeAction> {
        Some(TradeAction {
            side: TradeSide::Buy,
            symbol: symbol.into(),
            quantity,
        })
    }

    #[test]
    fn register_writes_single_genesis_line() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        assert!(ledger.register().unwrap());
        assert!(!ledger.register().unwrap());

        let content = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(
            content,
            "{\"date\":\"2025-10-13\",\"id\":0,\"positions\":{\"AAPL\":0.0,\"CASH\":10000.0}}\n"
        );
        assert!(ledger
            .path()
            .ends_with("test-agent/position/position.jsonl"));
    }

    #[test]
    fn latest_registers_implicitly() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        assert!(!ledger.exists());

        let latest = ledger.latest(date(2025, 10, 14)).unwrap();
        assert_eq!(latest.action_id, 0);
        assert!(ledger.exists());
        assert_eq!(ledger.snapshots().unwrap().len(), 1);
    }

    #[test]
    fn append_increments_ids() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        let mut holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        holdings.set_cash(9_250.0);
        holdings.set_quantity("AAPL", 5.0);

        let first = ledger
            .append(date(2025, 10, 14), buy("AAPL", 5.0), holdings.clone())
            .unwrap();
        let second = ledger
            .append(date(2025, 10, 14), None, holdings)
            .unwrap();
        assert_eq!(first.action_id, 1);
        assert_eq!(second.action_id, 2);

        let ids: Vec<u64> = ledger.snapshots().unwrap().iter().map(|s| s.action_id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(ledger.last_date().unwrap(), Some(date(2025, 10, 14)));
    }

    #[test]
    fn latest_ignores_as_of_date() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        let holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        ledger.append(date(2025, 10, 20), None, holdings).unwrap();

        let latest = ledger.latest(date(2025, 10, 14)).unwrap();
        assert_eq!(latest.action_id, 1);
        assert_eq!(latest.date, date(2025, 10, 20));
    }

    #[test]
    fn refuses_insolvent_holdings() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        let mut holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        holdings.set_cash(-1.0);

        let err = ledger.append(date(2025, 10, 14), None, holdings).unwrap_err();
        assert!(matches!(err, TraderError::Ledger { .. }));
        assert_eq!(ledger.snapshots().unwrap().len(), 1);
    }

    #[test]
    fn torn_tail_is_skipped_and_isolated() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.register().unwrap();
        let mut file = OpenOptions::new().append(true).open(ledger.path()).unwrap();
        file.write_all(b"{\"date\":\"2025-10-14\",\"id\":1,\"posi").unwrap();
        drop(file);

        assert_eq!(ledger.snapshots().unwrap().len(), 1);
        let holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        let appended = ledger.append(date(2025, 10, 14), None, holdings).unwrap();
        assert_eq!(appended.action_id, 1);

        let snapshots = ledger.snapshots().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[1], appended);
        let content = fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn empty_ledger_file_is_registered_again() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        fs::write(ledger.path(), "").unwrap();

        assert!(ledger.register().unwrap());
        assert!(!ledger.register().unwrap());
        let latest = ledger.latest(date(2025, 10, 14)).unwrap();
        assert_eq!(latest.action_id, 0);
        assert_eq!(latest.holdings.cash(), 10_000.0);
    }

    #[test]
    fn torn_genesis_recovers_on_append() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        fs::create_dir_all(ledger.path().parent().unwrap()).unwrap();
        fs::write(ledger.path(), b"{\"date\":\"2025-10-13\",\"id\":0,\"pos").unwrap();

        let mut holdings = Holdings::genesis(&["AAPL".to_string()], 10_000.0);
        holdings.set_cash(9_850.0);
        holdings.set_quantity("AAPL", 1.0);
        let appended = ledger
            .append(date(2025, 10, 14), buy("AAPL", 1.0), holdings)
            .unwrap();
        assert_eq!(appended.action_id, 1);

        let ids: Vec<u64> = ledger.snapshots().unwrap().iter().map(|s| s.action_id).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn invalid_utf8_tail_is_skipped() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.register().unwrap();
        let mut file = OpenOptions::new().append(true).open(ledger.path()).unwrap();
        file.write_all(b"{\"date\":\"2025-10-14\",\"id\":1,\"sym\":\"\xc3").unwrap();
        drop(file);

        assert_eq!(ledger.snapshots().unwrap().len(), 1);
        let holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        let appended = ledger.append(date(2025, 10, 14), None, holdings).unwrap();
        assert_eq!(appended.action_id, 1);
        assert_eq!(ledger.snapshots().unwrap().len(), 2);
    }

    #[test]
    fn register_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        ledger.register().unwrap();

        let entries: Vec<_> = fs::read_dir(ledger.path().parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(POSITION_FILE)]);
    }

    #[test]
    fn summary_reports_latest_state() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir);
        assert!(ledger.summary().unwrap().is_none());

        let mut holdings = ledger.latest(date(2025, 10, 14)).unwrap().holdings;
        holdings.set_quantity("AAPL", 1.0);
        holdings.set_cash(9_850.0);
        ledger
            .append(date(2025, 10, 15), buy("AAPL", 1.0), holdings)
            .unwrap();

        let summary = ledger.summary().unwrap().unwrap();
        assert_eq!(summary.signature, "test-agent");
        assert_eq!(summary.latest_date, date(2025, 10, 15));
        assert_eq!(summary.total_records, 2);
        assert_eq!(summary.holdings.quantity("AAPL"), Some(1.0));
    }

    #[test]
    fn no_trade_log_round_trip() {
        let dir = TempDir::new().unwrap();
        let log = JsonlNoTradeLog::new(dir.path(), "test-agent");
        assert_eq!(log.last_date().unwrap(), None);

        let marker = NoTradeMarker {
            date: date(2025, 10, 14),
            signature: "test-agent".into(),
            hour: Some(9),
        };
        log.record_no_trade(&marker).unwrap();
        log.record_no_trade(&NoTradeMarker {
            date: date(2025, 10, 15),
            signature: "test-agent".into(),
            hour: None,
        })
        .unwrap();

        let markers = log.markers().unwrap();
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[0], marker);
        assert_eq!(log.last_date().unwrap(), Some(date(2025, 10, 15)));
        assert!(log.path().ends_with("test-agent/position/no_trade.jsonl"));
    }
}
