//! Port traits the domain depends on.

pub mod audit_port;
pub mod config_port;
pub mod ledger_port;
pub mod price_port;
