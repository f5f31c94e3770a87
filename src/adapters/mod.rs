//! Concrete adapter implementations for ports.

pub mod env_config_adapter;
pub mod file_config_adapter;
pub mod jsonl_ledger;
pub mod price_file_adapter;
pub mod tool_adapter;
#[cfg(feature = "web")]
pub mod web;
