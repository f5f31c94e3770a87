//! Core domain types and logic.

pub mod asset;
pub mod config_validation;
pub mod error;
pub mod execution;
pub mod ohlcv;
pub mod portfolio;
pub mod position;
pub mod price_oracle;
pub mod scheduler;
pub mod session;
pub mod universe;
