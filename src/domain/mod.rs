//! Core domain types and logic.

pub mod error;
pub mod instrument;
pub mod trade;
pub mod pnl;
pub mod schedule;
pub mod engine;
pub mod summary;
pub mod format;
pub mod market;
pub mod ohlcv;
pub mod config_validation;
