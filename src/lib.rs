//! futsim: simulated futures trading desk.
//!
//! Hexagonal architecture: the trade lifecycle engine and P/L rules live in
//! [`domain`], port traits in [`ports`], concrete implementations (clock,
//! config file, CSV replay, web dashboard) in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
