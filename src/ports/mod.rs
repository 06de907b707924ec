//! Port traits: the seams between the domain and its collaborators.

pub mod clock_port;
pub mod config_port;
pub mod price_port;
pub mod trade_log_port;
