//! Account State Library
//!
//! In-memory cache of a futures trading account: wallet balance, positions per
//! symbol and side, live orders, leverage and caller-defined per-symbol
//! metadata, with PnL and depth reports derived from that state.

pub mod config;
pub mod domain;
pub mod persistence;

pub use config::StoreConfig;
pub use domain::errors::StoreError;
pub use domain::services::account_store::{AccountStore, TotalPositions};
