//! # `lxly-status-api`
//!
//! `lxly-status-api` is a read-only client for the bridge transaction-status HTTP API. It lists
//! the bridge transactions of a user address on a given network together with their lifecycle
//! status, which is what the tracker polls to follow an operation to finality.

pub mod client;
pub mod config;
pub mod errors;
mod rate_limit;
pub mod traits;
pub mod types;

pub use client::StatusApiClient;
pub use config::StatusApiConfig;
pub use errors::{StatusApiError, StatusApiResult};
pub use traits::StatusSource;
pub use types::{StatusNetwork, TransactionRecord};
