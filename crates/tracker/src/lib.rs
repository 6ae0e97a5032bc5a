//! # `lxly-bridge-tracker`
//!
//! `lxly-bridge-tracker` follows cross-chain bridge operations from submission on the source
//! network to their claim on the destination network.
//!
//! The [`BridgeTracker`](tracker::BridgeTracker) submits operations and claims through a
//! [`BridgeClient`](traits::BridgeClient), and polls a
//! [`StatusSource`](lxly_status_api::StatusSource) to move each recorded operation along
//! `BRIDGED -> READY_TO_CLAIM -> CLAIMED`. Tracking is exposed both as a lazy
//! [`futures::Stream`] ([`Tracking`](poller::Tracking)) and as a spawned
//! [`Subscription`](subscription::Subscription) ([`WatchHandle`](poller::WatchHandle)).

// This cfg_attr is needed so that we can disable coverage in parts of the code that we don't want
// polluting coverage analysis. Removing this will cause this module to fail to compile.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod config;
pub mod errors;
pub mod poller;
pub mod registry;
pub mod retry;
pub mod subscription;
pub mod tracker;
pub mod traits;

#[cfg(test)]
mod testing;

pub use config::{ClaimOptions, TrackOptions, TrackerConfig};
pub use errors::{BridgeClientError, TrackerError, TrackerResult};
pub use poller::{StateSnapshot, Tracking, WatchHandle};
pub use tracker::BridgeTracker;
