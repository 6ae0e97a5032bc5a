//! Configuration for the bridge tracker.

use std::time::Duration;

use alloy_primitives::Address;
use lxly_bridge_primitives::types::NetworkId;
use lxly_status_api::StatusApiError;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::retry::Strategy;

/// Default spacing between two successful status polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default overall deadline of a tracking session.
pub const DEFAULT_TRACKING_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Default number of consecutive transient failures tolerated by a tracking session.
pub const DEFAULT_MAX_RETRIES: usize = 5;

/// Default delay before the first retry.
pub const DEFAULT_RETRY_INITIAL_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound of the retry delay.
pub const DEFAULT_RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default growth factor of the retry delay.
pub const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;

/// Tracker-wide defaults. Each tracking session may override the polling parameters through
/// [`TrackOptions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Spacing between two successful status polls.
    pub poll_interval: Duration,

    /// Overall deadline of a tracking session, measured from its first poll.
    pub timeout: Duration,

    /// Number of consecutive transient failures tolerated before tracking gives up.
    ///
    /// The count resets after every successful poll.
    pub max_retries: usize,

    /// Initial delay for exponential backoff retries.
    pub retry_initial_delay: Duration,

    /// Maximum delay for exponential backoff retries.
    pub retry_max_delay: Duration,

    /// Exponential backoff multiplier.
    pub retry_multiplier: f64,

    /// Whether submissions and claims wait for the receipt of their transaction.
    pub await_receipts: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TRACKING_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_initial_delay: DEFAULT_RETRY_INITIAL_DELAY,
            retry_max_delay: DEFAULT_RETRY_MAX_DELAY,
            retry_multiplier: DEFAULT_RETRY_MULTIPLIER,
            await_receipts: true,
        }
    }
}

impl TrackerConfig {
    /// Updates the poll interval and returns the updated config.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Updates the tracking timeout and returns the updated config.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Updates the retry ceiling and returns the updated config.
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Updates the backoff parameters and returns the updated config.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.retry_initial_delay = initial;
        self.retry_max_delay = max;
        self.retry_multiplier = multiplier;
        self
    }

    /// Updates whether submissions and claims wait for receipts and returns the updated config.
    pub const fn with_await_receipts(mut self, await_receipts: bool) -> Self {
        self.await_receipts = await_receipts;
        self
    }

    /// The retry strategy for status API calls: exponential backoff on transient errors, capped at
    /// `max_retries` consecutive retries.
    pub fn retry_strategy(&self, max_retries: usize) -> Strategy<StatusApiError> {
        Strategy::exponential_backoff(
            self.retry_initial_delay,
            self.retry_max_delay,
            self.retry_multiplier,
        )
        .only_if(StatusApiError::is_transient)
        .with_max_retries(max_retries)
    }
}

/// Per-session overrides for [`BridgeTracker::track`](crate::BridgeTracker::track).
///
/// Unset fields fall back to the [`TrackerConfig`] of the tracker.
#[derive(Debug, Clone, Default)]
pub struct TrackOptions {
    /// Address the status API indexes the operation under.
    ///
    /// Required to track operations that were not submitted through the tracker. For recorded
    /// operations it defaults to the recipient.
    pub user_address: Option<Address>,

    /// Overrides [`TrackerConfig::poll_interval`].
    pub poll_interval: Option<Duration>,

    /// Overrides [`TrackerConfig::timeout`].
    pub timeout: Option<Duration>,

    /// Overrides [`TrackerConfig::max_retries`].
    pub max_retries: Option<usize>,

    /// Cancels the session when triggered. A fresh token is used if none is given.
    pub cancel: Option<CancellationToken>,
}

impl TrackOptions {
    /// Sets the address the status API indexes the operation under.
    pub const fn with_user_address(mut self, user_address: Address) -> Self {
        self.user_address = Some(user_address);
        self
    }

    /// Overrides the poll interval.
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = Some(poll_interval);
        self
    }

    /// Overrides the tracking timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the retry ceiling.
    pub const fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Ties the session to `cancel`.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }
}

/// Per-call parameters of [`BridgeTracker::claim`](crate::BridgeTracker::claim).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClaimOptions {
    /// Claims the operation as a message rather than an asset.
    ///
    /// Defaults to the payload kind of the recorded operation, or an asset claim if it is not
    /// recorded.
    pub message: Option<bool>,

    /// Deposit count of the operation, needed to build a message claim when the record does not
    /// know it yet.
    pub bridge_index: Option<u32>,

    /// Network the claim is made on, needed for asset claims of unrecorded operations.
    pub destination_network: Option<NetworkId>,

    /// Only prepare an asset claim. The transaction is not broadcast, so no receipt is awaited
    /// and the record keeps its state.
    pub return_transaction: bool,
}

impl ClaimOptions {
    /// Forces a message claim with the given deposit count.
    pub const fn message(bridge_index: u32) -> Self {
        Self {
            message: Some(true),
            bridge_index: Some(bridge_index),
            destination_network: None,
            return_transaction: false,
        }
    }

    /// Sets the network the claim is made on.
    pub const fn with_destination_network(mut self, network: NetworkId) -> Self {
        self.destination_network = Some(network);
        self
    }

    /// Only prepares the claim, see [`ClaimOptions::return_transaction`].
    pub const fn with_return_transaction(mut self, return_transaction: bool) -> Self {
        self.return_transaction = return_transaction;
        self
    }
}
