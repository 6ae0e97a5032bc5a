//! Configuration for the status API client.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::StatusNetwork;

/// Default base URL of the status API gateway.
pub const DEFAULT_BASE_URL: &str = "https://api-gateway.polygon.technology/api/v3";

/// Default name of the header carrying the API key.
pub const DEFAULT_API_KEY_HEADER: &str = "x-api-key";

/// Default timeout of a single request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default minimum spacing between two requests of the same client.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(200);

/// Connection parameters of the status API.
///
/// You should construct a [`StatusApiConfig`] with [`StatusApiConfig::new`] and modify it with
/// the member methods on this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusApiConfig {
    /// Base URL the `/transactions/{network}` path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// The deployment to query.
    pub network: StatusNetwork,

    /// API key sent with every request.
    pub api_key: String,

    /// Name of the header carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    /// Timeout for each request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Minimum spacing between two requests, shared by all clones of a client.
    ///
    /// A zero interval disables throttling.
    #[serde(default = "default_min_request_interval")]
    pub min_request_interval: Duration,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_api_key_header() -> String {
    DEFAULT_API_KEY_HEADER.to_string()
}

const fn default_request_timeout() -> Duration {
    DEFAULT_REQUEST_TIMEOUT
}

const fn default_min_request_interval() -> Duration {
    DEFAULT_MIN_REQUEST_INTERVAL
}

impl StatusApiConfig {
    /// Creates a config for the given deployment with all other values at their defaults.
    pub fn new(network: StatusNetwork, api_key: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            network,
            api_key: api_key.into(),
            api_key_header: default_api_key_header(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
        }
    }

    /// Updates the base URL and returns the updated config.
    ///
    /// Useful for a builder pattern with dotchaining.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Updates the request timeout and returns the updated config.
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Updates the minimum spacing between requests and returns the updated config.
    pub const fn with_min_request_interval(mut self, interval: Duration) -> Self {
        self.min_request_interval = interval;
        self
    }
}
