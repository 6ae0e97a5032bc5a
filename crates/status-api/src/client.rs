//! The HTTP client of the status API.

use alloy_primitives::Address;
use async_trait::async_trait;
use lxly_bridge_primitives::types::TxRef;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT},
    Client, Url,
};
use tracing::{debug, trace, warn};

use crate::{
    config::StatusApiConfig,
    errors::{StatusApiError, StatusApiResult},
    rate_limit::RateLimiter,
    traits::StatusSource,
    types::{TransactionRecord, TransactionsResponse},
};

/// An `async` client for the transaction-status API.
///
/// Cloning is cheap: clones share the connection pool and the rate limiter.
#[derive(Debug, Clone)]
pub struct StatusApiClient {
    /// Where and how to connect.
    config: StatusApiConfig,

    /// The underlying `async` HTTP client.
    client: Client,

    /// Spacing of requests across all clones.
    limiter: RateLimiter,
}

impl StatusApiClient {
    /// Creates a new [`StatusApiClient`] from the given config.
    pub fn new(config: StatusApiConfig) -> StatusApiResult<Self> {
        let key_header = HeaderName::from_bytes(config.api_key_header.as_bytes())
            .map_err(|e| StatusApiError::Build(format!("invalid api key header name: {e}")))?;
        let mut key_value = HeaderValue::from_str(&config.api_key)
            .map_err(|e| StatusApiError::Build(format!("invalid api key: {e}")))?;
        key_value.set_sensitive(true);

        let headers = HeaderMap::from_iter([
            (key_header, key_value),
            (ACCEPT, HeaderValue::from_static("application/json")),
        ]);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StatusApiError::Build(format!("could not create client: {e}")))?;

        // Fail at construction rather than on every poll.
        let base = Url::parse(&config.base_url)
            .map_err(|e| StatusApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        trace!(%base, network = %config.network, "created status API client");

        let limiter = RateLimiter::new(config.min_request_interval);

        Ok(Self {
            config,
            client,
            limiter,
        })
    }

    /// Returns the config this client was created with.
    pub const fn config(&self) -> &StatusApiConfig {
        &self.config
    }

    /// Builds `{base_url}/transactions/{network}?userAddress={address}`.
    pub fn transactions_url(&self, user_address: Address) -> StatusApiResult<Url> {
        let raw = format!(
            "{}/transactions/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.network
        );

        let mut url =
            Url::parse(&raw).map_err(|e| StatusApiError::InvalidUrl(format!("{raw}: {e}")))?;
        url.query_pairs_mut()
            .append_pair("userAddress", &user_address.to_string());

        Ok(url)
    }

    /// Lists the bridge transactions of `user_address`.
    ///
    /// Entries that cannot be decoded are logged and skipped.
    pub async fn transactions(
        &self,
        user_address: Address,
    ) -> StatusApiResult<Vec<TransactionRecord>> {
        let url = self.transactions_url(user_address)?;

        self.limiter.acquire().await;
        debug!(%url, "querying status API");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, %body, "status API returned an error");

            return Err(StatusApiError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(StatusApiError::body_read)?;
        let envelope = serde_json::from_slice::<TransactionsResponse>(&body)
            .map_err(|e| StatusApiError::Decode(e.to_string()))?;

        let records = envelope
            .result
            .into_iter()
            .filter_map(
                |entry| match serde_json::from_value::<TransactionRecord>(entry) {
                    Ok(record) => Some(record),
                    Err(err) => {
                        warn!(%err, "skipping malformed transaction record");
                        None
                    }
                },
            )
            .collect::<Vec<_>>();

        trace!(num_records = records.len(), %user_address, "received transaction records");

        Ok(records)
    }
}

#[async_trait]
impl StatusSource for StatusApiClient {
    async fn fetch(
        &self,
        tx_ref: TxRef,
        user_address: Address,
    ) -> StatusApiResult<Option<TransactionRecord>> {
        let records = self.transactions(user_address).await?;

        Ok(records
            .into_iter()
            .find(|record| record.bridge_transaction_hash == tx_ref))
    }
}
