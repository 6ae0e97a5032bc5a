use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use lxly_bridge_primitives::prelude::{ClaimPayload, NetworkId, TxRef};
use lxly_bridge_tracker::{
    traits::{BridgeClient, BridgeRequest, ClaimRequest, TxHandle, TxReceipt},
    BridgeClientError, BridgeTracker, TrackOptions,
};
use lxly_status_api::StatusApiClient;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{cli, config::Config};

pub(crate) async fn handle_track(config: Config, args: cli::TrackArgs) -> Result<()> {
    let client = StatusApiClient::new(config.status_api).context("build status API client")?;
    let tracker = BridgeTracker::new(config.tracker, WatchOnly, client);

    let cancel = CancellationToken::new();
    let mut options = TrackOptions::default()
        .with_user_address(args.user)
        .with_cancellation(cancel.clone());

    if let Some(secs) = args.poll_interval_secs {
        options = options.with_poll_interval(Duration::from_secs(secs));
    }

    if let Some(secs) = args.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping after the current poll");
            cancel.cancel();
        }
    });

    let mut tracking = tracker.track(args.tx, options).await?;
    info!(tx_ref = %args.tx, user = %args.user, "tracking bridge transaction");

    while let Some(item) = tracking.next().await {
        let snapshot = match item {
            Ok(snapshot) => snapshot,
            Err(err) => {
                // The record still holds the last state seen before the session gave up.
                if err.ends_tracking() {
                    print_record(&tracker, args.tx).await?;
                }

                return Err(err).context("tracking failed");
            }
        };

        println!(
            "{} {} polls={}",
            snapshot.observed_at.to_rfc3339(),
            snapshot.state,
            snapshot.poll_attempts
        );
    }

    print_record(&tracker, args.tx).await
}

async fn print_record(
    tracker: &BridgeTracker<WatchOnly, StatusApiClient>,
    tx_ref: TxRef,
) -> Result<()> {
    if let Some(record) = tracker.get(&tx_ref).await {
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    Ok(())
}

/// The CLI holds no keys, so its tracker can follow transactions but never send any.
#[derive(Debug, Clone, Copy)]
struct WatchOnly;

/// Handle type of [`WatchOnly`], which never produces one.
#[derive(Debug)]
enum NoTransaction {}

#[async_trait]
impl TxHandle for NoTransaction {
    async fn tx_hash(&self) -> Result<TxRef, BridgeClientError> {
        match *self {}
    }

    async fn receipt(&self) -> Result<TxReceipt, BridgeClientError> {
        match *self {}
    }
}

#[async_trait]
impl BridgeClient for WatchOnly {
    type Handle = NoTransaction;

    async fn bridge(&self, _request: &BridgeRequest) -> Result<NoTransaction, BridgeClientError> {
        Err(BridgeClientError::Provider("no signer configured".to_string()))
    }

    async fn claim(&self, _request: &ClaimRequest) -> Result<NoTransaction, BridgeClientError> {
        Err(BridgeClientError::Provider("no signer configured".to_string()))
    }

    async fn build_claim_payload(
        &self,
        _bridge_tx_ref: TxRef,
        _source_network: NetworkId,
        _bridge_index: u32,
    ) -> Result<ClaimPayload, BridgeClientError> {
        Err(BridgeClientError::Provider("no proof provider configured".to_string()))
    }
}
