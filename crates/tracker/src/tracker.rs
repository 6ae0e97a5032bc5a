//! The [`BridgeTracker`] ties the on-chain collaborator, the status API and the registry of known
//! operations together.

use std::{fmt, sync::Arc};

use alloy_primitives::Address;
use chrono::Utc;
use lxly_bridge_primitives::{
    claim::ClaimPayload,
    operation::BridgeOperation,
    record::{BridgeTransaction, ClaimTransaction},
    state::BridgeState,
    types::{NetworkId, TxRef},
};
use lxly_status_api::StatusSource;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{ClaimOptions, TrackOptions, TrackerConfig},
    errors::{BridgeClientError, TrackerError, TrackerResult},
    poller::{Session, Tracking, WatchHandle},
    registry::Registry,
    traits::{BridgeClient, BridgeRequest, ClaimRequest, TxHandle},
};

/// Submits bridge operations, follows them through the status API and claims them.
///
/// Clones share the same registry and collaborators.
pub struct BridgeTracker<B, S> {
    config: TrackerConfig,
    client: Arc<B>,
    status: Arc<S>,
    registry: Registry,
}

impl<B, S> Clone for BridgeTracker<B, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            client: self.client.clone(),
            status: self.status.clone(),
            registry: self.registry.clone(),
        }
    }
}

impl<B, S> fmt::Debug for BridgeTracker<B, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeTracker")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl<B, S> BridgeTracker<B, S>
where
    B: BridgeClient + 'static,
    S: StatusSource + 'static,
{
    /// Creates a tracker with an empty registry.
    pub fn new(config: TrackerConfig, client: B, status: S) -> Self {
        Self {
            config,
            client: Arc::new(client),
            status: Arc::new(status),
            registry: Registry::new(),
        }
    }

    /// The tracker-wide defaults.
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Submits a bridge or bridge-and-call operation on its source network and records it.
    ///
    /// The record starts out [`BridgeState::Bridged`]. Nothing is recorded if the submission
    /// fails.
    #[instrument(
        skip_all,
        fields(
            source = %operation.source_network,
            destination = %operation.destination_network,
        )
    )]
    pub async fn submit(&self, operation: BridgeOperation) -> TrackerResult<BridgeTransaction> {
        operation.validate()?;

        let request = BridgeRequest::from(&operation);
        info!(amount = %operation.amount, token = %operation.token, "submitting bridge operation");

        let handle = self
            .client
            .bridge(&request)
            .await
            .map_err(|err| submission_failed(None, err))?;

        let tx_ref = handle
            .tx_hash()
            .await
            .map_err(|err| submission_failed(None, err))?;

        if self.config.await_receipts {
            let receipt = handle
                .receipt()
                .await
                .map_err(|err| submission_failed(Some(tx_ref), err))?;

            if !receipt.success {
                return Err(TrackerError::SubmissionFailed {
                    tx_ref: Some(tx_ref),
                    reason: receipt
                        .revert_reason
                        .unwrap_or_else(|| "reverted without reason".to_string()),
                });
            }
        }

        let record = BridgeTransaction::from_submission(tx_ref, &operation);
        if !self.registry.insert_new(record.clone()).await {
            return Err(TrackerError::DuplicateSubmission { tx_ref });
        }

        info!(%tx_ref, "bridge operation submitted");
        Ok(record)
    }

    /// Starts following an operation through the status API.
    ///
    /// The returned stream is lazy: polling begins when it is first polled. Operations that were
    /// not submitted through this tracker need [`TrackOptions::user_address`] and are recorded
    /// once the status API reports them.
    pub async fn track(&self, tx_ref: TxRef, options: TrackOptions) -> TrackerResult<Tracking> {
        let session = self.session(tx_ref, options).await?;

        debug!(%tx_ref, user = %session.user_address, "tracking bridge transaction");
        Ok(Tracking::new(
            session,
            self.status.clone(),
            self.registry.clone(),
        ))
    }

    /// Like [`Self::track`], but drives the session on a background task.
    pub async fn watch(&self, tx_ref: TxRef, options: TrackOptions) -> TrackerResult<WatchHandle> {
        let tracking = self.track(tx_ref, options).await?;
        Ok(WatchHandle::spawn(tracking))
    }

    async fn session(&self, tx_ref: TxRef, options: TrackOptions) -> TrackerResult<Session> {
        let user_address = match options.user_address {
            Some(address) => address,
            None => self
                .registry
                .get(&tx_ref)
                .await
                .map(|record| record.recipient)
                .ok_or_else(|| TrackerError::UnknownTransaction {
                    tx_ref,
                    reason: "not recorded and no user address given".to_string(),
                })?,
        };

        let max_retries = options.max_retries.unwrap_or(self.config.max_retries);

        Ok(Session {
            tx_ref,
            user_address,
            poll_interval: options.poll_interval.unwrap_or(self.config.poll_interval),
            timeout: options.timeout.unwrap_or(self.config.timeout),
            strategy: self.config.retry_strategy(max_retries),
            cancel: options.cancel.unwrap_or_else(CancellationToken::new),
        })
    }

    /// Claims an operation on its destination network.
    ///
    /// Message claims first build their proof with [`Self::build_claim_payload`]. On success the
    /// record, if any, moves to [`BridgeState::Claimed`].
    #[instrument(skip_all, fields(%tx_ref, %source_network))]
    pub async fn claim(
        &self,
        tx_ref: TxRef,
        source_network: NetworkId,
        options: ClaimOptions,
    ) -> TrackerResult<ClaimTransaction> {
        let record = self.registry.get(&tx_ref).await;
        let state = record.as_ref().map(BridgeTransaction::state);

        if let Some(record) = &record {
            if record.state().is_terminal() {
                return Err(TrackerError::AlreadyClaimed {
                    tx_ref,
                    claim_tx_ref: record.claim.as_ref().map(|claim| claim.tx_ref),
                });
            }

            if record.state() == BridgeState::Bridged {
                debug!("claiming before the status API reports the operation as claimable");
            }
        }

        let as_message = options
            .message
            .unwrap_or_else(|| record.as_ref().is_some_and(|r| r.payload.is_message()));

        let (request, payload_destination) = if as_message {
            let bridge_index = options
                .bridge_index
                .or_else(|| record.as_ref().and_then(|r| r.bridge_index))
                .ok_or_else(|| TrackerError::ProofUnavailable {
                    tx_ref,
                    state,
                    reason: "bridge index not known yet".to_string(),
                })?;

            let payload = self
                .build_claim_payload(tx_ref, source_network, bridge_index)
                .await?;
            let destination = payload.destination_network;

            (ClaimRequest::Message(Box::new(payload)), Some(destination))
        } else {
            let request = ClaimRequest::Asset {
                bridge_tx_ref: tx_ref,
                source_network,
                return_transaction: options.return_transaction,
            };

            (request, None)
        };

        let destination_network = record
            .as_ref()
            .map(|r| r.destination_network)
            .or(payload_destination)
            .or(options.destination_network)
            .ok_or_else(|| TrackerError::UnknownTransaction {
                tx_ref,
                reason: "not recorded and no destination network given".to_string(),
            })?;

        let prepare_only = options.return_transaction && !as_message;
        info!(message = as_message, prepare_only, %destination_network, "submitting claim");

        let claim_tx_ref = self.send_claim(tx_ref, state, &request, !prepare_only).await?;

        let claim = ClaimTransaction {
            tx_ref: claim_tx_ref,
            bridge_tx_ref: tx_ref,
            destination_network,
            claimed_at: Utc::now(),
        };

        if prepare_only {
            info!(%claim_tx_ref, "claim prepared");
            return Ok(claim);
        }

        self.registry
            .update(&tx_ref, |record| record.record_claim(claim.clone()))
            .await;

        info!(%claim_tx_ref, "bridge transaction claimed");
        Ok(claim)
    }

    async fn send_claim(
        &self,
        tx_ref: TxRef,
        state: Option<BridgeState>,
        request: &ClaimRequest,
        broadcast: bool,
    ) -> TrackerResult<TxRef> {
        match self.claim_on_chain(request, broadcast).await {
            Ok(claim_tx_ref) => Ok(claim_tx_ref),
            Err(err) => {
                let err = TrackerError::from_claim_failure(tx_ref, state, err);
                warn!(%err, "claim failed");

                if matches!(err, TrackerError::AlreadyClaimed { .. }) {
                    self.registry
                        .update(&tx_ref, |record| record.observe(BridgeState::Claimed))
                        .await;
                }

                self.note_error(&tx_ref, &err).await;
                Err(err)
            }
        }
    }

    async fn claim_on_chain(
        &self,
        request: &ClaimRequest,
        broadcast: bool,
    ) -> Result<TxRef, BridgeClientError> {
        let handle = self.client.claim(request).await?;
        let claim_tx_ref = handle.tx_hash().await?;

        if broadcast && self.config.await_receipts {
            let receipt = handle.receipt().await?;
            if !receipt.success {
                let reason = receipt
                    .revert_reason
                    .unwrap_or_else(|| "reverted without reason".to_string());
                return Err(BridgeClientError::Reverted(reason));
            }
        }

        Ok(claim_tx_ref)
    }

    /// Assembles the proof material for claiming the deposit with the given count.
    ///
    /// Fails with [`TrackerError::ProofUnavailable`] while the destination network cannot verify
    /// the deposit yet.
    pub async fn build_claim_payload(
        &self,
        tx_ref: TxRef,
        source_network: NetworkId,
        bridge_index: u32,
    ) -> TrackerResult<ClaimPayload> {
        match self
            .client
            .build_claim_payload(tx_ref, source_network, bridge_index)
            .await
        {
            Ok(payload) => {
                if !payload.has_complete_proofs() {
                    warn!(%tx_ref, "claim payload has incomplete proofs");
                }

                Ok(payload)
            }
            Err(err) => {
                let state = self.registry.get(&tx_ref).await.map(|r| r.state());
                let err = TrackerError::from_claim_failure(tx_ref, state, err);
                self.note_error(&tx_ref, &err).await;
                Err(err)
            }
        }
    }

    async fn note_error(&self, tx_ref: &TxRef, err: &TrackerError) {
        let reason = err.to_string();
        self.registry
            .update(tx_ref, |record| record.last_error = Some(reason))
            .await;
    }

    /// Returns the record of `tx_ref`, if any.
    pub async fn get(&self, tx_ref: &TxRef) -> Option<BridgeTransaction> {
        self.registry.get(tx_ref).await
    }

    /// Returns all records, optionally only those whose recipient is `recipient`.
    pub async fn records(&self, recipient: Option<Address>) -> Vec<BridgeTransaction> {
        let mut records = self.registry.snapshot().await;

        if let Some(recipient) = recipient {
            records.retain(|record| record.recipient == recipient);
        }

        records
    }

    /// Forgets an operation. Running tracking sessions for it keep going and record it again.
    pub async fn remove(&self, tx_ref: &TxRef) -> Option<BridgeTransaction> {
        self.registry.remove(tx_ref).await
    }

    /// Loads records saved from an earlier run.
    ///
    /// A saved record replaces a known one with the same hash unless the known one is further
    /// along its lifecycle, in which case the saved one is skipped.
    pub async fn restore(&self, records: impl IntoIterator<Item = BridgeTransaction>) {
        for record in records {
            let tx_ref = record.tx_ref;
            let state = record.state();

            if !self.registry.merge(record).await {
                warn!(%tx_ref, %state, "skipping restored record behind the known state");
            }
        }
    }
}

fn submission_failed(tx_ref: Option<TxRef>, err: BridgeClientError) -> TrackerError {
    let reason = match err {
        BridgeClientError::Reverted(reason)
        | BridgeClientError::ProofNotReady(reason)
        | BridgeClientError::Transport(reason)
        | BridgeClientError::Provider(reason) => reason,
    };

    TrackerError::SubmissionFailed { tx_ref, reason }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use alloy_primitives::Bytes;
    use futures::{stream::FusedStream, StreamExt};
    use lxly_bridge_common::logging;
    use lxly_status_api::StatusApiError;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        poller::StateSnapshot,
        testing::{hash, observation, MockChain, ScriptedStatus, RECIPIENT},
    };

    type TestTracker = BridgeTracker<MockChain, ScriptedStatus>;

    fn operation() -> BridgeOperation {
        BridgeOperation::asset(
            NetworkId(0),
            NetworkId(1),
            Address::ZERO,
            "10000000000000000".parse().expect("valid amount"),
            RECIPIENT,
        )
    }

    fn tracker() -> (TestTracker, MockChain, ScriptedStatus) {
        logging::init_for_tests("lxly-bridge-tracker");

        let chain = MockChain::default();
        let status = ScriptedStatus::default();
        let config = TrackerConfig::default()
            .with_poll_interval(Duration::from_secs(10))
            .with_timeout(Duration::from_secs(600))
            .with_max_retries(3);

        (
            BridgeTracker::new(config, chain.clone(), status.clone()),
            chain,
            status,
        )
    }

    async fn submit(tracker: &TestTracker) -> TxRef {
        tracker
            .submit(operation())
            .await
            .expect("submission must succeed")
            .tx_ref
    }

    async fn states(tracking: Tracking) -> Vec<TrackerResult<BridgeState>> {
        tracking
            .map(|item| item.map(|snapshot| snapshot.state))
            .collect()
            .await
    }

    #[tokio::test]
    async fn submit_records_bridged_operation() {
        let (tracker, chain, _) = tracker();

        let record = tracker.submit(operation()).await.expect("must submit");

        assert_eq!(record.state(), BridgeState::Bridged);
        assert_eq!(record.source_network, NetworkId(0));
        assert_eq!(record.destination_network, NetworkId(1));
        assert_eq!(record.amount.to_string(), "10000000000000000");
        assert_eq!(tracker.get(&record.tx_ref).await, Some(record));

        let requests = chain.bridge_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].force_update_global_exit_root);
    }

    #[tokio::test]
    async fn submit_rejects_same_network() {
        let (tracker, chain, _) = tracker();
        let mut op = operation();
        op.destination_network = op.source_network;

        let res = tracker.submit(op).await;

        assert!(matches!(res, Err(TrackerError::InvalidOperation(_))));
        assert!(chain.bridge_requests().is_empty());
    }

    #[tokio::test]
    async fn failed_submissions_are_not_recorded() {
        let (tracker, chain, _) = tracker();

        chain.revert_bridge("ERC20: insufficient allowance");
        let res = tracker.submit(operation()).await;
        assert_eq!(
            res,
            Err(TrackerError::SubmissionFailed {
                tx_ref: Some(hash(0xb0, 1)),
                reason: "ERC20: insufficient allowance".to_string(),
            })
        );

        chain.fail_bridge(BridgeClientError::Provider("insufficient funds".into()));
        let res = tracker.submit(operation()).await;
        assert_eq!(
            res,
            Err(TrackerError::SubmissionFailed {
                tx_ref: None,
                reason: "insufficient funds".to_string(),
            })
        );

        assert!(tracker.records(None).await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_submission_is_rejected() {
        let (tracker, _, _) = tracker();
        let restored = BridgeTransaction::from_submission(hash(0xb0, 1), &operation());
        tracker.restore([restored.clone()]).await;

        let res = tracker.submit(operation()).await;

        assert_eq!(
            res,
            Err(TrackerError::DuplicateSubmission {
                tx_ref: hash(0xb0, 1)
            })
        );
        assert_eq!(tracker.get(&hash(0xb0, 1)).await, Some(restored));
    }

    #[tokio::test(start_paused = true)]
    async fn track_follows_lifecycle() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.statuses(tx_ref, &["BRIDGED", "BRIDGED", "READY_TO_CLAIM", "CLAIMED"]);

        let start = Instant::now();
        let tracking = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![
                Ok(BridgeState::Bridged),
                Ok(BridgeState::Bridged),
                Ok(BridgeState::ReadyToClaim),
                Ok(BridgeState::Claimed),
            ]
        );

        // Three poll intervals between four polls.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(30) && elapsed < Duration::from_secs(40));
        assert_eq!(status.calls(tx_ref), 4);
        assert_eq!(status.users(tx_ref), vec![RECIPIENT; 4]);

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.state(), BridgeState::Claimed);
        assert_eq!(record.poll_attempts, 4);
        assert_eq!(record.bridge_index, Some(7));
        assert_eq!(record.claim.map(|c| c.tx_ref), Some(hash(0xcc, 0)));
    }

    #[tokio::test(start_paused = true)]
    async fn tracking_is_lazy() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.statuses(tx_ref, &["CLAIMED"]);

        let tracking = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(status.calls(tx_ref), 0);

        assert_eq!(states(tracking).await, vec![Ok(BridgeState::Claimed)]);
        assert_eq!(status.calls(tx_ref), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn regressive_and_unknown_observations_are_discarded() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.statuses(
            tx_ref,
            &["READY_TO_CLAIM", "BRIDGED", "PENDING", "READY_TO_CLAIM", "CLAIMED"],
        );

        let tracking = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![
                Ok(BridgeState::ReadyToClaim),
                Ok(BridgeState::ReadyToClaim),
                Ok(BridgeState::Claimed),
            ]
        );
        assert_eq!(status.calls(tx_ref), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn tracking_times_out_at_deadline() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.then_repeat(tx_ref, Ok(Some(observation(tx_ref, "BRIDGED"))));

        let start = Instant::now();
        let tracking = tracker
            .track(
                tx_ref,
                TrackOptions::default().with_timeout(Duration::from_secs(60)),
            )
            .await
            .expect("recorded transaction");
        let items: Vec<_> = tracking.collect().await;

        assert!(start.elapsed() >= Duration::from_secs(60));

        let (last, polls) = items.split_last().expect("stream yields items");
        assert_eq!(polls.len(), 6);
        assert!(polls
            .iter()
            .all(|item| matches!(item, Ok(s) if s.state == BridgeState::Bridged)));

        match last {
            Err(TrackerError::Timeout { state, elapsed, .. }) => {
                assert_eq!(*state, Some(BridgeState::Bridged));
                assert!(*elapsed >= Duration::from_secs(60));
            }
            other => panic!("expected a timeout, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_within_ceiling_are_retried() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.script(
            tx_ref,
            [
                Err(StatusApiError::Timeout),
                Err(StatusApiError::Connection("connection refused".into())),
                Err(StatusApiError::Status {
                    code: 503,
                    body: String::new(),
                }),
                Ok(Some(observation(tx_ref, "READY_TO_CLAIM"))),
                Ok(Some(observation(tx_ref, "CLAIMED"))),
            ],
        );

        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_max_retries(3))
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Ok(BridgeState::ReadyToClaim), Ok(BridgeState::Claimed)]
        );

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.poll_attempts, 5);
        assert_eq!(record.last_error, None);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_beyond_ceiling_fail_tracking() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.script(tx_ref, (0..3).map(|_| Err(StatusApiError::Timeout)));
        status.then_repeat(tx_ref, Ok(Some(observation(tx_ref, "CLAIMED"))));

        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_max_retries(2))
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Err(TrackerError::TrackingFailed {
                tx_ref,
                state: Some(BridgeState::Bridged),
                attempts: 3,
                source: StatusApiError::Timeout,
            })]
        );
        assert_eq!(status.calls(tx_ref), 3);

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.state(), BridgeState::Bridged);
        assert!(record.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn failure_count_resets_after_success() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.script(
            tx_ref,
            [
                Err(StatusApiError::Timeout),
                Err(StatusApiError::Timeout),
                Ok(Some(observation(tx_ref, "BRIDGED"))),
                Err(StatusApiError::Timeout),
                Err(StatusApiError::Timeout),
                Ok(Some(observation(tx_ref, "CLAIMED"))),
            ],
        );

        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_max_retries(2))
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Ok(BridgeState::Bridged), Ok(BridgeState::Claimed)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_ends_tracking_immediately() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        let unauthorized = StatusApiError::Status {
            code: 401,
            body: "invalid api key".into(),
        };
        status.then_repeat(tx_ref, Err(unauthorized.clone()));

        let tracking = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Err(TrackerError::StatusApi {
                tx_ref,
                state: Some(BridgeState::Bridged),
                source: unauthorized,
            })]
        );
        assert_eq!(status.calls(tx_ref), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn unindexed_transactions_consume_no_retries() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.script(tx_ref, (0..5).map(|_| Ok(None)));
        status.statuses(tx_ref, &["READY_TO_CLAIM", "CLAIMED"]);

        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_max_retries(0))
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Ok(BridgeState::ReadyToClaim), Ok(BridgeState::Claimed)]
        );
        assert_eq!(status.calls(tx_ref), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_tracking() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.then_repeat(tx_ref, Ok(Some(observation(tx_ref, "BRIDGED"))));

        let cancel = CancellationToken::new();
        let mut tracking = tracker
            .track(
                tx_ref,
                TrackOptions::default().with_cancellation(cancel.clone()),
            )
            .await
            .expect("recorded transaction");

        let first = tracking.next().await.expect("first poll");
        assert_eq!(first.map(|s| s.state), Ok(BridgeState::Bridged));

        cancel.cancel();
        assert!(tracking.next().await.is_none());
        assert!(tracking.next().await.is_none());
        assert_eq!(status.calls(tx_ref), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn tracking_unrecorded_transaction_needs_user_address() {
        let (tracker, _, status) = tracker();
        let tx_ref = hash(0xee, 1);

        let res = tracker.track(tx_ref, TrackOptions::default()).await;
        assert!(matches!(res, Err(TrackerError::UnknownTransaction { .. })));

        status.statuses(tx_ref, &["READY_TO_CLAIM", "CLAIMED"]);
        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_user_address(RECIPIENT))
            .await
            .expect("user address given");

        assert_eq!(
            states(tracking).await,
            vec![Ok(BridgeState::ReadyToClaim), Ok(BridgeState::Claimed)]
        );

        let record = tracker.get(&tx_ref).await.expect("recorded by tracking");
        assert_eq!(record.recipient, RECIPIENT);
        assert_eq!(record.state(), BridgeState::Claimed);
        assert_eq!(record.poll_attempts, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn claimed_transaction_is_not_polled_again() {
        let (tracker, chain, status) = tracker();
        let tx_ref = submit(&tracker).await;
        chain.mark_ready(tx_ref);
        let claim = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("claimable");

        let items: Vec<StateSnapshot> = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction")
            .map(|item| item.expect("no error"))
            .collect()
            .await;

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].state, BridgeState::Claimed);
        assert_eq!(items[0].claim_tx_ref, Some(claim.tx_ref));
        assert_eq!(status.calls(tx_ref), 0);
    }

    #[tokio::test]
    async fn claim_before_ready_fails_with_proof_unavailable() {
        let (tracker, _, _) = tracker();
        let tx_ref = submit(&tracker).await;

        let res = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await;

        assert!(matches!(
            res,
            Err(TrackerError::ProofUnavailable {
                state: Some(BridgeState::Bridged),
                ..
            })
        ));

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.state(), BridgeState::Bridged);
        assert!(record.last_error.is_some());
    }

    #[tokio::test]
    async fn second_claim_fails_with_already_claimed() {
        let (tracker, chain, _) = tracker();
        let tx_ref = submit(&tracker).await;
        chain.mark_ready(tx_ref);

        let claim = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("claimable");
        assert_eq!(claim.bridge_tx_ref, tx_ref);
        assert_eq!(claim.destination_network, NetworkId(1));

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.state(), BridgeState::Claimed);
        assert_eq!(record.claim, Some(claim.clone()));

        let res = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await;
        assert_eq!(
            res,
            Err(TrackerError::AlreadyClaimed {
                tx_ref,
                claim_tx_ref: Some(claim.tx_ref),
            })
        );
        assert_eq!(chain.claim_requests().len(), 1);
    }

    #[tokio::test]
    async fn claim_made_elsewhere_fails_with_already_claimed() {
        let (tracker, chain, status) = tracker();
        let tx_ref = submit(&tracker).await;
        chain.mark_ready(tx_ref);
        tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("claimable");

        // A second tracker sharing the chain but not the registry.
        let other = BridgeTracker::new(TrackerConfig::default(), chain.clone(), status);
        let res = other
            .claim(
                tx_ref,
                NetworkId(0),
                ClaimOptions::default().with_destination_network(NetworkId(1)),
            )
            .await;

        assert_eq!(
            res,
            Err(TrackerError::AlreadyClaimed {
                tx_ref,
                claim_tx_ref: None,
            })
        );
    }

    #[tokio::test]
    async fn claim_revert_surfaces_reason() {
        let (tracker, chain, _) = tracker();
        let tx_ref = submit(&tracker).await;
        chain.mark_ready(tx_ref);
        chain.revert_claims("GlobalExitRootInvalid()");

        let res = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await;

        assert_eq!(
            res,
            Err(TrackerError::ClaimReverted {
                tx_ref,
                state: Some(BridgeState::Bridged),
                reason: "GlobalExitRootInvalid()".to_string(),
            })
        );
        assert_eq!(
            tracker.get(&tx_ref).await.map(|r| r.state()),
            Some(BridgeState::Bridged)
        );
    }

    #[tokio::test]
    async fn prepared_claim_leaves_record_unclaimed() {
        let (tracker, chain, _) = tracker();
        let tx_ref = submit(&tracker).await;
        chain.mark_ready(tx_ref);

        tracker
            .claim(
                tx_ref,
                NetworkId(0),
                ClaimOptions::default().with_return_transaction(true),
            )
            .await
            .expect("claimable");

        assert_eq!(
            tracker.get(&tx_ref).await.map(|r| r.state()),
            Some(BridgeState::Bridged)
        );
        assert!(matches!(
            chain.claim_requests().as_slice(),
            [ClaimRequest::Asset {
                return_transaction: true,
                ..
            }]
        ));

        // Nothing was broadcast, so the claim can still be made.
        tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("still claimable");
        assert_eq!(
            tracker.get(&tx_ref).await.map(|r| r.state()),
            Some(BridgeState::Claimed)
        );
    }

    #[tokio::test]
    async fn claim_of_unrecorded_asset_needs_destination() {
        let (tracker, chain, _) = tracker();
        let tx_ref = hash(0xee, 2);
        chain.mark_ready(tx_ref);

        let res = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await;
        assert!(matches!(
            res,
            Err(TrackerError::UnknownTransaction { .. })
        ));
        assert!(chain.claim_requests().is_empty());

        let claim = tracker
            .claim(
                tx_ref,
                NetworkId(0),
                ClaimOptions::default().with_destination_network(NetworkId(1)),
            )
            .await
            .expect("claimable");
        assert_eq!(claim.destination_network, NetworkId(1));
        assert_eq!(tracker.get(&tx_ref).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn message_claim_uses_tracked_bridge_index() {
        let (tracker, chain, status) = tracker();
        let op = operation().with_call(Bytes::from_static(&[0xca, 0x11]), None);
        let tx_ref = tracker.submit(op).await.expect("must submit").tx_ref;

        let res = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await;
        assert!(matches!(
            res,
            Err(TrackerError::ProofUnavailable { .. })
        ));
        assert!(chain.claim_requests().is_empty());

        status.statuses(tx_ref, &["READY_TO_CLAIM"]);
        let mut tracking = tracker
            .track(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");
        let snapshot = tracking
            .next()
            .await
            .expect("first poll")
            .expect("no error");
        assert_eq!(snapshot.state, BridgeState::ReadyToClaim);
        tracking.cancel();

        chain.mark_ready(tx_ref);
        tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("claimable");

        match chain.claim_requests().as_slice() {
            [ClaimRequest::Message(payload)] => {
                assert_eq!(
                    payload.global_index,
                    ClaimPayload::global_index_for(NetworkId(0), 7)
                );
                assert!(payload.has_complete_proofs());
            }
            other => panic!("expected one message claim, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn build_claim_payload_before_ready_is_unavailable() {
        let (tracker, chain, _) = tracker();
        let tx_ref = submit(&tracker).await;

        let res = tracker.build_claim_payload(tx_ref, NetworkId(0), 3).await;
        assert!(matches!(
            res,
            Err(TrackerError::ProofUnavailable { .. })
        ));

        chain.mark_ready(tx_ref);
        let payload = tracker
            .build_claim_payload(tx_ref, NetworkId(0), 3)
            .await
            .expect("ready");
        assert!(payload.global_index.bit(64));
    }

    #[tokio::test(start_paused = true)]
    async fn watches_run_independently() {
        let (tracker, _, status) = tracker();
        let first = submit(&tracker).await;
        let second = submit(&tracker).await;
        status.statuses(first, &["BRIDGED", "READY_TO_CLAIM", "CLAIMED"]);
        status.then_repeat(second, Err(StatusApiError::Decode("garbage".into())));

        let first_watch = tracker
            .watch(first, TrackOptions::default())
            .await
            .expect("recorded transaction");
        let second_watch = tracker
            .watch(second, TrackOptions::default())
            .await
            .expect("recorded transaction");

        let (first_items, second_items): (Vec<_>, Vec<_>) =
            tokio::join!(first_watch.collect(), second_watch.collect());

        assert_eq!(first_items.len(), 3);
        assert!(first_items.iter().all(Result::is_ok));
        assert!(matches!(
            second_items.as_slice(),
            [Err(TrackerError::StatusApi { .. })]
        ));

        assert_eq!(
            tracker.get(&first).await.map(|r| r.state()),
            Some(BridgeState::Claimed)
        );
        assert_eq!(
            tracker.get(&second).await.map(|r| r.state()),
            Some(BridgeState::Bridged)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_watch_ends() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.then_repeat(tx_ref, Ok(Some(observation(tx_ref, "BRIDGED"))));

        let mut watch = tracker
            .watch(tx_ref, TrackOptions::default())
            .await
            .expect("recorded transaction");
        assert!(matches!(watch.next().await, Some(Ok(_))));

        watch.cancel();
        while let Some(item) = watch.next().await {
            assert!(item.is_ok());
        }
        assert_eq!(watch.tx_ref(), tx_ref);
    }

    #[tokio::test]
    async fn records_can_be_filtered_and_removed() {
        let (tracker, _, _) = tracker();
        let tx_ref = submit(&tracker).await;
        let mut other = operation();
        other.recipient = Address::repeat_byte(0x22);
        tracker.submit(other).await.expect("must submit");

        assert_eq!(tracker.records(None).await.len(), 2);
        assert_eq!(tracker.records(Some(RECIPIENT)).await.len(), 1);

        let removed = tracker.remove(&tx_ref).await.expect("was recorded");
        assert_eq!(removed.tx_ref, tx_ref);
        assert_eq!(tracker.records(Some(RECIPIENT)).await.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn finished_tracking_can_be_polled_again() {
        let (tracker, _, status) = tracker();
        let claimed = submit(&tracker).await;
        status.statuses(claimed, &["CLAIMED"]);

        let mut tracking = tracker
            .track(claimed, TrackOptions::default())
            .await
            .expect("recorded transaction");

        let last = tracking.next().await.expect("terminal snapshot");
        assert_eq!(last.map(|s| s.state), Ok(BridgeState::Claimed));
        assert!(tracking.next().await.is_none());
        assert!(tracking.is_terminated());
        assert!(tracking.next().await.is_none());
        assert_eq!(status.calls(claimed), 1);

        let failing = submit(&tracker).await;
        status.script(
            failing,
            [Err(StatusApiError::Status {
                code: 400,
                body: "bad request".to_string(),
            })],
        );

        let mut tracking = tracker
            .track(failing, TrackOptions::default())
            .await
            .expect("recorded transaction");

        let last = tracking.next().await.expect("final error");
        assert!(matches!(last, Err(TrackerError::StatusApi { .. })));
        assert!(tracking.next().await.is_none());
        assert!(tracking.next().await.is_none());
        assert!(tracking.is_terminated());
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_timeout_does_not_overflow() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.statuses(tx_ref, &["BRIDGED", "CLAIMED"]);

        let tracking = tracker
            .track(tx_ref, TrackOptions::default().with_timeout(Duration::MAX))
            .await
            .expect("recorded transaction");

        assert_eq!(
            states(tracking).await,
            vec![Ok(BridgeState::Bridged), Ok(BridgeState::Claimed)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_poll_interval_waits_for_deadline() {
        let (tracker, _, status) = tracker();
        let tx_ref = submit(&tracker).await;
        status.then_repeat(tx_ref, Ok(Some(observation(tx_ref, "BRIDGED"))));

        let start = Instant::now();
        let items: Vec<_> = tracker
            .track(
                tx_ref,
                TrackOptions::default()
                    .with_poll_interval(Duration::MAX)
                    .with_timeout(Duration::from_secs(60)),
            )
            .await
            .expect("recorded transaction")
            .collect()
            .await;

        assert_eq!(items.len(), 2);
        assert_eq!(
            items[0].as_ref().map(|s| s.state),
            Ok(BridgeState::Bridged)
        );
        assert!(matches!(items[1], Err(TrackerError::Timeout { .. })));
        assert!(start.elapsed() >= Duration::from_secs(60));
        assert_eq!(status.calls(tx_ref), 1);
    }

    #[tokio::test]
    async fn restore_never_moves_a_record_backwards() {
        let (tracker, chain, _) = tracker();
        let tx_ref = submit(&tracker).await;
        let saved = tracker.get(&tx_ref).await.expect("recorded");

        chain.mark_ready(tx_ref);
        let claim = tracker
            .claim(tx_ref, NetworkId(0), ClaimOptions::default())
            .await
            .expect("claimable");

        tracker.restore([saved.clone()]).await;

        let record = tracker.get(&tx_ref).await.expect("still recorded");
        assert_eq!(record.state(), BridgeState::Claimed);
        assert_eq!(record.claim.map(|c| c.tx_ref), Some(claim.tx_ref));

        tracker.remove(&tx_ref).await;
        tracker.restore([saved]).await;
        assert_eq!(
            tracker.get(&tx_ref).await.map(|r| r.state()),
            Some(BridgeState::Bridged)
        );
    }
}
