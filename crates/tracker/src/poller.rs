//! Polling sessions that follow one bridge operation through the status API.

use std::{
    fmt,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};

use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use futures::{
    stream::{BoxStream, Fuse, FusedStream},
    Stream, StreamExt,
};
use lxly_bridge_primitives::{
    record::{BridgeTransaction, ClaimTransaction},
    state::{BridgeState, Transition},
    types::TxRef,
};
use lxly_status_api::{StatusApiError, StatusSource, TransactionRecord};
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, timeout_at, Instant},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{
    errors::{TrackerError, TrackerResult},
    registry::Registry,
    retry::{RetryAction, Strategy},
    subscription::Subscription,
};

/// The state of an operation as of one successful poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    /// The tracked operation.
    pub tx_ref: TxRef,

    /// Its lifecycle state after applying the observation.
    pub state: BridgeState,

    /// When the state was observed.
    pub observed_at: DateTime<Utc>,

    /// Polls performed for the operation so far, successful or not.
    pub poll_attempts: u64,

    /// The claim transaction, once known.
    pub claim_tx_ref: Option<TxRef>,
}

impl StateSnapshot {
    fn of(record: &BridgeTransaction) -> Self {
        Self {
            tx_ref: record.tx_ref,
            state: record.state(),
            observed_at: record.last_observed_at,
            poll_attempts: record.poll_attempts,
            claim_tx_ref: record.claim.as_ref().map(|claim| claim.tx_ref),
        }
    }
}

/// Resolved parameters of one tracking session.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) tx_ref: TxRef,
    pub(crate) user_address: Address,
    pub(crate) poll_interval: Duration,
    pub(crate) timeout: Duration,
    pub(crate) strategy: Strategy<StatusApiError>,
    pub(crate) cancel: CancellationToken,
}

/// Longest wait or timeout honored, roughly 30 years. Longer durations are treated as this one.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `now + delay`, with `delay` capped at [`FAR_FUTURE`] so the sum cannot overflow.
fn instant_after(now: Instant, delay: Duration) -> Instant {
    now + delay.min(FAR_FUTURE)
}

enum Wait {
    Elapsed,
    Cancelled,
    Deadline,
}

/// Drives a [`Session`], one observation per call to [`Poller::next`].
struct Poller<S> {
    session: Session,
    source: Arc<S>,
    registry: Registry,

    /// Start and deadline of the session, fixed by the first poll.
    clock: Option<(Instant, Instant)>,

    /// How long to wait before the next poll.
    pending_delay: Option<Duration>,

    consecutive_failures: usize,
    polls: u64,
    done: bool,
}

impl<S: StatusSource> Poller<S> {
    fn new(session: Session, source: Arc<S>, registry: Registry) -> Self {
        Self {
            session,
            source,
            registry,
            clock: None,
            pending_delay: None,
            consecutive_failures: 0,
            polls: 0,
            done: false,
        }
    }

    fn finish(
        &mut self,
        item: Option<TrackerResult<StateSnapshot>>,
    ) -> Option<TrackerResult<StateSnapshot>> {
        self.done = true;
        item
    }

    async fn next(&mut self) -> Option<TrackerResult<StateSnapshot>> {
        if self.done {
            return None;
        }

        let tx_ref = self.session.tx_ref;
        let cancel = self.session.cancel.clone();
        let (started, deadline) = match self.clock {
            Some(clock) => clock,
            None => {
                let now = Instant::now();
                let deadline = instant_after(now, self.session.timeout);
                self.clock = Some((now, deadline));

                // Nothing left to observe for an operation that is already claimed.
                if let Some(record) = self.registry.get(&tx_ref).await {
                    if record.state().is_terminal() {
                        return self.finish(Some(Ok(StateSnapshot::of(&record))));
                    }
                }

                (now, deadline)
            }
        };

        loop {
            if let Some(delay) = self.pending_delay.take() {
                if cancel.is_cancelled() {
                    return self.finish(None);
                }

                match self.wait(delay, deadline).await {
                    Wait::Elapsed => {}
                    Wait::Cancelled => return self.finish(None),
                    Wait::Deadline => {
                        let err = self.timeout_error(started).await;
                        return self.finish(Some(Err(err)));
                    }
                }
            }

            if cancel.is_cancelled() {
                return self.finish(None);
            }

            if Instant::now() >= deadline {
                let err = self.timeout_error(started).await;
                return self.finish(Some(Err(err)));
            }

            let fetch = self.source.fetch(tx_ref, self.session.user_address);
            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                res = timeout_at(deadline, fetch) => Some(res),
            };

            let Some(fetched) = fetched else {
                return self.finish(None);
            };

            let Ok(fetched) = fetched else {
                let err = self.timeout_error(started).await;
                return self.finish(Some(Err(err)));
            };

            self.polls += 1;
            self.registry
                .update(&tx_ref, |record| record.poll_attempts += 1)
                .await;

            match fetched {
                Ok(Some(observation)) => {
                    self.consecutive_failures = 0;
                    self.pending_delay = Some(self.session.poll_interval);

                    if let Some(snapshot) = self.apply(observation).await {
                        if snapshot.state.is_terminal() {
                            info!(%tx_ref, "bridge transaction reached terminal state");
                            self.done = true;
                        }

                        return Some(Ok(snapshot));
                    }
                }
                Ok(None) => {
                    debug!(%tx_ref, "bridge transaction not indexed yet");
                    self.consecutive_failures = 0;
                    self.pending_delay = Some(self.session.poll_interval);
                }
                Err(err) => {
                    let attempt = self.consecutive_failures;
                    self.consecutive_failures += 1;

                    let reason = err.to_string();
                    self.registry
                        .update(&tx_ref, |record| record.last_error = Some(reason))
                        .await;

                    match self.session.strategy.action(&err, attempt) {
                        RetryAction::Retry(delay) => {
                            warn!(
                                %tx_ref,
                                %err,
                                attempt = self.consecutive_failures,
                                ?delay,
                                "status poll failed, retrying"
                            );
                            self.pending_delay = Some(delay);
                        }
                        RetryAction::Stop => {
                            let state = self.current_state().await;
                            let err = if err.is_transient() {
                                TrackerError::TrackingFailed {
                                    tx_ref,
                                    state,
                                    attempts: self.consecutive_failures,
                                    source: err,
                                }
                            } else {
                                TrackerError::StatusApi {
                                    tx_ref,
                                    state,
                                    source: err,
                                }
                            };

                            warn!(%tx_ref, %err, "giving up on tracking");
                            return self.finish(Some(Err(err)));
                        }
                    }
                }
            }
        }
    }

    /// Sleeps for `delay` unless the session is cancelled or the deadline comes first.
    async fn wait(&self, delay: Duration, deadline: Instant) -> Wait {
        let wake_at = instant_after(Instant::now(), delay);

        tokio::select! {
            biased;
            _ = self.session.cancel.cancelled() => Wait::Cancelled,
            _ = sleep_until(wake_at.min(deadline)) => {
                if wake_at >= deadline {
                    Wait::Deadline
                } else {
                    Wait::Elapsed
                }
            }
        }
    }

    /// Applies an observation to the registry and returns the resulting snapshot, or `None` if
    /// the observation has to be discarded.
    async fn apply(&self, observation: TransactionRecord) -> Option<StateSnapshot> {
        let tx_ref = self.session.tx_ref;

        let observed = match observation.state() {
            Ok(state) => state,
            Err(err) => {
                warn!(%tx_ref, %err, "discarding observation with unknown status");
                return None;
            }
        };

        let claim_tx_ref = observation.claim_transaction_hash;
        let deposit_count = observation.deposit_count;

        let outcome = self
            .registry
            .update(&tx_ref, |record| {
                if record.bridge_index.is_none() {
                    record.bridge_index = deposit_count;
                }

                let transition = record.observe(observed);
                if !matches!(transition, Transition::Regressed) {
                    record.last_error = None;
                    attach_observed_claim(record, claim_tx_ref);
                }

                (transition, StateSnapshot::of(record))
            })
            .await;

        match outcome {
            Some((Transition::Regressed, current)) => {
                warn!(
                    %tx_ref,
                    %observed,
                    current = %current.state,
                    "discarding regressive observation"
                );
                None
            }
            Some((Transition::Applied(next), snapshot)) => {
                info!(%tx_ref, state = %next, "bridge transaction advanced");
                Some(snapshot)
            }
            Some((Transition::Unchanged, snapshot)) => Some(snapshot),
            None => {
                // Not submitted through this tracker, start recording it now.
                let mut record = BridgeTransaction::from_observation(
                    tx_ref,
                    observation.source_network,
                    observation.destination_network,
                    observation.token,
                    observation.amount,
                    observation
                        .receiver_address
                        .unwrap_or(self.session.user_address),
                    deposit_count,
                    observed,
                );
                record.poll_attempts = self.polls;
                attach_observed_claim(&mut record, claim_tx_ref);

                let snapshot = StateSnapshot::of(&record);
                if !self.registry.insert_new(record).await {
                    debug!(%tx_ref, "bridge transaction recorded concurrently");
                }

                info!(%tx_ref, state = %observed, "recording bridge transaction found by status API");
                Some(snapshot)
            }
        }
    }

    async fn current_state(&self) -> Option<BridgeState> {
        self.registry
            .get(&self.session.tx_ref)
            .await
            .map(|record| record.state())
    }

    async fn timeout_error(&self, started: Instant) -> TrackerError {
        let err = TrackerError::Timeout {
            tx_ref: self.session.tx_ref,
            state: self.current_state().await,
            elapsed: started.elapsed(),
        };

        warn!(%err, "tracking deadline reached");
        err
    }
}

/// Records the claim reported by the status API for a claimed operation, unless one is known.
fn attach_observed_claim(record: &mut BridgeTransaction, claim_tx_ref: Option<TxRef>) {
    let Some(claim_tx_ref) = claim_tx_ref else {
        return;
    };

    if record.state().is_terminal() && record.claim.is_none() {
        record.claim = Some(ClaimTransaction {
            tx_ref: claim_tx_ref,
            bridge_tx_ref: record.tx_ref,
            destination_network: record.destination_network,
            claimed_at: record.last_observed_at,
        });
    }
}

/// A lazy stream of [`StateSnapshot`]s for one bridge operation.
///
/// Nothing is polled until the stream is. The stream yields one item per successful poll, ends
/// after the terminal state or on cancellation, and ends with an error on timeout or when the
/// status API keeps failing.
pub struct Tracking {
    tx_ref: TxRef,
    cancel: CancellationToken,
    inner: Fuse<BoxStream<'static, TrackerResult<StateSnapshot>>>,
}

impl Tracking {
    pub(crate) fn new<S>(session: Session, source: Arc<S>, registry: Registry) -> Self
    where
        S: StatusSource + 'static,
    {
        let tx_ref = session.tx_ref;
        let cancel = session.cancel.clone();
        let poller = Poller::new(session, source, registry);

        let inner = futures::stream::unfold(poller, |mut poller| async move {
            let item = poller.next().await?;
            Some((item, poller))
        })
        .boxed()
        .fuse();

        Self {
            tx_ref,
            cancel,
            inner,
        }
    }

    /// The tracked operation.
    pub const fn tx_ref(&self) -> TxRef {
        self.tx_ref
    }

    /// Stops the session before its next poll or wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token that cancels this session.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

impl fmt::Debug for Tracking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracking")
            .field("tx_ref", &self.tx_ref)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Stream for Tracking {
    type Item = TrackerResult<StateSnapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl FusedStream for Tracking {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

/// A tracking session running in the background.
///
/// The handle is a stream of the session's items. Dropping it cancels the session.
#[derive(Debug)]
pub struct WatchHandle {
    tx_ref: TxRef,
    cancel: CancellationToken,
    subscription: Subscription<TrackerResult<StateSnapshot>>,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Spawns a task that drives `tracking` and forwards its items.
    pub(crate) fn spawn(mut tracking: Tracking) -> Self {
        let tx_ref = tracking.tx_ref();
        let cancel = tracking.cancellation_token();
        let (sender, receiver) = mpsc::unbounded_channel();

        let task = tokio::spawn(
            async move {
                while let Some(item) = tracking.next().await {
                    if sender.send(item).is_err() {
                        debug!("watcher went away, stopping");
                        tracking.cancel();
                        break;
                    }
                }
            }
            .instrument(info_span!("watch", %tx_ref)),
        );

        Self {
            tx_ref,
            cancel,
            subscription: Subscription::from_receiver(receiver),
            task,
        }
    }

    /// The tracked operation.
    pub const fn tx_ref(&self) -> TxRef {
        self.tx_ref
    }

    /// Stops the session before its next poll or wait.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Number of items produced but not consumed yet.
    pub fn backlog(&self) -> usize {
        self.subscription.backlog()
    }

    /// Returns `true` once the background task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Stream for WatchHandle {
    type Item = TrackerResult<StateSnapshot>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().subscription).poll_next(cx)
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
